//! 命令状态抽象
//!
//! 每个命令状态封装：请求字节、注册表标识、单发/连续分类、发送
//! 去重标志，以及两种行为——`handle()`（由 `tick()` 驱动，按需发送
//! 请求）与 `on_frame()`（由分发器在帧到达时调用，解码载荷并决定
//! 后继状态）。
//!
//! 状态不持有上下文的回引；上下文以借用参数传入，所有权上不成环，
//! 注册表是状态的唯一属主。

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use crate::driver::context::DriverContext;
use crate::protocol::{error_text, Frame};

/// 状态分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    /// 单发命令：发送一次请求并等待对应应答
    SingleShot,
    /// 连续订阅：不发送请求，挂在连续状态流上按帧匹配
    Continuous,
}

/// 发送去重与活性记录
///
/// `already_sent` 恰在请求字节交给传输层时置位（同步发送变体在确认
/// 有数据到达后置位），只会被显式复位；`data_received` 由读线程按
/// 每次读取结果维护。
#[derive(Debug, Default)]
pub struct SendGate {
    sent: AtomicBool,
    received: AtomicBool,
    last_attempt: Mutex<Option<Instant>>,
}

impl SendGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn already_sent(&self) -> bool {
        self.sent.load(Ordering::Acquire)
    }

    pub fn mark_sent(&self, sent: bool) {
        self.sent.store(sent, Ordering::Release);
    }

    pub fn data_received(&self) -> bool {
        self.received.load(Ordering::Acquire)
    }

    pub fn set_data_received(&self, received: bool) {
        self.received.store(received, Ordering::Release);
    }

    /// 最小重发间隔闸门
    ///
    /// 距上次放行不足 `min` 返回 `false`；放行时顺带刷新时间戳。
    pub fn interval_elapsed(&self, min: Duration) -> bool {
        let mut last = self.last_attempt.lock();
        match *last {
            Some(t) if t.elapsed() < min => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }
}

/// 命令状态 Trait
///
/// 语义约束：
/// - 同一 `command_id()` 在注册表内至多一个实例；
/// - 单发状态每次成功进入后至多发送一次请求（由 `SendGate` 把守）；
/// - `on_frame()` 内的所有错误路径都以一次转移决策收尾，不向上抛。
pub trait CommandState: Send + Sync {
    /// 注册表标识（非线上值）
    fn command_id(&self) -> u32;

    /// 日志用状态名
    fn name(&self) -> &'static str;

    /// 状态分类，缺省单发
    fn kind(&self) -> StateKind {
        StateKind::SingleShot
    }

    /// 要发送的请求字节；连续状态为空
    fn command_bytes(&self) -> Vec<u8> {
        Vec::new()
    }

    /// 预期应答长度，仅用于诊断日志
    fn expected_reply_len(&self) -> usize {
        0
    }

    /// 发送去重记录
    fn gate(&self) -> &SendGate;

    /// 由 `tick()` 驱动：未发送且计时允许时把请求交给传输层
    fn handle(&self, ctx: &DriverContext);

    /// 由分发器驱动：匹配帧并决定后继状态
    fn on_frame(&self, ctx: &DriverContext, frame: &Frame);
}

/// 单发状态的缺省 `handle()`：已发送则直接返回，否则置位并发出
pub(crate) fn send_once(ctx: &DriverContext, state: &dyn CommandState) {
    if state.gate().already_sent() {
        return;
    }
    state.gate().mark_sent(true);
    ctx.send_command(state);
}

/// 同步发送变体：发出后等待读线程的一次读取结果
///
/// 仅当等待期间确有数据到达才认定发送成功；否则保持未发送，
/// 下一次 `tick()` 在计时闸门允许时重发。
pub(crate) fn send_once_sync(ctx: &DriverContext, state: &dyn CommandState) {
    if state.gate().already_sent() {
        return;
    }
    let answered = ctx.send_command_sync(state);
    state.gate().mark_sent(answered);
}

/// ACK 应答匹配：状态字节、操作码与载荷长度同时吻合
pub(crate) fn ack_matches(frame: &Frame, opcode: u8, payload_len: u8) -> bool {
    frame.is_ack() && frame.command() == opcode && frame.length() == payload_len
}

/// NAK 应答匹配
pub(crate) fn nak_matches(frame: &Frame, opcode: u8) -> bool {
    frame.is_nak() && frame.command() == opcode
}

/// 按对外契约翻译并记录 NAK 错误码（线上第 3 字节）
pub(crate) fn log_nak(state_name: &str, frame: &Frame) {
    warn!(
        "{}: fail with error message: {}",
        state_name,
        error_text(frame.at(3))
    );
}
