//! 驱动上下文
//!
//! 持有传输层写半部、帧分发器、命令状态注册表与当前状态、会话标志，
//! 以及同步发送等待的读取会合点。状态以 `Arc` 共享：注册表是属主，
//! 分发器槽位持有克隆引用，同一 `command_id` 在会话内只会构造一次，
//! 重入该命令时复用旧实例（其 `already_sent` 仍然置位），稳态下不会
//! 重发请求。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

use crate::driver::config::DriverConfig;
use crate::driver::dispatcher::Dispatcher;
use crate::driver::flags::SessionFlags;
use crate::driver::state::{CommandState, StateKind};
use crate::serial::SerialTx;

#[derive(Default)]
struct Machine {
    current: Option<Arc<dyn CommandState>>,
    registry: HashMap<u32, Arc<dyn CommandState>>,
}

#[derive(Default)]
struct ReadSignal {
    seq: u64,
    last_read_nonempty: bool,
}

/// 读取会合点：读线程每个读取周期（无论是否读到字节）都发一次信号，
/// 同步发送路径据此等待"下一次读取结果"，最多阻塞一个超时周期。
#[derive(Default)]
struct ReadRendezvous {
    signal: Mutex<ReadSignal>,
    cond: Condvar,
}

impl ReadRendezvous {
    fn notify(&self, nonempty: bool) {
        let mut signal = self.signal.lock();
        signal.seq = signal.seq.wrapping_add(1);
        signal.last_read_nonempty = nonempty;
        self.cond.notify_all();
    }

    /// 发送前取票，票号是当前读取序号
    fn ticket(&self) -> u64 {
        self.signal.lock().seq
    }

    /// 等待票号之后的读取结果；读线程失联时按超时放行并视为无数据
    ///
    /// 票号在写出请求之前取得，写出与等待之间到达的读取结果不会
    /// 丢失（序号已越过票号，立即返回）。
    fn wait_after(&self, ticket: u64, timeout: Duration) -> bool {
        let mut signal = self.signal.lock();
        while signal.seq == ticket {
            if self.cond.wait_for(&mut signal, timeout).timed_out() {
                return false;
            }
        }
        signal.last_read_nonempty
    }
}

/// 驱动上下文（状态机的共享根）
pub struct DriverContext {
    tx: Mutex<Box<dyn SerialTx>>,
    dispatcher: Dispatcher,
    machine: Mutex<Machine>,
    flags: SessionFlags,
    rendezvous: ReadRendezvous,
    config: DriverConfig,
}

impl DriverContext {
    pub(crate) fn new(tx: Box<dyn SerialTx>, config: DriverConfig) -> Self {
        Self {
            tx: Mutex::new(tx),
            dispatcher: Dispatcher::new(),
            machine: Mutex::new(Machine::default()),
            flags: SessionFlags::new(),
            rendezvous: ReadRendezvous::default(),
            config,
        }
    }

    /// 会话标志
    pub fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    pub(crate) fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// 推进状态机一步
    ///
    /// 当前状态的 `Arc` 在锁内取出、锁外执行 `handle()`；`handle()`
    /// 因此可以安全地触达 `transition_to`（不会在持锁状态下重入）。
    pub fn tick(&self) {
        let current = self.machine.lock().current.clone();
        if let Some(state) = current {
            state.handle(self);
        }
    }

    /// 转移到目标状态
    ///
    /// `id` 已在注册表中则改绑旧实例并丢弃 `next`，否则登记 `next`。
    /// 改绑时按新状态的分类接线分发器：上一个单发状态先解除应答槽；
    /// 新的单发状态占用应答槽（复用实例仅在尚未发送时重新占用），
    /// 连续状态在首次登记时加入订阅集，并在会话内保持订阅。
    pub fn transition_to(&self, next: Arc<dyn CommandState>) {
        let mut machine = self.machine.lock();

        if let Some(prev) = &machine.current {
            if prev.kind() == StateKind::SingleShot {
                self.dispatcher.disarm_reply();
            }
        }

        let id = next.command_id();
        let state = match machine.registry.get(&id) {
            Some(existing) => {
                let state = existing.clone();
                if state.kind() == StateKind::SingleShot && !state.gate().already_sent() {
                    self.dispatcher.arm_reply(state.clone());
                }
                state
            }
            None => {
                machine.registry.insert(id, next.clone());
                match next.kind() {
                    StateKind::SingleShot => self.dispatcher.arm_reply(next.clone()),
                    StateKind::Continuous => self.dispatcher.attach_stream(next.clone()),
                }
                next
            }
        };

        info!("context: transition to {}", state.name());
        machine.current = Some(state);
    }

    /// 当前状态的注册表标识（诊断/测试用）
    pub fn current_state_id(&self) -> Option<u32> {
        self.machine.lock().current.as_ref().map(|s| s.command_id())
    }

    /// 注册表中的状态实例数（诊断/测试用）
    pub fn registry_len(&self) -> usize {
        self.machine.lock().registry.len()
    }

    /// 把请求字节交给传输层（即发即忘）
    ///
    /// 写入失败属传输层致命错误：记录后留在当前状态，会话由上层终止。
    pub(crate) fn send_command(&self, state: &dyn CommandState) {
        let bytes = state.command_bytes();
        if bytes.is_empty() {
            return;
        }
        debug!(
            "{}: tx {:02X?} (expect reply of {} bytes)",
            state.name(),
            bytes,
            state.expected_reply_len()
        );
        if let Err(e) = self.tx.lock().write(&bytes) {
            error!("serial write failed: {}", e);
        }
    }

    /// 同步发送：写出请求并等待读线程的下一次读取结果
    ///
    /// 返回该次读取是否有数据到达。
    pub(crate) fn send_command_sync(&self, state: &dyn CommandState) -> bool {
        let ticket = self.rendezvous.ticket();
        self.send_command(state);
        self.rendezvous
            .wait_after(ticket, self.config.sync_send_timeout())
    }

    /// 读线程回报一次读取结果：刷新当前状态的活性标志并唤醒同步发送
    pub(crate) fn note_read_outcome(&self, nonempty: bool) {
        if let Some(current) = self.machine.lock().current.clone() {
            current.gate().set_data_received(nonempty);
        }
        self.rendezvous.notify(nonempty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::state::SendGate;
    use crate::protocol::Frame;
    use crate::serial::SerialError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullTx;
    impl SerialTx for NullTx {
        fn write(&mut self, _bytes: &[u8]) -> Result<(), SerialError> {
            Ok(())
        }
    }

    struct ProbeState {
        id: u32,
        kind: StateKind,
        gate: SendGate,
        frames_seen: AtomicUsize,
    }

    impl ProbeState {
        fn new(id: u32, kind: StateKind) -> Self {
            Self {
                id,
                kind,
                gate: SendGate::new(),
                frames_seen: AtomicUsize::new(0),
            }
        }
    }

    impl CommandState for ProbeState {
        fn command_id(&self) -> u32 {
            self.id
        }
        fn name(&self) -> &'static str {
            "ProbeState"
        }
        fn kind(&self) -> StateKind {
            self.kind
        }
        fn gate(&self) -> &SendGate {
            &self.gate
        }
        fn handle(&self, _ctx: &DriverContext) {}
        fn on_frame(&self, _ctx: &DriverContext, _frame: &Frame) {
            self.frames_seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_ctx() -> DriverContext {
        DriverContext::new(Box::new(NullTx), DriverConfig::default())
    }

    fn ack_frame() -> Frame {
        let mut asm = crate::protocol::FrameAssembler::new();
        asm.push(&[0x06, 0x19, 0x00, 0xE1]);
        asm.next_frame().unwrap()
    }

    #[test]
    fn test_registry_dedup_on_same_id() {
        // 注册表内实例数等于用过的不同 id 数
        let ctx = test_ctx();
        ctx.transition_to(Arc::new(ProbeState::new(1, StateKind::SingleShot)));
        ctx.transition_to(Arc::new(ProbeState::new(2, StateKind::SingleShot)));
        ctx.transition_to(Arc::new(ProbeState::new(1, StateKind::SingleShot)));
        assert_eq!(ctx.registry_len(), 2);
        assert_eq!(ctx.current_state_id(), Some(1));
    }

    #[test]
    fn test_registry_reuse_preserves_gate() {
        let ctx = test_ctx();
        let first = Arc::new(ProbeState::new(7, StateKind::SingleShot));
        ctx.transition_to(first.clone());
        let frame = ack_frame();
        ctx.dispatcher().deliver(&ctx, &frame);
        assert_eq!(first.frames_seen.load(Ordering::SeqCst), 1);

        first.gate().mark_sent(true);
        // 再次转移到同一 id：换入的是旧实例，发送标志仍然置位，
        // 已发送的实例不会被重新装入应答槽
        ctx.transition_to(Arc::new(ProbeState::new(7, StateKind::SingleShot)));
        assert_eq!(ctx.registry_len(), 1);
        assert_eq!(ctx.dispatcher().awaiting_id(), None);
        ctx.dispatcher().deliver(&ctx, &frame);
        assert_eq!(first.frames_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_awaiting_reply_holds_at_most_one() {
        // 应答槽至多一个占位者
        let ctx = test_ctx();
        ctx.transition_to(Arc::new(ProbeState::new(1, StateKind::SingleShot)));
        assert_eq!(ctx.dispatcher().awaiting_id(), Some(1));
        ctx.transition_to(Arc::new(ProbeState::new(2, StateKind::SingleShot)));
        assert_eq!(ctx.dispatcher().awaiting_id(), Some(2));
        ctx.transition_to(Arc::new(ProbeState::new(3, StateKind::Continuous)));
        // 转移到连续状态时，上一个单发状态的占位被解除
        assert_eq!(ctx.dispatcher().awaiting_id(), None);
    }

    #[test]
    fn test_continuous_states_stay_subscribed() {
        let ctx = test_ctx();
        ctx.transition_to(Arc::new(ProbeState::new(10, StateKind::Continuous)));
        ctx.transition_to(Arc::new(ProbeState::new(11, StateKind::Continuous)));
        ctx.transition_to(Arc::new(ProbeState::new(10, StateKind::Continuous)));
        assert_eq!(ctx.dispatcher().stream_len(), 2);
    }

    #[test]
    fn test_deliver_reaches_awaiting_then_stream() {
        let ctx = test_ctx();
        let sub = Arc::new(ProbeState::new(20, StateKind::Continuous));
        let oneshot = Arc::new(ProbeState::new(21, StateKind::SingleShot));
        ctx.transition_to(sub.clone());
        ctx.transition_to(oneshot.clone());
        let frame = ack_frame();
        ctx.dispatcher().deliver(&ctx, &frame);
        assert_eq!(oneshot.frames_seen.load(Ordering::SeqCst), 1);
        assert_eq!(sub.frames_seen.load(Ordering::SeqCst), 1);
    }

    struct CountingTx {
        writes: Arc<AtomicUsize>,
    }

    impl SerialTx for CountingTx {
        fn write(&mut self, _bytes: &[u8]) -> Result<(), SerialError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct OneShotProbe {
        gate: SendGate,
    }

    impl CommandState for OneShotProbe {
        fn command_id(&self) -> u32 {
            0x77
        }
        fn name(&self) -> &'static str {
            "OneShotProbe"
        }
        fn command_bytes(&self) -> Vec<u8> {
            vec![0x10, 0x01, 0x19, 0xD6]
        }
        fn gate(&self) -> &SendGate {
            &self.gate
        }
        fn handle(&self, ctx: &DriverContext) {
            crate::driver::state::send_once(ctx, self);
        }
        fn on_frame(&self, _ctx: &DriverContext, _frame: &Frame) {}
    }

    #[test]
    fn test_single_shot_transmits_exactly_once() {
        // 重复 handle() 只发送一次，直到转移显式复位
        let writes = Arc::new(AtomicUsize::new(0));
        let ctx = DriverContext::new(
            Box::new(CountingTx {
                writes: writes.clone(),
            }),
            DriverConfig::default(),
        );
        ctx.transition_to(Arc::new(OneShotProbe {
            gate: SendGate::new(),
        }));
        for _ in 0..5 {
            ctx.tick();
        }
        assert_eq!(writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sync_send_times_out_without_reader() {
        let ctx = DriverContext::new(
            Box::new(NullTx),
            DriverConfig {
                sync_send_timeout_ms: 10,
                ..DriverConfig::default()
            },
        );
        let state = ProbeState::new(1, StateKind::SingleShot);
        // 无读线程：有界等待超时并按无数据处理
        assert!(!ctx.send_command_sync(&state));
    }

    #[test]
    fn test_note_read_outcome_wakes_sync_sender() {
        let ctx = Arc::new(test_ctx());
        let state = Arc::new(ProbeState::new(1, StateKind::SingleShot));
        ctx.transition_to(state.clone());

        let ctx2 = ctx.clone();
        let waiter = std::thread::spawn(move || {
            let probe = ProbeState::new(2, StateKind::SingleShot);
            ctx2.send_command_sync(&probe)
        });
        std::thread::sleep(Duration::from_millis(30));
        ctx.note_read_outcome(true);
        assert!(waiter.join().unwrap());
        assert!(state.gate().data_received());
    }
}
