//! 观察者分发器
//!
//! 把重组出的每一帧路由到两类接收方：
//! - `awaiting_reply`：当前等待单发应答的状态（单槽位，后装者胜）；
//! - `stream_subscribers`：按插入序排列的连续状态订阅集。
//!
//! 同一帧会依次经过两条路径（先应答槽，后订阅集）；成功帧既可能是
//! 某条单发命令的应答，也可能是连续状态流的一拍，由各状态自行按
//! 操作码与帧选择子匹配取舍。

use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::context::DriverContext;
use crate::driver::state::CommandState;
use crate::protocol::Frame;

#[derive(Default)]
struct Slots {
    awaiting: Option<Arc<dyn CommandState>>,
    stream: Vec<Arc<dyn CommandState>>,
}

/// 帧分发器
#[derive(Default)]
pub(crate) struct Dispatcher {
    slots: Mutex<Slots>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 幂等地加入订阅集（按 `command_id` 去重，保持插入序）
    pub fn attach_stream(&self, state: Arc<dyn CommandState>) {
        let mut slots = self.slots.lock();
        if !slots
            .stream
            .iter()
            .any(|s| s.command_id() == state.command_id())
        {
            slots.stream.push(state);
        }
    }

    /// 从订阅集移除（会话内通常不会发生）
    #[allow(dead_code)]
    pub fn detach_stream(&self, command_id: u32) {
        self.slots
            .lock()
            .stream
            .retain(|s| s.command_id() != command_id);
    }

    /// 占用应答槽，替换之前的占位者
    pub fn arm_reply(&self, state: Arc<dyn CommandState>) {
        self.slots.lock().awaiting = Some(state);
    }

    /// 清空应答槽
    pub fn disarm_reply(&self) {
        self.slots.lock().awaiting = None;
    }

    /// 分发一帧：先应答槽，后订阅集（插入序）
    ///
    /// 槽位快照在锁内取出、锁外调用 `on_frame`，状态因此可以在回调
    /// 里安全地发起转移（转移会再次取分发器锁）。
    pub fn deliver(&self, ctx: &DriverContext, frame: &Frame) {
        let (awaiting, stream) = {
            let slots = self.slots.lock();
            (slots.awaiting.clone(), slots.stream.clone())
        };
        if let Some(state) = awaiting {
            state.on_frame(ctx, frame);
        }
        for state in stream {
            state.on_frame(ctx, frame);
        }
    }

    /// 应答槽当前占位者的标识（诊断/测试用）
    pub fn awaiting_id(&self) -> Option<u32> {
        self.slots.lock().awaiting.as_ref().map(|s| s.command_id())
    }

    /// 订阅集大小（诊断/测试用）
    pub fn stream_len(&self) -> usize {
        self.slots.lock().stream.len()
    }

    /// 订阅集中的标识快照（插入序）
    #[allow(dead_code)]
    pub fn stream_ids(&self) -> Vec<u32> {
        self.slots
            .lock()
            .stream
            .iter()
            .map(|s| s.command_id())
            .collect()
    }
}
