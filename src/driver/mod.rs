//! 驱动层模块
//!
//! 对外的 `Driver` 封装：构造时装入初始状态（停止连续数据，先静默
//! 上个会话可能遗留的连续流）并启动后台读线程；应用线程循环调用
//! `tick()` 推进状态机，状态自身的发送去重保证稳态下不重发。

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod flags;
pub mod reader;
pub mod state;
pub mod states;

pub use config::DriverConfig;
pub use context::DriverContext;
pub use error::DriverError;
pub use flags::SessionFlags;
pub use state::{CommandState, StateKind};

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::error;

use crate::serial::{SerialPortAdapter, SerialRx, SerialTx};
use states::setup::StopContinuousData;

/// 气体分析模块驱动（对外 API）
pub struct Driver {
    ctx: Arc<DriverContext>,
    reader: Option<JoinHandle<()>>,
    /// 关断通道发送端：Drop 时先行丢弃，读线程据此退出
    shutdown: Option<Sender<()>>,
}

impl Driver {
    /// 用已拆分的串口半部构造驱动并启动读线程
    pub fn new(
        rx: impl SerialRx + 'static,
        tx: impl SerialTx + Send + 'static,
        config: DriverConfig,
    ) -> Self {
        let ctx = Arc::new(DriverContext::new(Box::new(tx), config));
        ctx.transition_to(Arc::new(StopContinuousData::new()));

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let reader_ctx = ctx.clone();
        let reader = std::thread::spawn(move || reader::reader_loop(rx, shutdown_rx, reader_ctx));

        Self {
            ctx,
            reader: Some(reader),
            shutdown: Some(shutdown_tx),
        }
    }

    /// 按配置打开并拆分串口后构造驱动
    pub fn open(config: DriverConfig) -> Result<Self, DriverError> {
        let adapter = SerialPortAdapter::open(&config.port, config.baud, config.read_timeout())?;
        let (rx, tx) = adapter.split()?;
        Ok(Self::new(rx, tx, config))
    }

    /// 推进状态机一步
    pub fn tick(&self) {
        self.ctx.tick();
    }

    /// 会话标志
    pub fn flags(&self) -> &SessionFlags {
        self.ctx.flags()
    }

    /// 共享上下文（测试与诊断用）
    pub fn context(&self) -> &Arc<DriverContext> {
        &self.ctx
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        // 先丢弃发送端，接收端转为 Disconnected，读线程退出；
        // 这里只做有界等待的 join，避免测试无限阻塞
        drop(self.shutdown.take());
        if let Some(handle) = self.reader.take() {
            let start = std::time::Instant::now();
            while start.elapsed() < Duration::from_secs(2) {
                if handle.is_finished() {
                    break;
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                if handle.join().is_err() {
                    error!("reader thread panicked");
                }
            }
        }
    }
}
