//! GasMod SDK - 气体分析传感器模块 Rust 驱动
//!
//! 通过 RS-232 串口（19200 8N1）驱动旁流气体分析模块的主机侧 SDK。
//! 负责完整的初始化与运行序列：停止模块遗留的连续数据流、读取器件
//! 标识信息、配置呼吸检测与功能模式、订阅连续参数状态帧，并对帧中
//! 上报的状况（调零请求、积水杯告警、气路闭塞、部件失效、参数可用性
//! 变化）作出反应。所有活动写入结构化日志。
//!
//! # 架构层次
//!
//! - **传输层** (`serial`): 串口适配器 trait 与 `serialport` 后端
//! - **协议层** (`protocol`): 帧重组、校验和、NAK 错误码翻译
//! - **驱动层** (`driver`): 命令状态机、观察者分发、后台读线程

pub mod driver;
pub mod protocol;
pub mod serial;

// Re-export 核心类型（简化用户导入）
pub use driver::{Driver, DriverConfig, DriverError, SessionFlags};
pub use protocol::{Frame, FrameAssembler, ProtocolError};
pub use serial::{SerialError, SerialPortAdapter, SerialRx, SerialTx};
