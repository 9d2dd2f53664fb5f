//! 串口适配层核心定义
//!
//! 提供统一的串口接口抽象。驱动采用单读单写的双线程拆分：读半部
//! 移交给后台读线程，写半部留在调用 `tick()` 的线程。
//!
//! 语义：
//! - `SerialRx::read()`: 阻塞直到有字节到达或读超时；超时返回 `Ok(0)`，
//!   这是空闲线路的正常结果，读线程用它维护活性标志。
//! - `SerialTx::write()`: 整帧写入成功即返回。

pub mod port;

pub use port::{SerialPortAdapter, SerialPortRx, SerialPortTx};

use thiserror::Error;

/// 串口适配层统一错误类型
///
/// 传输层错误均为致命错误：记录 critical 级日志并终止会话。
#[derive(Error, Debug)]
pub enum SerialError {
    /// 打开串口失败
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// 读/写底层 IO 错误
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 拆分读写半部失败
    #[error("Failed to split serial port: {0}")]
    Split(serialport::Error),
}

/// 串口接收半部 Trait
pub trait SerialRx: Send {
    /// 读取当前缓冲的字节，最多 `buf.len()` 个
    ///
    /// 超时返回 `Ok(0)`（可重试的正常结果），其余错误视为致命。
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;
}

/// 串口发送半部 Trait
pub trait SerialTx: Send {
    /// 写出一条完整的请求帧
    fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError>;
}
