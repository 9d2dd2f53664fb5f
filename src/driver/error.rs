//! 驱动层错误类型定义

use thiserror::Error;

use crate::protocol::ProtocolError;
use crate::serial::SerialError;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口传输错误（致命，终止会话）
    #[error("Serial transport error: {0}")]
    Serial(#[from] SerialError),

    /// 协议层错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_serial_error() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "line lost");
        let err: DriverError = DriverError::from(SerialError::Io(io));
        assert!(matches!(err, DriverError::Serial(_)));
        assert!(err.to_string().contains("Serial transport error"));
    }
}
