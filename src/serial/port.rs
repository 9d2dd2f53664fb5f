//! `serialport` 后端适配器
//!
//! 打开 RS-232 串口（缺省 19200 8N1、100 ms 读超时）并按单读单写
//! 拆分为两个半部。`serialport` 的句柄通过 `try_clone()` 复制文件
//! 描述符，读写各持一份，满足驱动的双线程并发模型。

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};

use super::{SerialError, SerialRx, SerialTx};

/// RS-232 串口适配器（拆分前）
pub struct SerialPortAdapter {
    port: Box<dyn SerialPort>,
}

impl SerialPortAdapter {
    /// 打开串口
    ///
    /// # 参数
    /// - `path`: 设备路径（如 `/dev/ttyUSB0`、`COM9`）
    /// - `baud`: 波特率（模块固定 19200）
    /// - `read_timeout`: 读超时；超时返回 0 字节是空闲线路的正常结果
    pub fn open(path: &str, baud: u32, read_timeout: Duration) -> Result<Self, SerialError> {
        let port = serialport::new(path, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(read_timeout)
            .open()
            .map_err(|source| SerialError::Open {
                port: path.to_string(),
                source,
            })?;
        Ok(Self { port })
    }

    /// 拆分为独立的接收/发送半部
    ///
    /// 此方法消费 `self`；两个半部可在不同线程并发使用。
    pub fn split(self) -> Result<(SerialPortRx, SerialPortTx), SerialError> {
        let tx = self.port.try_clone().map_err(SerialError::Split)?;
        Ok((SerialPortRx { port: self.port }, SerialPortTx { port: tx }))
    }
}

/// 接收半部（移交给读线程）
pub struct SerialPortRx {
    port: Box<dyn SerialPort>,
}

impl SerialRx for SerialPortRx {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            // 读超时是正常结果，折算为 0 字节
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(0)
            }
            Err(e) => Err(SerialError::Io(e)),
        }
    }
}

/// 发送半部（留在 `tick()` 线程）
pub struct SerialPortTx {
    port: Box<dyn SerialPort>,
}

impl SerialTx for SerialPortTx {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }
}
