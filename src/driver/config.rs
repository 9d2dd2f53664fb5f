//! 驱动配置

use std::time::Duration;

/// 驱动配置
///
/// # Example
///
/// ```
/// use gasmod_sdk::DriverConfig;
///
/// // 缺省配置（19200 8N1，100 ms 读超时）
/// let config = DriverConfig::default();
///
/// // 环境变量覆盖（GASMOD_PORT / GASMOD_BAUD / GASMOD_READ_TIMEOUT_MS）
/// let config = DriverConfig::from_env();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// 串口设备路径
    pub port: String,
    /// 波特率（模块固定 19200）
    pub baud: u32,
    /// 串口读超时（毫秒）
    pub read_timeout_ms: u64,
    /// 读线程空闲休眠（毫秒），线路空闲时约束 CPU；测试可调小
    pub reader_idle_sleep_ms: u64,
    /// 同步发送等待一次读取结果的上限（毫秒）
    /// 读线程每个读取周期都会发出信号，正常情况下等待不超过一个
    /// 读超时周期；上限只防备读线程已死的场景。
    pub sync_send_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud: 19_200,
            read_timeout_ms: 100,
            reader_idle_sleep_ms: 100,
            sync_send_timeout_ms: 250,
        }
    }
}

impl DriverConfig {
    /// 从环境变量构建，未设置的项取缺省值
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(port) = std::env::var("GASMOD_PORT") {
            config.port = port;
        }
        if let Ok(baud) = std::env::var("GASMOD_BAUD") {
            if let Ok(baud) = baud.parse() {
                config.baud = baud;
            }
        }
        if let Ok(timeout) = std::env::var("GASMOD_READ_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse() {
                config.read_timeout_ms = timeout;
            }
        }
        config
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn reader_idle_sleep(&self) -> Duration {
        Duration::from_millis(self.reader_idle_sleep_ms)
    }

    pub fn sync_send_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_send_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_module_line_settings() {
        let config = DriverConfig::default();
        assert_eq!(config.baud, 19_200);
        assert_eq!(config.read_timeout_ms, 100);
        assert_eq!(config.reader_idle_sleep_ms, 100);
    }
}
