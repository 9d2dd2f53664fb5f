//! 驱动运行入口
//!
//! 从环境变量取配置（GASMOD_PORT / GASMOD_BAUD / GASMOD_READ_TIMEOUT_MS，
//! 日志级别用 RUST_LOG），打开串口并循环推进状态机。

use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gasmod_sdk::{Driver, DriverConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = DriverConfig::from_env();
    info!(
        "starting gasmod driver on {} at {} baud",
        config.port, config.baud
    );

    let driver = match Driver::open(config) {
        Ok(driver) => driver,
        Err(e) => {
            error!("failed to open serial transport: {}", e);
            std::process::exit(1);
        }
    };

    loop {
        driver.tick();
        std::thread::sleep(Duration::from_millis(10));
    }
}
