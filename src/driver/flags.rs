//! 会话标志
//!
//! 由特定状态从解码出的载荷位写入、由后续状态读取分支的五个会话级
//! 标志。全部为原子量，读线程与 `tick()` 线程可并发访问。

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// 驱动会话标志
#[derive(Debug, Default)]
pub struct SessionFlags {
    pneumatics_enabled: AtomicBool,
    auto_zero_condition: AtomicBool,
    pai_available: AtomicBool,
    needs_external_data: AtomicBool,
    hsp: AtomicU8,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// 气路部件（阀/泵）是否可用
    pub fn pneumatics_enabled(&self) -> bool {
        self.pneumatics_enabled.load(Ordering::Acquire)
    }

    pub fn set_pneumatics_enabled(&self, enabled: bool) {
        self.pneumatics_enabled.store(enabled, Ordering::Release);
    }

    /// 模块是否自动调零（ZERO_CTRL 位取反）
    pub fn auto_zero_condition(&self) -> bool {
        self.auto_zero_condition.load(Ordering::Acquire)
    }

    pub fn set_auto_zero_condition(&self, auto: bool) {
        self.auto_zero_condition.store(auto, Ordering::Release);
    }

    /// 参数可用性信息（PAI）是否表明参数已安装
    pub fn pai_available(&self) -> bool {
        self.pai_available.load(Ordering::Acquire)
    }

    pub fn set_pai_available(&self, available: bool) {
        self.pai_available.store(available, Ordering::Release);
    }

    /// 模块是否需要主机提供外部参数数据
    pub fn needs_external_data(&self) -> bool {
        self.needs_external_data.load(Ordering::Acquire)
    }

    pub fn set_needs_external_data(&self, needs: bool) {
        self.needs_external_data.store(needs, Ordering::Release);
    }

    /// 主机可选参数字节（HSP）原值
    pub fn hsp_byte(&self) -> u8 {
        self.hsp.load(Ordering::Acquire)
    }

    pub fn set_hsp_byte(&self, hsp: u8) {
        self.hsp.store(hsp, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_default_cleared() {
        let flags = SessionFlags::new();
        assert!(!flags.pneumatics_enabled());
        assert!(!flags.auto_zero_condition());
        assert!(!flags.pai_available());
        assert!(!flags.needs_external_data());
        assert_eq!(flags.hsp_byte(), 0);
    }

    #[test]
    fn test_flags_roundtrip() {
        let flags = SessionFlags::new();
        flags.set_pneumatics_enabled(true);
        flags.set_auto_zero_condition(true);
        flags.set_pai_available(true);
        flags.set_needs_external_data(true);
        flags.set_hsp_byte(0xDE);
        assert!(flags.pneumatics_enabled());
        assert!(flags.auto_zero_condition());
        assert!(flags.pai_available());
        assert!(flags.needs_external_data());
        assert_eq!(flags.hsp_byte(), 0xDE);
    }
}
