//! NAK 错误码翻译表
//!
//! 模块在 NAK 应答的首个载荷字节里携带错误码；操作员在日志里读到的
//! 是这里的译文，因此字符串属于对外契约，逐字保留模块文档的写法。
//! 对 0..=255 的任意取值本表都给出非空文本（缺省 "No Error"）。

/// 把 NAK 错误码翻译为可读文本
pub fn error_text(code: u8) -> &'static str {
    match code {
        0x01 => "Zero Or Span Of Any Component In Progress",
        0x02 => "Wrong Parameter",
        0x03 => "Wrong Unit",
        0x04 => "Agent Not Supported",
        0x08 => "Span Invalid Tag",
        0x10 => "Parameter Not Supported",
        0x11 => "Not Allowed At This Moment",
        0x12 => "Frame Not Supported",
        0x13 => "Rt Not Supported",
        0x14 => "Wrong Interval Base Time",
        0x15 => "Data Not Available Yet",
        0x20 => "Eeprom Access Failed",
        0x22 => "Non Volatile Memory Access Failed",
        0x31 => "Watertrap Is Full",
        0x60 => "Tpu Timeout",
        0x70 => "Wrong Parameter Set Order",
        0x71 => "Wrong Parameter Set Type",
        0x72 => "Wrong Parameter Set Value",
        0x73 => "Wrong Parameter Set Non-Zero",
        0x74 => "Checksum Failure",
        0x75 => "Verification Of New Parameter In Eeprom Failed",
        0x76 => "Wrong Parameter Number",
        0x77 => "Calibration Value Can Not Be Stored With This Command",
        0x78 => "Data Amount Out Of Range",
        0x79 => "Calibration Value Storage Failed Old Value Ok",
        0x7A => "Calibration Value Storage Failed Old Corrupted",
        0x7B => "Hardware Supervision Eeprom Access Failed",
        0x7C => "Get Fail Software Error",
        0x90 => "Calibration Cancelled",
        0x91 => "No Calibration Data Available",
        0x92 => "Just Collecting Calibration Data",
        0x93 => "Calibration Data Transmitted",
        0xA0 => "Delay Time Is Zero",
        0xA1 => "Invalid Amount Of Parameters",
        0xA2 => "Factory Calibration Hardware Error",
        0xA3 => "Factory Calibration Warm-Up",
        0xA4 => "Data Not Available",
        0xA5 => "Parameter Error Zero Gas Type",
        0xA6 => "Parameter Error For Limit",
        0xA7 => "Parameter Error For Zero Mode",
        0xB0 => "Failed",
        0xC0 => "Subcomponent Not Available For This Purpose",
        0xC1 => "Sub Component Does Not Support This Mode",
        0xCE => "Write Access Not Allowed",
        0xCF => "Does Not Exist",
        0xFF => "Unknown Command",
        _ => "No Error",
    }
}
