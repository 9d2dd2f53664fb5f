//! 协议层模块
//!
//! 负责把串口的原始字节流重组为完整的应答帧，以及把请求编码为
//! 模块要求的线上格式。
//!
//! 线上帧布局（字节序）：`status(1) | opcode(1) | length(1) | payload(length) | checksum(1)`。
//! 应答帧的 `status` 为 0x06（ACK）或 0x15（NAK）；主机请求使用同样
//! 的外形，`status` 固定为 0x10（SOH），`length` 计入 opcode 与参数。

pub mod errors;
pub mod frame;
pub mod ids;

pub use errors::error_text;
pub use frame::{Frame, FrameAssembler};

use thiserror::Error;

/// 应答帧状态字节：成功（ACK）
pub const ACK: u8 = 0x06;
/// 应答帧状态字节：失败（NAK）
pub const NAK: u8 = 0x15;
/// 请求帧起始字节（SOH）
pub const SOH: u8 = 0x10;

/// 帧头长度：status + opcode + length
pub const FRAME_HEADER_LEN: usize = 3;

/// 协议解析错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Truncated frame: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },

    #[error("Invalid status byte: 0x{0:02X}")]
    InvalidStatus(u8),
}

/// 计算补码校验和
///
/// 校验和是使整帧按 256 取模求和为 0 的尾字节。对照模块文档的命令帧验证：
/// `10 01 19` 的校验和为 `D6`（0x10+0x01+0x19+0xD6 = 0x100）。
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
        .wrapping_neg()
}

/// 编码一条主机请求
///
/// 布局：`SOH | length | opcode | params... | checksum`，其中 `length`
/// 计入 opcode 与全部参数字节。
pub fn encode_request(opcode: u8, params: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + params.len());
    out.push(SOH);
    out.push((1 + params.len()) as u8);
    out.push(opcode);
    out.extend_from_slice(params);
    out.push(checksum(&out));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_sums_to_zero() {
        let body = [0x10, 0x01, 0x19];
        let cs = checksum(&body);
        assert_eq!(cs, 0xD6);
        let total: u8 = body.iter().fold(cs, |a, b| a.wrapping_add(*b));
        assert_eq!(total, 0);
    }

    #[test]
    fn test_encode_stop_continuous_data() {
        // 对照模块文档的停止连续数据命令
        assert_eq!(encode_request(0x19, &[]), vec![0x10, 0x01, 0x19, 0xD6]);
    }

    #[test]
    fn test_encode_get_interval_base_time() {
        assert_eq!(
            encode_request(0x02, &[0xFF]),
            vec![0x10, 0x02, 0x02, 0xFF, 0xED]
        );
    }

    #[test]
    fn test_encode_device_component_info_vendor_code() {
        let mut params = [0u8; 9];
        params[8] = 0x00; // selector: vendor code
        assert_eq!(
            encode_request(0x0A, &params),
            vec![0x10, 0x0A, 0x0A, 0, 0, 0, 0, 0, 0, 0, 0, 0x00, 0xDC]
        );
    }

    #[test]
    fn test_encode_initiate_zero() {
        assert_eq!(
            encode_request(0x20, &[0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00]),
            vec![0x10, 0x0B, 0x20, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0xC3]
        );
    }

    #[test]
    fn test_encode_transmit_patient_data() {
        assert_eq!(
            encode_request(
                0x12,
                &[0x00, 0x00, 0x00, 0x00, 0x00, 0x0F, 0x68, 0x18, 0x40, 0x1F, 0x00, 0x3C]
            ),
            vec![
                0x10, 0x0D, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0F, 0x68, 0x18, 0x40, 0x1F,
                0x00, 0x3C, 0xA7
            ]
        );
    }
}
