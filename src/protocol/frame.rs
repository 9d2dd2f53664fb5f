//! 应答帧与帧重组器
//!
//! `Frame` 持有线上原始字节并提供按字段与按线上下标两种访问方式；
//! 模块文档中所有位定义都以线上下标（status 为第 0 字节）标注，
//! 因此状态机代码统一用 `at(i)` 读取。
//!
//! `FrameAssembler` 把任意切分的字节块增量重组为完整帧。对同一输入
//! 流，无论块边界如何划分，产出的帧序列相同。

use tracing::debug;

use super::{ACK, FRAME_HEADER_LEN, NAK};

/// 一条完整的应答帧（线上字节的所有权副本）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> Self {
        debug_assert!(bytes.len() >= FRAME_HEADER_LEN + 1);
        Frame { bytes }
    }

    /// 状态字节：0x06 = ACK，0x15 = NAK
    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    /// 本帧应答（或流式携带）的命令操作码
    pub fn command(&self) -> u8 {
        self.bytes[1]
    }

    /// 载荷字节数（不含尾部校验和）
    pub fn length(&self) -> u8 {
        self.bytes[2]
    }

    /// 载荷切片
    pub fn payload(&self) -> &[u8] {
        &self.bytes[FRAME_HEADER_LEN..self.bytes.len() - 1]
    }

    /// 尾部校验和（本层不复验，会话内视链路为可靠）
    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    /// 线上原始字节
    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }

    /// 按线上下标取字节，越界返回 0
    ///
    /// 连续帧的位定义均以线上下标标注（例如 0x12/0x0E 帧的帧选择子
    /// 在第 13 字节），越界按 0 处理可以让位匹配自然落空而不是崩溃。
    pub fn at(&self, index: usize) -> u8 {
        self.bytes.get(index).copied().unwrap_or(0)
    }

    /// 是否为成功应答
    pub fn is_ack(&self) -> bool {
        self.status() == ACK
    }

    /// 是否为失败应答
    pub fn is_nak(&self) -> bool {
        self.status() == NAK
    }

    /// 连续帧（opcode 0x12）的帧选择子，其他帧返回 `None`
    pub fn selector(&self) -> Option<u8> {
        if self.command() == 0x12 && self.bytes.len() > 13 {
            Some(self.bytes[13])
        } else {
            None
        }
    }
}

/// 增量帧重组器
///
/// 算法（对应模块文档的 ACK 应答格式）：
/// 1. 不足 3 字节帧头则等待；
/// 2. 按第 2 字节（载荷长度）等待 `3 + len + 1` 字节；
/// 3. 首字节不是 ACK/NAK 说明流失步，丢弃一个字节后重扫；
/// 4. 取出整帧，重复。一个输入块可产出多帧。
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: Vec<u8>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加新到达的字节
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// 尝试取出下一条完整帧
    ///
    /// 返回 `None` 表示缓冲内暂无完整帧；部分帧保留到下一次 `push`。
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            if self.buf.len() < FRAME_HEADER_LEN {
                return None;
            }
            let status = self.buf[0];
            if status != ACK && status != NAK {
                // 流失步：丢弃一个前导字节后重新扫描
                debug!("frame desync, dropping leading byte 0x{:02X}", status);
                self.buf.remove(0);
                continue;
            }
            let total = FRAME_HEADER_LEN + self.buf[2] as usize + 1;
            if self.buf.len() < total {
                return None;
            }
            let rest = self.buf.split_off(total);
            let frame = Frame::from_bytes(std::mem::replace(&mut self.buf, rest));
            return Some(frame);
        }
    }

    /// 当前缓冲的未消费字节数
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(asm: &mut FrameAssembler) -> Vec<Frame> {
        let mut out = Vec::new();
        while let Some(f) = asm.next_frame() {
            out.push(f);
        }
        out
    }

    #[test]
    fn test_single_frame() {
        let mut asm = FrameAssembler::new();
        asm.push(&[0x06, 0x19, 0x00, 0xE1]);
        let frames = drain(&mut asm);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_ack());
        assert_eq!(frames[0].command(), 0x19);
        assert_eq!(frames[0].length(), 0);
        assert_eq!(frames[0].payload(), &[]);
        assert_eq!(frames[0].checksum(), 0xE1);
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn test_partial_frame_across_chunks() {
        let mut asm = FrameAssembler::new();
        asm.push(&[0x15, 0x02]);
        assert!(asm.next_frame().is_none());
        asm.push(&[0x01]);
        assert!(asm.next_frame().is_none());
        asm.push(&[0x12, 0xD8]);
        let f = asm.next_frame().unwrap();
        assert!(f.is_nak());
        assert_eq!(f.payload(), &[0x12]);
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut asm = FrameAssembler::new();
        asm.push(&[0x06, 0x19, 0x00, 0xE1, 0x06, 0x2B, 0x00, 0xCF]);
        let frames = drain(&mut asm);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command(), 0x19);
        assert_eq!(frames[1].command(), 0x2B);
    }

    #[test]
    fn test_desync_recovery_drops_leading_garbage() {
        // 两个 0xFF 前导字节被逐个丢弃
        let mut asm = FrameAssembler::new();
        asm.push(&[0xFF, 0xFF, 0x06, 0x19, 0x00, 0xE1]);
        let frames = drain(&mut asm);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].raw(), &[0x06, 0x19, 0x00, 0xE1]);
    }

    #[test]
    fn test_chunking_invariance() {
        // 帧重组是输入字节流的纯函数，与块边界无关
        let stream: Vec<u8> = vec![
            0xFF, // 噪声
            0x06, 0x19, 0x00, 0xE1, // stop-continuous-data ACK
            0x15, 0x02, 0x01, 0x12, 0xD8, // NAK: frame not supported
            0x06, 0x2C, 0x04, 0x00, 0x00, 0x00, 0x07, 0xC3, // features
        ];

        let mut whole = FrameAssembler::new();
        whole.push(&stream);
        let expect = drain(&mut whole);
        assert_eq!(expect.len(), 3);

        for chunk in 1..stream.len() {
            let mut asm = FrameAssembler::new();
            let mut got = Vec::new();
            for part in stream.chunks(chunk) {
                asm.push(part);
                got.extend(drain(&mut asm));
            }
            assert_eq!(got, expect, "chunk size {}", chunk);
        }
    }

    #[test]
    fn test_at_out_of_range_is_zero() {
        let mut asm = FrameAssembler::new();
        asm.push(&[0x06, 0x19, 0x00, 0xE1]);
        let f = asm.next_frame().unwrap();
        assert_eq!(f.at(0), 0x06);
        assert_eq!(f.at(13), 0);
        assert_eq!(f.selector(), None);
    }

    #[test]
    fn test_selector_of_continuous_frame() {
        // 构造一条最小的 0x12 连续帧：载荷 11 字节，线上第 13 字节为选择子
        let mut bytes = vec![0x06, 0x12, 0x0B];
        bytes.extend_from_slice(&[0u8; 11]);
        bytes[13] = 0x0E;
        let cs = crate::protocol::checksum(&bytes);
        bytes.push(cs);
        let mut asm = FrameAssembler::new();
        asm.push(&bytes);
        let f = asm.next_frame().unwrap();
        assert_eq!(f.selector(), Some(0x0E));
    }
}
