//! 初始化序列前段：静默、标识、校时、功能
//!
//! 序列从停止连续数据开始：模块可能还在发送上个会话遗留的连续流，
//! 先将其静默，识别查询才能得到干净的应答。

use std::sync::Arc;

use tracing::info;

use crate::driver::context::DriverContext;
use crate::driver::state::{
    ack_matches, log_nak, nak_matches, send_once, send_once_sync, CommandState, SendGate,
};
use crate::driver::states::breath::{BreathDetectionMode, SwitchBreathDetectionMode};
use crate::driver::states::STOP_RETRY_INTERVAL;
use crate::protocol::ids::{
    CMD_ADJUST_TIME_INFORMATION, CMD_DEVICE_COMPONENT_INFO, CMD_GENERIC_MODULE_FEATURES,
    CMD_GET_INTERVAL_BASE_TIME, CMD_STOP_CONTINUOUS_DATA, FEAT_PNEUMATICS_AVAILABLE,
    FEAT_PNEUMATICS_PRESENT, FEAT_ZERO_CTRL, ID_ADJUST_TIME_INFORMATION, ID_DEVICE_INFO_BASE,
    ID_GENERIC_MODULE_FEATURES, ID_GET_INTERVAL_BASE_TIME, ID_STOP_CONTINUOUS_DATA,
};
use crate::protocol::{encode_request, Frame};

/// 停止连续数据（初始状态，也是所有致命失败的回落点）
///
/// 同步发送：只有等待期间确有字节到达才认定送达，否则每 150 ms
/// 重发一次，模块静默前不会推进。
pub struct StopContinuousData {
    gate: SendGate,
}

impl StopContinuousData {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for StopContinuousData {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for StopContinuousData {
    fn command_id(&self) -> u32 {
        ID_STOP_CONTINUOUS_DATA
    }

    fn name(&self) -> &'static str {
        "StopContinuousData"
    }

    fn command_bytes(&self) -> Vec<u8> {
        encode_request(CMD_STOP_CONTINUOUS_DATA, &[])
    }

    fn expected_reply_len(&self) -> usize {
        4
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, ctx: &DriverContext) {
        if self.gate.already_sent() {
            return;
        }
        if !self.gate.interval_elapsed(STOP_RETRY_INTERVAL) {
            return;
        }
        send_once_sync(ctx, self);
    }

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if ack_matches(frame, CMD_STOP_CONTINUOUS_DATA, 0) {
            info!("StopContinuousData: module silenced");
            ctx.transition_to(Arc::new(GetIntervalBaseTime::new()));
        }
    }
}

/// 读取间隔基准时间
pub struct GetIntervalBaseTime {
    gate: SendGate,
}

impl GetIntervalBaseTime {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for GetIntervalBaseTime {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for GetIntervalBaseTime {
    fn command_id(&self) -> u32 {
        ID_GET_INTERVAL_BASE_TIME
    }

    fn name(&self) -> &'static str {
        "GetIntervalBaseTime"
    }

    fn command_bytes(&self) -> Vec<u8> {
        encode_request(CMD_GET_INTERVAL_BASE_TIME, &[0xFF])
    }

    fn expected_reply_len(&self) -> usize {
        6
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, ctx: &DriverContext) {
        send_once_sync(ctx, self);
    }

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if ack_matches(frame, CMD_GET_INTERVAL_BASE_TIME, 2) {
            info!(
                "GetIntervalBaseTime: interval base time {:02X} {:02X}",
                frame.at(3),
                frame.at(4)
            );
            ctx.transition_to(Arc::new(DeviceComponentInfo::new(
                ComponentSelector::VendorCode,
            )));
        } else if nak_matches(frame, CMD_GET_INTERVAL_BASE_TIME) {
            log_nak(self.name(), frame);
            info!("GetIntervalBaseTime: skip to DeviceComponentInfo(VendorCode)");
            ctx.transition_to(Arc::new(DeviceComponentInfo::new(
                ComponentSelector::VendorCode,
            )));
        }
    }
}

/// 器件部件信息的选择子（命令 0x0A 的最后一个参数字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentSelector {
    VendorCode,
    SerialNumber,
    HardwareRevision,
    SoftwareRevision,
    ProductName,
    PartNumber,
}

impl ComponentSelector {
    /// 线上选择子字节
    pub fn code(self) -> u8 {
        match self {
            ComponentSelector::VendorCode => 0x00,
            ComponentSelector::SerialNumber => 0x01,
            ComponentSelector::HardwareRevision => 0x02,
            ComponentSelector::SoftwareRevision => 0x03,
            ComponentSelector::ProductName => 0x05,
            ComponentSelector::PartNumber => 0x06,
        }
    }

    /// 序列中的下一个选择子
    pub fn next(self) -> Option<ComponentSelector> {
        match self {
            ComponentSelector::VendorCode => Some(ComponentSelector::SerialNumber),
            ComponentSelector::SerialNumber => Some(ComponentSelector::HardwareRevision),
            ComponentSelector::HardwareRevision => Some(ComponentSelector::SoftwareRevision),
            ComponentSelector::SoftwareRevision => Some(ComponentSelector::ProductName),
            ComponentSelector::ProductName => Some(ComponentSelector::PartNumber),
            ComponentSelector::PartNumber => None,
        }
    }
}

/// 读取器件部件信息（按选择子遍历六项标识）
///
/// 应答在线上第 11..=20 字节携带 ASCII 文本，第 21 字节回显选择子，
/// 用于确认这确实是自己那条查询的应答。
pub struct DeviceComponentInfo {
    selector: ComponentSelector,
    gate: SendGate,
}

impl DeviceComponentInfo {
    pub fn new(selector: ComponentSelector) -> Self {
        Self {
            selector,
            gate: SendGate::new(),
        }
    }

    fn advance(&self, ctx: &DriverContext) {
        match self.selector.next() {
            Some(next) => ctx.transition_to(Arc::new(DeviceComponentInfo::new(next))),
            None => ctx.transition_to(Arc::new(AdjustTimeInformation::new())),
        }
    }
}

impl CommandState for DeviceComponentInfo {
    fn command_id(&self) -> u32 {
        ID_DEVICE_INFO_BASE | self.selector.code() as u32
    }

    fn name(&self) -> &'static str {
        match self.selector {
            ComponentSelector::VendorCode => "DeviceComponentInfo(VendorCode)",
            ComponentSelector::SerialNumber => "DeviceComponentInfo(SerialNumber)",
            ComponentSelector::HardwareRevision => "DeviceComponentInfo(HardwareRevision)",
            ComponentSelector::SoftwareRevision => "DeviceComponentInfo(SoftwareRevision)",
            ComponentSelector::ProductName => "DeviceComponentInfo(ProductName)",
            ComponentSelector::PartNumber => "DeviceComponentInfo(PartNumber)",
        }
    }

    fn command_bytes(&self) -> Vec<u8> {
        let mut params = [0u8; 9];
        params[8] = self.selector.code();
        encode_request(CMD_DEVICE_COMPONENT_INFO, &params)
    }

    fn expected_reply_len(&self) -> usize {
        24
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, ctx: &DriverContext) {
        // 第一项同步发送探测模块在线，其余即发即忘
        if self.selector == ComponentSelector::VendorCode {
            send_once_sync(ctx, self);
        } else {
            send_once(ctx, self);
        }
    }

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if ack_matches(frame, CMD_DEVICE_COMPONENT_INFO, 0x14) {
            let text: String = (11..=20)
                .map(|i| frame.at(i) as char)
                .filter(|c| !c.is_control())
                .collect();
            info!("{}: {}", self.name(), text.trim());
            // 回显的选择子吻合才算自己的应答
            if frame.at(21) == self.selector.code() {
                self.advance(ctx);
            }
        } else if nak_matches(frame, CMD_DEVICE_COMPONENT_INFO) {
            log_nak(self.name(), frame);
            info!("{}: skip to next component", self.name());
            self.advance(ctx);
        }
    }
}

/// 校正模块时间信息
pub struct AdjustTimeInformation {
    gate: SendGate,
}

impl AdjustTimeInformation {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for AdjustTimeInformation {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for AdjustTimeInformation {
    fn command_id(&self) -> u32 {
        ID_ADJUST_TIME_INFORMATION
    }

    fn name(&self) -> &'static str {
        "AdjustTimeInformation"
    }

    fn command_bytes(&self) -> Vec<u8> {
        encode_request(
            CMD_ADJUST_TIME_INFORMATION,
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x18, 0x00, 0x00],
        )
    }

    fn expected_reply_len(&self) -> usize {
        4
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, ctx: &DriverContext) {
        send_once(ctx, self);
    }

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if ack_matches(frame, CMD_ADJUST_TIME_INFORMATION, 0) {
            ctx.transition_to(Arc::new(TransmitGenericModuleFeatures::new()));
        } else if nak_matches(frame, CMD_ADJUST_TIME_INFORMATION) {
            log_nak(self.name(), frame);
            ctx.transition_to(Arc::new(StopContinuousData::new()));
        }
    }
}

/// 读取通用模块功能
///
/// 应答的线上第 6 字节携带功能位：bit1/bit2 组合给出气路部件可用性，
/// bit0（ZERO_CTRL）置位表示自动调零被禁用（取反写入会话标志）。
pub struct TransmitGenericModuleFeatures {
    gate: SendGate,
}

impl TransmitGenericModuleFeatures {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for TransmitGenericModuleFeatures {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for TransmitGenericModuleFeatures {
    fn command_id(&self) -> u32 {
        ID_GENERIC_MODULE_FEATURES
    }

    fn name(&self) -> &'static str {
        "TransmitGenericModuleFeatures"
    }

    fn command_bytes(&self) -> Vec<u8> {
        encode_request(CMD_GENERIC_MODULE_FEATURES, &[])
    }

    fn expected_reply_len(&self) -> usize {
        8
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, ctx: &DriverContext) {
        send_once(ctx, self);
    }

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if ack_matches(frame, CMD_GENERIC_MODULE_FEATURES, 4) {
            let features = frame.at(6);
            let pneumatics = features & FEAT_PNEUMATICS_PRESENT != 0
                && features & FEAT_PNEUMATICS_AVAILABLE != 0;
            ctx.flags().set_pneumatics_enabled(pneumatics);
            // ZERO_CTRL 置位 = 自动调零被禁用
            ctx.flags().set_auto_zero_condition(features & FEAT_ZERO_CTRL == 0);
            info!(
                "TransmitGenericModuleFeatures: pneumatics_enabled={} auto_zero={}",
                pneumatics,
                ctx.flags().auto_zero_condition()
            );
            ctx.transition_to(Arc::new(SwitchBreathDetectionMode::new(
                BreathDetectionMode::ProgramBreath,
            )));
        } else if nak_matches(frame, CMD_GENERIC_MODULE_FEATURES) {
            log_nak(self.name(), frame);
            info!("TransmitGenericModuleFeatures: skip to breath detection setup");
            ctx.transition_to(Arc::new(SwitchBreathDetectionMode::new(
                BreathDetectionMode::ProgramBreath,
            )));
        }
    }
}
