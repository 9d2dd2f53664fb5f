//! 调零链
//!
//! 监督 0x0E 帧的 OMS 字节；模块处于测量模式时依次检查四个参数
//! 状态字节的"调零进行中"位，确认后重读模块功能（主流探头需要
//! 提示用户准备）再发起调零（命令 0x20）。

use std::sync::Arc;

use tracing::{info, warn};

use crate::driver::context::DriverContext;
use crate::driver::state::{
    ack_matches, log_nak, nak_matches, send_once, send_once_sync, CommandState, SendGate,
    StateKind,
};
use crate::driver::states::params::ReadParameterUnits;
use crate::protocol::ids::{
    CMD_CONTINUOUS, CMD_GENERIC_MODULE_FEATURES, CMD_INITIATE_ZERO, FEAT_ZERO_CTRL,
    ID_HANDLE_ZERO_REQUEST, ID_INITIATE_ZERO, ID_SUPERVISE_ZERO_REQUEST, ID_ZERO_IN_PROGRESS_A1,
    ID_ZERO_IN_PROGRESS_A2, ID_ZERO_IN_PROGRESS_CO2_N2O, ID_ZERO_IN_PROGRESS_O2,
    ID_ZERO_REQUEST, PS_ZERO_IN_PROGRESS, SEL_AGENT1_STATUS, SEL_AGENT2_STATUS,
    SEL_CO2_N2O_STATUS, SEL_O2_STATUS, SEL_PARAM_DETAILED_STATUS,
};
use crate::protocol::{encode_request, Frame};

/// 调零请求监督（0x0E 帧 OMS 字节）
pub struct SuperviseZeroRequest {
    gate: SendGate,
}

impl SuperviseZeroRequest {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for SuperviseZeroRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for SuperviseZeroRequest {
    fn command_id(&self) -> u32 {
        ID_SUPERVISE_ZERO_REQUEST
    }

    fn name(&self) -> &'static str {
        "SuperviseZeroRequest"
    }

    fn kind(&self) -> StateKind {
        StateKind::Continuous
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, _ctx: &DriverContext) {}

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if frame.is_ack()
            && frame.command() == CMD_CONTINUOUS
            && frame.selector() == Some(SEL_PARAM_DETAILED_STATUS)
        {
            if frame.at(12) == 0x00 {
                // 测量模式：逐参数检查调零进行中位
                ctx.transition_to(Arc::new(ZeroInProgress::new(ZeroParam::Co2N2o)));
            } else {
                ctx.transition_to(Arc::new(HandleZeroRequest::new()));
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 调零进行中检查的参数项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroParam {
    /// 0x12/0x03 帧：CO2_PS / N2O_PS
    Co2N2o,
    /// 0x12/0x04 帧：O2_PS
    O2,
    /// 0x12/0x10 帧：A1_PS
    Agent1,
    /// 0x12/0x11 帧：A2_PS
    Agent2,
}

impl ZeroParam {
    fn selector(self) -> u8 {
        match self {
            ZeroParam::Co2N2o => SEL_CO2_N2O_STATUS,
            ZeroParam::O2 => SEL_O2_STATUS,
            ZeroParam::Agent1 => SEL_AGENT1_STATUS,
            ZeroParam::Agent2 => SEL_AGENT2_STATUS,
        }
    }

    fn id(self) -> u32 {
        match self {
            ZeroParam::Co2N2o => ID_ZERO_IN_PROGRESS_CO2_N2O,
            ZeroParam::O2 => ID_ZERO_IN_PROGRESS_O2,
            ZeroParam::Agent1 => ID_ZERO_IN_PROGRESS_A1,
            ZeroParam::Agent2 => ID_ZERO_IN_PROGRESS_A2,
        }
    }

    /// 该参数的调零进行中位是否置位
    fn in_progress(self, frame: &Frame) -> bool {
        match self {
            ZeroParam::Co2N2o => {
                frame.at(11) & PS_ZERO_IN_PROGRESS != 0 || frame.at(12) & PS_ZERO_IN_PROGRESS != 0
            }
            ZeroParam::O2 => frame.at(11) & PS_ZERO_IN_PROGRESS != 0,
            ZeroParam::Agent1 => frame.at(11) & PS_ZERO_IN_PROGRESS != 0,
            ZeroParam::Agent2 => frame.at(12) & PS_ZERO_IN_PROGRESS != 0,
        }
    }

    fn next(self) -> Option<ZeroParam> {
        match self {
            ZeroParam::Co2N2o => Some(ZeroParam::O2),
            ZeroParam::O2 => Some(ZeroParam::Agent1),
            ZeroParam::Agent1 => Some(ZeroParam::Agent2),
            ZeroParam::Agent2 => None,
        }
    }
}

/// 逐参数的调零进行中检查
pub struct ZeroInProgress {
    param: ZeroParam,
    gate: SendGate,
}

impl ZeroInProgress {
    pub fn new(param: ZeroParam) -> Self {
        Self {
            param,
            gate: SendGate::new(),
        }
    }
}

impl CommandState for ZeroInProgress {
    fn command_id(&self) -> u32 {
        self.param.id()
    }

    fn name(&self) -> &'static str {
        match self.param {
            ZeroParam::Co2N2o => "ZeroInProgress(CO2/N2O)",
            ZeroParam::O2 => "ZeroInProgress(O2)",
            ZeroParam::Agent1 => "ZeroInProgress(A1)",
            ZeroParam::Agent2 => "ZeroInProgress(A2)",
        }
    }

    fn kind(&self) -> StateKind {
        StateKind::Continuous
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, _ctx: &DriverContext) {}

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if frame.is_ack()
            && frame.command() == CMD_CONTINUOUS
            && frame.selector() == Some(self.param.selector())
        {
            if self.param.in_progress(frame) {
                info!("{}: zero in progress", self.name());
                ctx.transition_to(Arc::new(HandleZeroRequest::new()));
            } else {
                match self.param.next() {
                    Some(next) => ctx.transition_to(Arc::new(ZeroInProgress::new(next))),
                    None => ctx.transition_to(Arc::new(ZeroRequest::new())),
                }
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 调零请求确认
pub struct ZeroRequest {
    gate: SendGate,
}

impl ZeroRequest {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for ZeroRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for ZeroRequest {
    fn command_id(&self) -> u32 {
        ID_ZERO_REQUEST
    }

    fn name(&self) -> &'static str {
        "ZeroRequest"
    }

    fn kind(&self) -> StateKind {
        StateKind::Continuous
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, _ctx: &DriverContext) {}

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if frame.is_ack()
            && frame.command() == CMD_CONTINUOUS
            && frame.selector() == Some(SEL_AGENT2_STATUS)
        {
            if frame.at(12) & PS_ZERO_IN_PROGRESS != 0 {
                info!("ZeroRequest: zero still in progress");
            }
            ctx.transition_to(Arc::new(HandleZeroRequest::new()));
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 处理调零请求：重读模块功能确定是否需要用户准备主流探头
pub struct HandleZeroRequest {
    gate: SendGate,
}

impl HandleZeroRequest {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for HandleZeroRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for HandleZeroRequest {
    fn command_id(&self) -> u32 {
        ID_HANDLE_ZERO_REQUEST
    }

    fn name(&self) -> &'static str {
        "HandleZeroRequest"
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
        send_once_sync(ctx, self);
    }

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if ack_matches(frame, CMD_GENERIC_MODULE_FEATURES, 4) {
            if frame.at(6) & FEAT_ZERO_CTRL != 0 {
                // 主流探头：调零前需要用户把探头移离气道
                warn!("prepare mainstream sensor for zeroing, proceeding without confirmation");
            }
            ctx.transition_to(Arc::new(InitiateZero::new()));
        } else if nak_matches(frame, CMD_GENERIC_MODULE_FEATURES) {
            log_nak(self.name(), frame);
        }
    }
}

/// 发起调零（命令 0x20）
pub struct InitiateZero {
    gate: SendGate,
}

impl InitiateZero {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for InitiateZero {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for InitiateZero {
    fn command_id(&self) -> u32 {
        ID_INITIATE_ZERO
    }

    fn name(&self) -> &'static str {
        "InitiateZero"
    }

    fn command_bytes(&self) -> Vec<u8> {
        encode_request(
            CMD_INITIATE_ZERO,
            &[0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00],
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
        if ack_matches(frame, CMD_INITIATE_ZERO, 0) {
            info!("InitiateZero: zero initiated");
            ctx.transition_to(Arc::new(ReadParameterUnits::new()));
        } else if nak_matches(frame, CMD_INITIATE_ZERO) {
            log_nak(self.name(), frame);
            info!("InitiateZero: skip to ReadParameterUnits");
            ctx.transition_to(Arc::new(ReadParameterUnits::new()));
        }
    }
}
