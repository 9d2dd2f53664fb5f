//! 麻醉气体选择路径
//!
//! 依据 0x12/0x0E 帧的 PAI 位与 0x12/0x10 帧的气体识别位（NAIF/DAIF）
//! 在四个分支之间路由：评估识别结果、显式选择气体种类、由主机提供
//! 模块所需数据、接受外部参数数据。

use std::sync::Arc;

use tracing::info;

use crate::driver::context::DriverContext;
use crate::driver::state::{
    ack_matches, log_nak, nak_matches, send_once, CommandState, SendGate, StateKind,
};
use crate::driver::states::setup::StopContinuousData;
use crate::driver::states::supervise::CheckWatertrap;
use crate::protocol::ids::{
    AIF_DETECTED, AIF_MASK, CMD_ACCEPT_EXTERNAL_DATA, CMD_CONTINUOUS, CMD_SELECT_AGENT_TYPE,
    HSP_EXTERNAL_DATA_MASK, ID_ACCEPT_EXTERNAL_DATA, ID_EVALUATE_AGENT_IDENT,
    ID_PROVIDE_REQUIRED_DATA, ID_SELECT_AGENT_TYPE, ID_SELECT_ANESTHETIC_AGENT,
    PAI_AVAILABLE_MASK, SEL_AGENT1_STATUS, SEL_PARAM_DETAILED_STATUS,
};
use crate::protocol::{encode_request, Frame};

/// 麻醉气体选择入口（连续订阅，检查 PAI）
pub struct SelectAnestheticAgent {
    gate: SendGate,
}

impl SelectAnestheticAgent {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for SelectAnestheticAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for SelectAnestheticAgent {
    fn command_id(&self) -> u32 {
        ID_SELECT_ANESTHETIC_AGENT
    }

    fn name(&self) -> &'static str {
        "SelectAnestheticAgent"
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
            if frame.at(4) & PAI_AVAILABLE_MASK != 0 {
                info!("SelectAnestheticAgent: PAI is available");
                ctx.flags().set_pai_available(true);
                ctx.transition_to(Arc::new(EvaluateAgentIdent::new()));
            } else {
                ctx.transition_to(Arc::new(ProvideRequiredData::new()));
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 评估 0x12/0x10 帧的气体识别位
pub struct EvaluateAgentIdent {
    gate: SendGate,
}

impl EvaluateAgentIdent {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for EvaluateAgentIdent {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for EvaluateAgentIdent {
    fn command_id(&self) -> u32 {
        ID_EVALUATE_AGENT_IDENT
    }

    fn name(&self) -> &'static str {
        "EvaluateAgentIdent"
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
            && frame.selector() == Some(SEL_AGENT1_STATUS)
        {
            let aif = frame.at(9);
            if aif & AIF_MASK == 0 {
                // NAIF：模块未识别出气体，由主机显式选择
                info!("EvaluateAgentIdent: no agent identified (NAIF)");
                ctx.transition_to(Arc::new(SelectAnestheticAgentType::new()));
            } else if aif & AIF_DETECTED != 0 {
                // DAIF：模块已自行识别
                info!("EvaluateAgentIdent: agent identified by module (DAIF)");
                ctx.transition_to(Arc::new(ProvideRequiredData::new()));
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 显式选择麻醉气体种类（氟烷）
pub struct SelectAnestheticAgentType {
    gate: SendGate,
}

impl SelectAnestheticAgentType {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for SelectAnestheticAgentType {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for SelectAnestheticAgentType {
    fn command_id(&self) -> u32 {
        ID_SELECT_AGENT_TYPE
    }

    fn name(&self) -> &'static str {
        "SelectAnestheticAgentType(Halothane)"
    }

    fn command_bytes(&self) -> Vec<u8> {
        encode_request(CMD_SELECT_AGENT_TYPE, &[0x01, 0x00])
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
        if ack_matches(frame, CMD_SELECT_AGENT_TYPE, 0) {
            ctx.transition_to(Arc::new(ProvideRequiredData::new()));
        } else if nak_matches(frame, CMD_SELECT_AGENT_TYPE) {
            log_nak(self.name(), frame);
            ctx.transition_to(Arc::new(StopContinuousData::new()));
        }
    }
}

/// 由主机提供模块所需数据（连续订阅，检查 HSP）
pub struct ProvideRequiredData {
    gate: SendGate,
}

impl ProvideRequiredData {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for ProvideRequiredData {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for ProvideRequiredData {
    fn command_id(&self) -> u32 {
        ID_PROVIDE_REQUIRED_DATA
    }

    fn name(&self) -> &'static str {
        "ProvideRequiredData"
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
            if frame.at(7) & HSP_EXTERNAL_DATA_MASK != 0 {
                info!("ProvideRequiredData: module needs external data");
                ctx.transition_to(Arc::new(AcceptExternalParameterData::new()));
            } else {
                info!("ProvideRequiredData: no external data needed");
                ctx.transition_to(Arc::new(CheckWatertrap::new()));
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 接受外部参数数据（精度未知档）
pub struct AcceptExternalParameterData {
    gate: SendGate,
}

impl AcceptExternalParameterData {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for AcceptExternalParameterData {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for AcceptExternalParameterData {
    fn command_id(&self) -> u32 {
        ID_ACCEPT_EXTERNAL_DATA
    }

    fn name(&self) -> &'static str {
        "AcceptExternalParameterData(UnknownAccuracy)"
    }

    fn command_bytes(&self) -> Vec<u8> {
        encode_request(CMD_ACCEPT_EXTERNAL_DATA, &[0xDF, 0x0A, 0x02])
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
        if ack_matches(frame, CMD_ACCEPT_EXTERNAL_DATA, 0) {
            ctx.transition_to(Arc::new(CheckWatertrap::new()));
        } else if nak_matches(frame, CMD_ACCEPT_EXTERNAL_DATA) {
            log_nak(self.name(), frame);
        }
    }
}
