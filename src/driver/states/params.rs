//! 参数单位与可用性持续评估
//!
//! 读出五个参数的单位后进入持续评估回路：HSP（主机须提供的参数）、
//! PAI（参数是否安装）、逐参数模式位、PII（参数失效），最后经
//! 运行模式状态检查接入闭塞监测。位指示不可用 / 不可运行 / 硬件
//! 失效时记一条告警，不改动显示值。

use std::sync::Arc;

use tracing::{info, warn};

use crate::driver::context::DriverContext;
use crate::driver::state::{log_nak, nak_matches, CommandState, SendGate, StateKind};
use crate::driver::states::agent::EvaluateAgentIdent;
use crate::driver::states::supervise::OcclusionMonitor;
use crate::protocol::ids::{
    CMD_CONTINUOUS, HSP_EXTERNAL_DATA_MASK, ID_EVALUATE_CONNECTION, ID_HOST_SELECTABLE_PARAMS,
    ID_OPERATING_MODE_STATUS, ID_PARAMETER_AVAILABILITY, ID_PARAMETER_INOP_INFO,
    ID_PARAM_MODE_A1, ID_PARAM_MODE_A2, ID_PARAM_MODE_CO2, ID_PARAM_MODE_N2O, ID_PARAM_MODE_O2,
    ID_READ_PARAMETER_UNITS, PAI_AVAILABLE_MASK, PII_INOP_MASK, PS_MODE_MASK, SEL_AGENT1_STATUS,
    SEL_AGENT2_STATUS, SEL_CO2_N2O_STATUS, SEL_O2_STATUS, SEL_PARAM_DETAILED_STATUS,
    SEL_PARAM_UNITS,
};
use crate::protocol::Frame;

fn is_detailed_status(frame: &Frame) -> bool {
    frame.is_ack()
        && frame.command() == CMD_CONTINUOUS
        && frame.selector() == Some(SEL_PARAM_DETAILED_STATUS)
}

/// 读参数单位（0x12/0x12 帧）
///
/// 单位字节低位 0x05 置位记作 "ATPS mmHg"，否则 "ATS Vol"。
pub struct ReadParameterUnits {
    gate: SendGate,
}

impl ReadParameterUnits {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for ReadParameterUnits {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for ReadParameterUnits {
    fn command_id(&self) -> u32 {
        ID_READ_PARAMETER_UNITS
    }

    fn name(&self) -> &'static str {
        "ReadParameterUnits"
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
            && frame.selector() == Some(SEL_PARAM_UNITS)
        {
            for (index, label) in [
                (3, "CO2_U"),
                (4, "N2O_U"),
                (5, "A1_U"),
                (6, "A2_U"),
                (7, "O2_U"),
            ] {
                let unit = if frame.at(index) & 0x05 != 0 {
                    "ATPS mmHg"
                } else {
                    "ATS Vol"
                };
                info!("ReadParameterUnits: {} is {}", label, unit);
            }
            ctx.transition_to(Arc::new(EvaluateConnectionEstablished::new()));
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 连接建立评估（序列至此模块已全部配置完成）
pub struct EvaluateConnectionEstablished {
    gate: SendGate,
}

impl EvaluateConnectionEstablished {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for EvaluateConnectionEstablished {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for EvaluateConnectionEstablished {
    fn command_id(&self) -> u32 {
        ID_EVALUATE_CONNECTION
    }

    fn name(&self) -> &'static str {
        "EvaluateConnectionEstablished"
    }

    fn kind(&self) -> StateKind {
        StateKind::Continuous
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, _ctx: &DriverContext) {}

    fn on_frame(&self, ctx: &DriverContext, _frame: &Frame) {
        info!("EvaluateConnectionEstablished: connection established");
        ctx.transition_to(Arc::new(HostSelectableParameters::new()));
    }
}

/// HSP 持续评估（0x0E 帧第 7 字节）
pub struct HostSelectableParameters {
    gate: SendGate,
}

impl HostSelectableParameters {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for HostSelectableParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for HostSelectableParameters {
    fn command_id(&self) -> u32 {
        ID_HOST_SELECTABLE_PARAMS
    }

    fn name(&self) -> &'static str {
        "HostSelectableParameters"
    }

    fn kind(&self) -> StateKind {
        StateKind::Continuous
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, _ctx: &DriverContext) {}

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if is_detailed_status(frame) {
            if frame.at(7) & HSP_EXTERNAL_DATA_MASK != 0 {
                warn!("parameter is not measured by the sensor module, it must be provided by the host");
            } else {
                ctx.transition_to(Arc::new(ParameterAvailability::new()));
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// PAI 持续评估（0x0E 帧第 4 字节）
pub struct ParameterAvailability {
    gate: SendGate,
}

impl ParameterAvailability {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for ParameterAvailability {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for ParameterAvailability {
    fn command_id(&self) -> u32 {
        ID_PARAMETER_AVAILABILITY
    }

    fn name(&self) -> &'static str {
        "ParameterAvailability"
    }

    fn kind(&self) -> StateKind {
        StateKind::Continuous
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, _ctx: &DriverContext) {}

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if is_detailed_status(frame) {
            if frame.at(4) & PAI_AVAILABLE_MASK != 0 {
                info!("ParameterAvailability: PAI is available");
                ctx.flags().set_pai_available(true);
                ctx.transition_to(Arc::new(EvaluateAgentIdent::new()));
            } else {
                warn!("parameter is not installed on the sensor module");
                ctx.transition_to(Arc::new(ParameterMode::new(GasParameter::Co2)));
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 逐参数模式位检查的参数项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasParameter {
    Co2,
    N2o,
    O2,
    Agent1,
    Agent2,
}

impl GasParameter {
    fn selector(self) -> u8 {
        match self {
            GasParameter::Co2 | GasParameter::N2o => SEL_CO2_N2O_STATUS,
            GasParameter::O2 => SEL_O2_STATUS,
            GasParameter::Agent1 => SEL_AGENT1_STATUS,
            GasParameter::Agent2 => SEL_AGENT2_STATUS,
        }
    }

    /// 参数状态字节的线上下标
    fn status_index(self) -> usize {
        match self {
            GasParameter::Co2 => 11,
            GasParameter::N2o => 12,
            GasParameter::O2 => 11,
            GasParameter::Agent1 => 12,
            GasParameter::Agent2 => 12,
        }
    }

    fn id(self) -> u32 {
        match self {
            GasParameter::Co2 => ID_PARAM_MODE_CO2,
            GasParameter::N2o => ID_PARAM_MODE_N2O,
            GasParameter::O2 => ID_PARAM_MODE_O2,
            GasParameter::Agent1 => ID_PARAM_MODE_A1,
            GasParameter::Agent2 => ID_PARAM_MODE_A2,
        }
    }

    fn label(self) -> &'static str {
        match self {
            GasParameter::Co2 => "CO2_PS",
            GasParameter::N2o => "N2O_PS",
            GasParameter::O2 => "O2_PS",
            GasParameter::Agent1 => "A1_PS",
            GasParameter::Agent2 => "A2_PS",
        }
    }

    fn next(self) -> Option<GasParameter> {
        match self {
            GasParameter::Co2 => Some(GasParameter::N2o),
            GasParameter::N2o => Some(GasParameter::O2),
            GasParameter::O2 => Some(GasParameter::Agent1),
            GasParameter::Agent1 => Some(GasParameter::Agent2),
            GasParameter::Agent2 => None,
        }
    }
}

/// 逐参数模式位检查（低 2 位全置位 = 参数不可用）
pub struct ParameterMode {
    param: GasParameter,
    gate: SendGate,
}

impl ParameterMode {
    pub fn new(param: GasParameter) -> Self {
        Self {
            param,
            gate: SendGate::new(),
        }
    }
}

impl CommandState for ParameterMode {
    fn command_id(&self) -> u32 {
        self.param.id()
    }

    fn name(&self) -> &'static str {
        match self.param {
            GasParameter::Co2 => "ParameterMode(CO2)",
            GasParameter::N2o => "ParameterMode(N2O)",
            GasParameter::O2 => "ParameterMode(O2)",
            GasParameter::Agent1 => "ParameterMode(A1)",
            GasParameter::Agent2 => "ParameterMode(A2)",
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
            if frame.at(self.param.status_index()) & PS_MODE_MASK == PS_MODE_MASK {
                warn!(
                    "{} parameter is not available, not installed on the sensor module",
                    self.param.label()
                );
            } else {
                match self.param.next() {
                    Some(next) => ctx.transition_to(Arc::new(ParameterMode::new(next))),
                    None => ctx.transition_to(Arc::new(ParameterInopInformation::new())),
                }
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// PII 持续评估（0x0E 帧第 6 字节）
pub struct ParameterInopInformation {
    gate: SendGate,
}

impl ParameterInopInformation {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for ParameterInopInformation {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for ParameterInopInformation {
    fn command_id(&self) -> u32 {
        ID_PARAMETER_INOP_INFO
    }

    fn name(&self) -> &'static str {
        "ParameterInopInformation"
    }

    fn kind(&self) -> StateKind {
        StateKind::Continuous
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, _ctx: &DriverContext) {}

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if is_detailed_status(frame) {
            if frame.at(6) & PII_INOP_MASK != 0 {
                warn!("parameter is installed but has a technical failure, needs maintenance");
            } else {
                ctx.transition_to(Arc::new(OperatingModeStatus::new()));
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 运行模式状态检查（0x0E 帧 OMS 字节）
pub struct OperatingModeStatus {
    gate: SendGate,
}

impl OperatingModeStatus {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for OperatingModeStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for OperatingModeStatus {
    fn command_id(&self) -> u32 {
        ID_OPERATING_MODE_STATUS
    }

    fn name(&self) -> &'static str {
        "OperatingModeStatus"
    }

    fn kind(&self) -> StateKind {
        StateKind::Continuous
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, _ctx: &DriverContext) {}

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if is_detailed_status(frame) {
            if frame.at(12) == 0x00 {
                ctx.transition_to(Arc::new(OcclusionMonitor::new()));
            } else {
                info!("OperatingModeStatus: module is in standby mode");
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}
