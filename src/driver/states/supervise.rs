//! 模块状态监督链
//!
//! 全部为连续订阅状态，沿文档规定的次序巡检 0x0E 帧的 MS 位与
//! 0x0B 帧的 MSW 位：积水杯（脱开 / 已满 / 将满）、任一部件失效、
//! 呼吸相位数据、窒息，以及气路闭塞。每个分支只记录一条可读的
//! 状况日志并继续，既不中止会话也不改动显示值或会话标志。

use std::sync::Arc;

use tracing::{info, warn};

use crate::driver::context::DriverContext;
use crate::driver::state::{log_nak, nak_matches, CommandState, SendGate, StateKind};
use crate::driver::states::zero::SuperviseZeroRequest;
use crate::protocol::ids::{
    CMD_CONTINUOUS, ID_ANY_COMPONENT_FAIL, ID_APNEA_MONITOR, ID_BREATH_PHASE_DATA,
    ID_CHECK_WATERTRAP, ID_OCCLUSION_MONITOR, ID_WATERTRAP_DISCONNECTED, ID_WATERTRAP_FULL,
    ID_WATERTRAP_WARNING, SEL_MODULE_STATUS_WARNING, SEL_PARAM_DETAILED_STATUS,
};
use crate::protocol::Frame;

fn is_detailed_status(frame: &Frame) -> bool {
    frame.is_ack()
        && frame.command() == CMD_CONTINUOUS
        && frame.selector() == Some(SEL_PARAM_DETAILED_STATUS)
}

fn is_status_warning(frame: &Frame) -> bool {
    frame.is_ack()
        && frame.command() == CMD_CONTINUOUS
        && frame.selector() == Some(SEL_MODULE_STATUS_WARNING)
}

/// 积水杯巡检入口（0x0E 帧 MS bit2）
pub struct CheckWatertrap {
    gate: SendGate,
}

impl CheckWatertrap {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for CheckWatertrap {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for CheckWatertrap {
    fn command_id(&self) -> u32 {
        ID_CHECK_WATERTRAP
    }

    fn name(&self) -> &'static str {
        "CheckWatertrap"
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
            if frame.at(14) & 0x04 != 0 {
                // 积水杯状况需在 0x0B 告警帧里细查
                ctx.transition_to(Arc::new(WatertrapStatus::new(WatertrapCheck::Disconnected)));
            } else {
                ctx.transition_to(Arc::new(AnyComponentFail::new()));
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 积水杯细查项（0x0B 帧 MSW 位）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatertrapCheck {
    /// MSW bit5：积水杯脱开
    Disconnected,
    /// MSW bit6：积水杯已满
    Full,
    /// MSW bit7：积水杯将满
    Warning,
}

impl WatertrapCheck {
    fn mask(self) -> u8 {
        match self {
            WatertrapCheck::Disconnected => 0x20,
            WatertrapCheck::Full => 0x40,
            WatertrapCheck::Warning => 0x80,
        }
    }

    fn id(self) -> u32 {
        match self {
            WatertrapCheck::Disconnected => ID_WATERTRAP_DISCONNECTED,
            WatertrapCheck::Full => ID_WATERTRAP_FULL,
            WatertrapCheck::Warning => ID_WATERTRAP_WARNING,
        }
    }
}

/// 积水杯状态细查（0x0B 告警帧，MSW 在线上第 3 字节）
pub struct WatertrapStatus {
    check: WatertrapCheck,
    gate: SendGate,
}

impl WatertrapStatus {
    pub fn new(check: WatertrapCheck) -> Self {
        Self {
            check,
            gate: SendGate::new(),
        }
    }
}

impl CommandState for WatertrapStatus {
    fn command_id(&self) -> u32 {
        self.check.id()
    }

    fn name(&self) -> &'static str {
        match self.check {
            WatertrapCheck::Disconnected => "WatertrapStatus(Disconnected)",
            WatertrapCheck::Full => "WatertrapStatus(Full)",
            WatertrapCheck::Warning => "WatertrapStatus(Warning)",
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
        if is_status_warning(frame) {
            if frame.at(3) & self.check.mask() != 0 {
                match self.check {
                    WatertrapCheck::Disconnected => {
                        warn!("watertrap is disconnected, check watertrap");
                    }
                    WatertrapCheck::Full => {
                        warn!("watertrap is full, replace watertrap");
                    }
                    WatertrapCheck::Warning => {
                        warn!("watertrap will be full soon, check watertrap level");
                    }
                }
                info!("gas labels and values left unchanged");
                ctx.transition_to(Arc::new(AnyComponentFail::new()));
            } else {
                match self.check {
                    WatertrapCheck::Disconnected => {
                        ctx.transition_to(Arc::new(WatertrapStatus::new(WatertrapCheck::Full)));
                    }
                    WatertrapCheck::Full => {
                        ctx.transition_to(Arc::new(WatertrapStatus::new(WatertrapCheck::Warning)));
                    }
                    WatertrapCheck::Warning => {
                        // 三个告警位都没置：按未指明的气路异常处理
                        warn!("unspecific pneumatics condition, check pneumatics");
                        info!("gas labels and values left unchanged");
                        ctx.transition_to(Arc::new(AnyComponentFail::new()));
                    }
                }
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 任一部件失效检查（0x0E 帧 MS bit6）
pub struct AnyComponentFail {
    gate: SendGate,
}

impl AnyComponentFail {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for AnyComponentFail {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for AnyComponentFail {
    fn command_id(&self) -> u32 {
        ID_ANY_COMPONENT_FAIL
    }

    fn name(&self) -> &'static str {
        "AnyComponentFail"
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
            if frame.at(14) & 0x40 != 0 {
                warn!("a hardware failure is present on the sensor module");
                info!("gas labels and values left unchanged");
            }
            ctx.transition_to(Arc::new(BreathPhaseData::new()));
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 呼吸相位数据检查（0x0E 帧 MS bit5）
pub struct BreathPhaseData {
    gate: SendGate,
}

impl BreathPhaseData {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for BreathPhaseData {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for BreathPhaseData {
    fn command_id(&self) -> u32 {
        ID_BREATH_PHASE_DATA
    }

    fn name(&self) -> &'static str {
        "BreathPhaseData"
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
            if frame.at(14) & 0x20 != 0 {
                info!("frame data contain breath phase related data");
            } else {
                info!("frame data contain realtime values");
            }
            ctx.transition_to(Arc::new(ApneaMonitor::new()));
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 窒息检查（0x0E 帧 MS bit4）
pub struct ApneaMonitor {
    gate: SendGate,
}

impl ApneaMonitor {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for ApneaMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for ApneaMonitor {
    fn command_id(&self) -> u32 {
        ID_APNEA_MONITOR
    }

    fn name(&self) -> &'static str {
        "ApneaMonitor"
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
            if frame.at(14) & 0x10 != 0 {
                warn!("no respiration / apnea: previously detected breathing activity has timed out");
            } else {
                info!("breathing activity on the sample line");
            }
            ctx.transition_to(Arc::new(SuperviseZeroRequest::new()));
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}

/// 气路闭塞监测（0x0E 帧 MS bit1）
pub struct OcclusionMonitor {
    gate: SendGate,
}

impl OcclusionMonitor {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for OcclusionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for OcclusionMonitor {
    fn command_id(&self) -> u32 {
        ID_OCCLUSION_MONITOR
    }

    fn name(&self) -> &'static str {
        "OcclusionMonitor"
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
            if frame.at(14) & 0x02 != 0 {
                warn!("sample line occluded");
                ctx.transition_to(Arc::new(WatertrapStatus::new(WatertrapCheck::Disconnected)));
            } else {
                ctx.transition_to(Arc::new(AnyComponentFail::new()));
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
        }
    }
}
