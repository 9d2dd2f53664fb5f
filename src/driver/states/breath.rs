//! 呼吸检测模式配置
//!
//! 依次下发七种呼吸检测模式（命令 0x1E），全部确认后订阅连续的
//! 参数详细状态流。

use std::sync::Arc;

use crate::driver::context::DriverContext;
use crate::driver::state::{
    ack_matches, log_nak, nak_matches, send_once, CommandState, SendGate,
};
use crate::driver::states::patient::TransmitPatientData;
use crate::driver::states::setup::StopContinuousData;
use crate::protocol::ids::{CMD_SWITCH_BREATH_DETECTION, ID_BREATH_DETECTION_BASE};
use crate::protocol::{encode_request, Frame};

/// 呼吸检测模式（命令 0x1E 的模式参数字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreathDetectionMode {
    ProgramBreath,
    ProgramBreathAutoWakeup,
    AutoWakeupAfterBreathphase1,
    AutoWakeupAfterBreathphase2,
    AutoWakeupAfterBreathphase3,
    AutoWakeupAfterBreathphase4,
    AutoWakeupAfterBreathphase5,
}

impl BreathDetectionMode {
    pub fn code(self) -> u8 {
        match self {
            BreathDetectionMode::ProgramBreath => 0x01,
            BreathDetectionMode::ProgramBreathAutoWakeup => 0x02,
            BreathDetectionMode::AutoWakeupAfterBreathphase1 => 0x05,
            BreathDetectionMode::AutoWakeupAfterBreathphase2 => 0x06,
            BreathDetectionMode::AutoWakeupAfterBreathphase3 => 0x07,
            BreathDetectionMode::AutoWakeupAfterBreathphase4 => 0x08,
            BreathDetectionMode::AutoWakeupAfterBreathphase5 => 0x09,
        }
    }

    pub fn next(self) -> Option<BreathDetectionMode> {
        match self {
            BreathDetectionMode::ProgramBreath => {
                Some(BreathDetectionMode::ProgramBreathAutoWakeup)
            }
            BreathDetectionMode::ProgramBreathAutoWakeup => {
                Some(BreathDetectionMode::AutoWakeupAfterBreathphase1)
            }
            BreathDetectionMode::AutoWakeupAfterBreathphase1 => {
                Some(BreathDetectionMode::AutoWakeupAfterBreathphase2)
            }
            BreathDetectionMode::AutoWakeupAfterBreathphase2 => {
                Some(BreathDetectionMode::AutoWakeupAfterBreathphase3)
            }
            BreathDetectionMode::AutoWakeupAfterBreathphase3 => {
                Some(BreathDetectionMode::AutoWakeupAfterBreathphase4)
            }
            BreathDetectionMode::AutoWakeupAfterBreathphase4 => {
                Some(BreathDetectionMode::AutoWakeupAfterBreathphase5)
            }
            BreathDetectionMode::AutoWakeupAfterBreathphase5 => None,
        }
    }
}

/// 切换呼吸检测模式
pub struct SwitchBreathDetectionMode {
    mode: BreathDetectionMode,
    gate: SendGate,
}

impl SwitchBreathDetectionMode {
    pub fn new(mode: BreathDetectionMode) -> Self {
        Self {
            mode,
            gate: SendGate::new(),
        }
    }
}

impl CommandState for SwitchBreathDetectionMode {
    fn command_id(&self) -> u32 {
        ID_BREATH_DETECTION_BASE | self.mode.code() as u32
    }

    fn name(&self) -> &'static str {
        match self.mode {
            BreathDetectionMode::ProgramBreath => "SwitchBreathDetectionMode(ProgramBreath)",
            BreathDetectionMode::ProgramBreathAutoWakeup => {
                "SwitchBreathDetectionMode(ProgramBreathAutoWakeup)"
            }
            BreathDetectionMode::AutoWakeupAfterBreathphase1 => {
                "SwitchBreathDetectionMode(AutoWakeupAfterBreathphase1)"
            }
            BreathDetectionMode::AutoWakeupAfterBreathphase2 => {
                "SwitchBreathDetectionMode(AutoWakeupAfterBreathphase2)"
            }
            BreathDetectionMode::AutoWakeupAfterBreathphase3 => {
                "SwitchBreathDetectionMode(AutoWakeupAfterBreathphase3)"
            }
            BreathDetectionMode::AutoWakeupAfterBreathphase4 => {
                "SwitchBreathDetectionMode(AutoWakeupAfterBreathphase4)"
            }
            BreathDetectionMode::AutoWakeupAfterBreathphase5 => {
                "SwitchBreathDetectionMode(AutoWakeupAfterBreathphase5)"
            }
        }
    }

    fn command_bytes(&self) -> Vec<u8> {
        encode_request(CMD_SWITCH_BREATH_DETECTION, &[self.mode.code()])
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
        if ack_matches(frame, CMD_SWITCH_BREATH_DETECTION, 0) {
            match self.mode.next() {
                Some(next) => {
                    ctx.transition_to(Arc::new(SwitchBreathDetectionMode::new(next)));
                }
                None => ctx.transition_to(Arc::new(TransmitPatientData::new())),
            }
        } else if nak_matches(frame, CMD_SWITCH_BREATH_DETECTION) {
            log_nak(self.name(), frame);
            ctx.transition_to(Arc::new(StopContinuousData::new()));
        }
    }
}
