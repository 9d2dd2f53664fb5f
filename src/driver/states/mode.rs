//! 测量/运行模式检查与气路执行机构
//!
//! 测量模式查询（命令 0x03）按 1000 ms 间隔轮询直到模块确认进入
//! 测量模式；随后运行模式检查必须一次成功，再切阀位（样气 1）与
//! 采样泵（高流量）。

use std::sync::Arc;

use tracing::info;

use crate::driver::context::DriverContext;
use crate::driver::state::{
    ack_matches, log_nak, nak_matches, send_once, CommandState, SendGate,
};
use crate::driver::states::agent::SelectAnestheticAgent;
use crate::driver::states::setup::StopContinuousData;
use crate::driver::states::MEASUREMENT_MODE_INTERVAL;
use crate::protocol::ids::{
    CMD_OPERATING_MODE, CMD_SWITCH_PUMP, CMD_SWITCH_VALVES, ID_MEASUREMENT_MODE,
    ID_OPERATING_MODE, ID_SWITCH_PUMP, ID_SWITCH_VALVES,
};
use crate::protocol::{encode_request, error_text, Frame};

/// 测量模式轮询
pub struct MeasurementMode {
    gate: SendGate,
}

impl MeasurementMode {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for MeasurementMode {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for MeasurementMode {
    fn command_id(&self) -> u32 {
        ID_MEASUREMENT_MODE
    }

    fn name(&self) -> &'static str {
        "MeasurementMode"
    }

    fn command_bytes(&self) -> Vec<u8> {
        encode_request(CMD_OPERATING_MODE, &[0x00])
    }

    fn expected_reply_len(&self) -> usize {
        5
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, ctx: &DriverContext) {
        if self.gate.already_sent() {
            return;
        }
        // 模块切换模式需要时间，轮询间隔压到 1 s 以上
        if !self.gate.interval_elapsed(MEASUREMENT_MODE_INTERVAL) {
            return;
        }
        self.gate.mark_sent(true);
        ctx.send_command(self);
    }

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if ack_matches(frame, CMD_OPERATING_MODE, 1) {
            if frame.at(3) == 0x00 {
                info!("MeasurementMode: module in measurement mode");
                ctx.transition_to(Arc::new(OperatingMode::new()));
            } else {
                info!(
                    "MeasurementMode: still not measurement mode: {}",
                    error_text(frame.at(3))
                );
                // 复位发送闸门后转回自身，下个轮询周期重发
                self.gate.mark_sent(false);
                ctx.transition_to(Arc::new(MeasurementMode::new()));
            }
        } else if nak_matches(frame, CMD_OPERATING_MODE) {
            log_nak(self.name(), frame);
            ctx.transition_to(Arc::new(StopContinuousData::new()));
        }
    }
}

/// 运行模式确认
pub struct OperatingMode {
    gate: SendGate,
}

impl OperatingMode {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for OperatingMode {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for OperatingMode {
    fn command_id(&self) -> u32 {
        ID_OPERATING_MODE
    }

    fn name(&self) -> &'static str {
        "OperatingMode"
    }

    fn command_bytes(&self) -> Vec<u8> {
        encode_request(CMD_OPERATING_MODE, &[0x00])
    }

    fn expected_reply_len(&self) -> usize {
        5
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, ctx: &DriverContext) {
        send_once(ctx, self);
    }

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if ack_matches(frame, CMD_OPERATING_MODE, 1) {
            if frame.at(3) == 0x00 {
                ctx.transition_to(Arc::new(SwitchValves::new()));
            }
        } else if nak_matches(frame, CMD_OPERATING_MODE) {
            log_nak(self.name(), frame);
            ctx.transition_to(Arc::new(StopContinuousData::new()));
        }
    }
}

/// 切换阀位到样气 1
pub struct SwitchValves {
    gate: SendGate,
}

impl SwitchValves {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for SwitchValves {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for SwitchValves {
    fn command_id(&self) -> u32 {
        ID_SWITCH_VALVES
    }

    fn name(&self) -> &'static str {
        "SwitchValves"
    }

    fn command_bytes(&self) -> Vec<u8> {
        // VP = 0x00：样气 1
        encode_request(CMD_SWITCH_VALVES, &[0x00])
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
        if ack_matches(frame, CMD_SWITCH_VALVES, 0) {
            ctx.transition_to(Arc::new(SwitchPump::new()));
        } else if nak_matches(frame, CMD_SWITCH_VALVES) {
            log_nak(self.name(), frame);
            ctx.transition_to(Arc::new(StopContinuousData::new()));
        }
    }
}

/// 切换采样泵到高流量
pub struct SwitchPump {
    gate: SendGate,
}

impl SwitchPump {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for SwitchPump {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for SwitchPump {
    fn command_id(&self) -> u32 {
        ID_SWITCH_PUMP
    }

    fn name(&self) -> &'static str {
        "SwitchPump"
    }

    fn command_bytes(&self) -> Vec<u8> {
        // PF = 0x02：高流量
        encode_request(CMD_SWITCH_PUMP, &[0x02])
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
        if ack_matches(frame, CMD_SWITCH_PUMP, 0) {
            ctx.transition_to(Arc::new(SelectAnestheticAgent::new()));
        } else if nak_matches(frame, CMD_SWITCH_PUMP) {
            log_nak(self.name(), frame);
            ctx.transition_to(Arc::new(StopContinuousData::new()));
        }
    }
}
