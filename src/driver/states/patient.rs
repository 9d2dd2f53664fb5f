//! 连续参数状态订阅
//!
//! 命令 0x12 让模块开始推送连续状态帧；之后所有连续订阅状态都
//! 搭载在这条流上。首个 0x12/0x0E 应答同时用来初始化 HSP 会话
//! 标志并判断模块当前是否处于测量模式。

use std::sync::Arc;

use tracing::info;

use crate::driver::context::DriverContext;
use crate::driver::state::{log_nak, nak_matches, send_once, CommandState, SendGate};
use crate::driver::states::mode::{MeasurementMode, OperatingMode};
use crate::protocol::ids::{
    CMD_CONTINUOUS, HSP_EXTERNAL_DATA_MASK, ID_TRANSMIT_PATIENT_DATA, SEL_PARAM_DETAILED_STATUS,
};
use crate::protocol::{encode_request, Frame};

/// 订阅连续参数详细状态（0x12/0x0E）
pub struct TransmitPatientData {
    gate: SendGate,
}

impl TransmitPatientData {
    pub fn new() -> Self {
        Self {
            gate: SendGate::new(),
        }
    }
}

impl Default for TransmitPatientData {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandState for TransmitPatientData {
    fn command_id(&self) -> u32 {
        ID_TRANSMIT_PATIENT_DATA
    }

    fn name(&self) -> &'static str {
        "TransmitPatientData"
    }

    fn command_bytes(&self) -> Vec<u8> {
        // 订阅全部参数，周期 0x3C
        encode_request(
            CMD_CONTINUOUS,
            &[
                0x00, 0x00, 0x00, 0x00, 0x00, 0x0F, 0x68, 0x18, 0x40, 0x1F, 0x00, 0x3C,
            ],
        )
    }

    fn expected_reply_len(&self) -> usize {
        28
    }

    fn gate(&self) -> &SendGate {
        &self.gate
    }

    fn handle(&self, ctx: &DriverContext) {
        send_once(ctx, self);
    }

    fn on_frame(&self, ctx: &DriverContext, frame: &Frame) {
        if frame.is_ack()
            && frame.command() == CMD_CONTINUOUS
            && frame.selector() == Some(SEL_PARAM_DETAILED_STATUS)
        {
            // HSP：需要主机外部提供的参数集合
            let hsp = frame.at(7);
            ctx.flags().set_hsp_byte(hsp);
            ctx.flags()
                .set_needs_external_data(hsp & HSP_EXTERNAL_DATA_MASK != 0);
            info!(
                "TransmitPatientData: hsp=0x{:02X} needs_external_data={}",
                hsp,
                ctx.flags().needs_external_data()
            );

            // OMS 非零：模块尚未进入测量模式
            if frame.at(12) != 0x00 {
                info!("TransmitPatientData: module not in measurement mode yet");
                ctx.transition_to(Arc::new(MeasurementMode::new()));
            } else {
                ctx.transition_to(Arc::new(OperatingMode::new()));
            }
        } else if nak_matches(frame, CMD_CONTINUOUS) {
            log_nak(self.name(), frame);
            info!("TransmitPatientData: skip to OperatingMode");
            ctx.transition_to(Arc::new(OperatingMode::new()));
        }
    }
}
