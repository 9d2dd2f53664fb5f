//! 后台读线程
//!
//! 独占串口读半部：带超时地读取、把字节喂给帧重组器、把重组出的帧
//! 交给分发器，并把每次读取结果（含超时的零字节）回报给上下文——
//! 同步发送路径靠这个信号保证等待不超过一个读取周期。
//!
//! 线程随 `Driver` 存活：驱动被丢弃时关断通道断开，循环退出。

use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, error, trace};

use crate::driver::context::DriverContext;
use crate::protocol::FrameAssembler;
use crate::serial::SerialRx;

const READ_BUF_LEN: usize = 256;

/// 读线程主循环
pub(crate) fn reader_loop(
    mut rx: impl SerialRx,
    shutdown: Receiver<()>,
    ctx: Arc<DriverContext>,
) {
    let mut assembler = FrameAssembler::new();
    let mut buf = [0u8; READ_BUF_LEN];
    let idle = ctx.config().reader_idle_sleep();

    loop {
        if matches!(shutdown.try_recv(), Err(TryRecvError::Disconnected)) {
            break;
        }

        // 线路空闲时约束 CPU；读超时本身由传输层负责
        std::thread::sleep(idle);

        let n = match rx.read(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                error!("serial read failed, terminating session: {}", e);
                break;
            }
        };

        // 零字节是读超时的正常结果，同样要回报（活性 + 同步发送唤醒）
        ctx.note_read_outcome(n > 0);
        if n == 0 {
            continue;
        }

        assembler.push(&buf[..n]);
        while let Some(frame) = assembler.next_frame() {
            debug!("rx frame: {:02X?}", frame.raw());
            ctx.dispatcher().deliver(&ctx, &frame);
        }
    }

    trace!("reader loop exited");
}
