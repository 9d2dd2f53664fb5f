//! 驱动端到端序列测试
//!
//! 用脚本化的串口两半部驱动完整的 `Driver`：接收侧按注入顺序吐出
//! 字节块，发送侧记录每条写出的请求，可选地按应答表扮演模块。
//! 场景覆盖冷启动重发、NAK 跳过、失步恢复与初始化序列主线。

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use gasmod_sdk::driver::states::agent::SelectAnestheticAgent;
use gasmod_sdk::driver::states::params::ReadParameterUnits;
use gasmod_sdk::driver::states::patient::TransmitPatientData;
use gasmod_sdk::driver::states::supervise::{WatertrapCheck, WatertrapStatus};
use gasmod_sdk::driver::states::zero::SuperviseZeroRequest;
use gasmod_sdk::protocol::checksum;
use gasmod_sdk::protocol::ids::{
    ID_ANY_COMPONENT_FAIL, ID_EVALUATE_CONNECTION, ID_GET_INTERVAL_BASE_TIME,
    ID_HANDLE_ZERO_REQUEST, ID_INITIATE_ZERO, ID_OPERATING_MODE, ID_READ_PARAMETER_UNITS,
    ID_SELECT_ANESTHETIC_AGENT, ID_STOP_CONTINUOUS_DATA, ID_ZERO_IN_PROGRESS_CO2_N2O,
};
use gasmod_sdk::{Driver, DriverConfig, SerialError, SerialRx, SerialTx};

/// 脚本化串口：注入的接收块队列 + 已发送请求记录 + 可选应答表
#[derive(Default)]
struct ScriptedLine {
    rx_chunks: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    /// (请求字节, 应答字节)；命中即把应答排进接收队列
    responses: Mutex<Vec<(Vec<u8>, Vec<u8>)>>,
}

impl ScriptedLine {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn inject(&self, bytes: &[u8]) {
        self.rx_chunks.lock().push_back(bytes.to_vec());
    }

    fn respond_with(&self, request: Vec<u8>, reply: Vec<u8>) {
        self.responses.lock().push((request, reply));
    }

    fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    fn sent_count_of(&self, bytes: &[u8]) -> usize {
        self.sent.lock().iter().filter(|b| b.as_slice() == bytes).count()
    }
}

struct ScriptedRx {
    line: Arc<ScriptedLine>,
}

impl SerialRx for ScriptedRx {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        match self.line.rx_chunks.lock().pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }
}

struct ScriptedTx {
    line: Arc<ScriptedLine>,
}

impl SerialTx for ScriptedTx {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        self.line.sent.lock().push(bytes.to_vec());
        for (request, reply) in self.line.responses.lock().iter() {
            if request.as_slice() == bytes {
                self.line.rx_chunks.lock().push_back(reply.clone());
            }
        }
        Ok(())
    }
}

fn test_config() -> DriverConfig {
    DriverConfig {
        reader_idle_sleep_ms: 2,
        sync_send_timeout_ms: 40,
        ..DriverConfig::default()
    }
}

fn start_driver(line: &Arc<ScriptedLine>) -> Driver {
    Driver::new(
        ScriptedRx { line: line.clone() },
        ScriptedTx { line: line.clone() },
        test_config(),
    )
}

/// 轮询推进状态机直到谓词满足或超时
fn tick_until(driver: &Driver, timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        driver.tick();
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

/// 构造一条 0x12 连续帧（24 字节载荷），按 (线上下标, 值) 覆写
fn continuous_frame(selector: u8, overrides: &[(usize, u8)]) -> Vec<u8> {
    let mut bytes = vec![0x06, 0x12, 0x18];
    bytes.extend_from_slice(&[0u8; 24]);
    bytes[13] = selector;
    for &(index, value) in overrides {
        bytes[index] = value;
    }
    let cs = checksum(&bytes);
    bytes.push(cs);
    bytes
}

/// 构造一条简单 ACK 应答
fn ack(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x06, opcode, payload.len() as u8];
    bytes.extend_from_slice(payload);
    let cs = checksum(&bytes);
    bytes.push(cs);
    bytes
}

const STOP_CMD: [u8; 4] = [0x10, 0x01, 0x19, 0xD6];
const INTERVAL_CMD: [u8; 5] = [0x10, 0x02, 0x02, 0xFF, 0xED];

// 冷启动且模块静默：每 150 ms 重发一次停止命令，不推进
#[test]
fn cold_start_retries_stop_every_150ms() {
    let line = ScriptedLine::new();
    let driver = start_driver(&line);

    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(620) {
        driver.tick();
        std::thread::sleep(Duration::from_millis(5));
    }

    let sent = line.sent();
    assert!(!sent.is_empty(), "stop command must be transmitted");
    assert!(
        sent.iter().all(|b| b.as_slice() == STOP_CMD),
        "only the stop command may be transmitted"
    );
    // 620 ms 内最多 5 次（0/150/300/450/600 ms），至少 2 次
    let count = sent.len();
    assert!((2..=5).contains(&count), "got {} transmissions", count);
    assert_eq!(
        driver.context().current_state_id(),
        Some(ID_STOP_CONTINUOUS_DATA)
    );
}

// 停止命令成功：转移到间隔基准时间查询并发出其命令
#[test]
fn stop_ack_advances_to_interval_base_time() {
    let line = ScriptedLine::new();
    line.respond_with(STOP_CMD.to_vec(), vec![0x06, 0x19, 0x00, 0xE1]);
    let driver = start_driver(&line);

    assert!(tick_until(&driver, Duration::from_secs(2), || {
        line.sent_count_of(&INTERVAL_CMD) > 0
    }));
    assert_eq!(
        driver.context().current_state_id(),
        Some(ID_GET_INTERVAL_BASE_TIME)
    );
}

// 间隔基准时间 NAK 0x12：按跳过策略转移到器件信息（vendor code）
#[test]
fn interval_nak_skips_to_device_info() {
    let line = ScriptedLine::new();
    line.respond_with(STOP_CMD.to_vec(), vec![0x06, 0x19, 0x00, 0xE1]);
    line.respond_with(INTERVAL_CMD.to_vec(), vec![0x15, 0x02, 0x01, 0x12, 0xD8]);
    let driver = start_driver(&line);

    let vendor_cmd = vec![0x10, 0x0A, 0x0A, 0, 0, 0, 0, 0, 0, 0, 0, 0x00, 0xDC];
    assert!(tick_until(&driver, Duration::from_secs(2), || {
        line.sent_count_of(&vendor_cmd) > 0
    }));
}

// 失步恢复：前导噪声字节被丢弃，帧照常解出
#[test]
fn desync_recovery_still_parses_stop_ack() {
    let line = ScriptedLine::new();
    line.respond_with(STOP_CMD.to_vec(), vec![0xFF, 0xFF, 0x06, 0x19, 0x00, 0xE1]);
    let driver = start_driver(&line);

    assert!(tick_until(&driver, Duration::from_secs(2), || {
        driver.context().current_state_id() == Some(ID_GET_INTERVAL_BASE_TIME)
    }));
}

// 参数详细状态帧刷新会话标志并选择外部数据分支
#[test]
fn detailed_status_frame_updates_session_flags() {
    let line = ScriptedLine::new();
    let driver = start_driver(&line);

    driver
        .context()
        .transition_to(Arc::new(TransmitPatientData::new()));
    // payload[7] = 0xDE：全部外部数据位置位；OMS = 0
    line.inject(&continuous_frame(0x0E, &[(7, 0xDE)]));

    assert!(tick_until(&driver, Duration::from_secs(2), || {
        driver.context().current_state_id() == Some(ID_OPERATING_MODE)
    }));
    assert!(driver.flags().needs_external_data());
    assert_eq!(driver.flags().hsp_byte(), 0xDE);
}

// 积水杯已满：告警并转移到任一部件失效检查，不改会话标志
#[test]
fn watertrap_full_advances_to_component_fail() {
    let line = ScriptedLine::new();
    let driver = start_driver(&line);

    driver
        .context()
        .transition_to(Arc::new(WatertrapStatus::new(WatertrapCheck::Full)));
    line.inject(&continuous_frame(0x0B, &[(3, 0x40)]));

    assert!(tick_until(&driver, Duration::from_secs(2), || {
        driver.context().current_state_id() == Some(ID_ANY_COMPONENT_FAIL)
    }));
    assert!(!driver.flags().needs_external_data());
    assert!(!driver.flags().pai_available());
    assert_eq!(driver.flags().hsp_byte(), 0);
}

// 初始化序列主线：从停止命令一路走到麻醉气体选择
#[test]
fn full_setup_sequence_reaches_agent_selection() {
    let line = ScriptedLine::new();

    line.respond_with(STOP_CMD.to_vec(), ack(0x19, &[]));
    line.respond_with(INTERVAL_CMD.to_vec(), ack(0x02, &[0x00, 0x3C]));

    // 六项器件信息：应答载荷 20 字节，线上第 21 字节回显选择子
    for selector in [0x00u8, 0x01, 0x02, 0x03, 0x05, 0x06] {
        let mut params = [0u8; 9];
        params[8] = selector;
        let mut request = vec![0x10, 0x0A, 0x0A];
        request.extend_from_slice(&params);
        let cs = checksum(&request);
        request.push(cs);

        let mut payload = [0u8; 20];
        payload[8..18].copy_from_slice(b"GASBENCH  ");
        payload[18] = selector; // 线上第 21 字节
        line.respond_with(request, ack(0x0A, &payload));
    }

    let adjust_cmd = vec![
        0x10, 0x09, 0x2B, 0x01, 0x02, 0x03, 0x04, 0x05, 0x18, 0x00, 0x00, 0x95,
    ];
    line.respond_with(adjust_cmd, ack(0x2B, &[]));

    // 模块功能：bit1|bit2 = 气路可用，bit0 清零 = 自动调零
    line.respond_with(vec![0x10, 0x01, 0x2C, 0xC3], ack(0x2C, &[0, 0, 0, 0x06]));

    for mode in [0x01u8, 0x02, 0x05, 0x06, 0x07, 0x08, 0x09] {
        let mut request = vec![0x10, 0x02, 0x1E, mode];
        let cs = checksum(&request);
        request.push(cs);
        line.respond_with(request, ack(0x1E, &[]));
    }

    let patient_cmd = vec![
        0x10, 0x0D, 0x12, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0F, 0x68, 0x18, 0x40, 0x1F, 0x00,
        0x3C, 0xA7,
    ];
    // OMS = 0：已在测量模式，直接走运行模式确认
    line.respond_with(patient_cmd, continuous_frame(0x0E, &[]));

    line.respond_with(vec![0x10, 0x02, 0x03, 0x00, 0xEB], ack(0x03, &[0x00]));
    line.respond_with(vec![0x10, 0x02, 0x61, 0x00, 0x8D], ack(0x61, &[]));
    line.respond_with(vec![0x10, 0x02, 0x62, 0x02, 0x8A], ack(0x62, &[]));

    let driver = start_driver(&line);
    assert!(tick_until(&driver, Duration::from_secs(5), || {
        driver.context().current_state_id() == Some(ID_SELECT_ANESTHETIC_AGENT)
    }));

    // 会话标志来自功能帧：气路可用、自动调零
    assert!(driver.flags().pneumatics_enabled());
    assert!(driver.flags().auto_zero_condition());

    // 主线命令次序与模块文档一致；同步发送态在静默窗口里的合法重发
    // 先按整帧去重（重发必然连续出现）
    let mut sent = line.sent();
    sent.dedup();
    let opcodes: Vec<u8> = sent.iter().map(|b| b[2]).collect();
    let expected: Vec<u8> = [
        0x19, 0x02, 0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x2B, 0x2C, 0x1E, 0x1E, 0x1E, 0x1E,
        0x1E, 0x1E, 0x1E, 0x12, 0x03, 0x61, 0x62,
    ]
    .to_vec();
    assert_eq!(opcodes, expected);
}

// 调零链：OMS 监督 → 调零进行中 → 功能重读 → 发起调零 → 参数单位
#[test]
fn zero_chain_walks_to_parameter_units() {
    let line = ScriptedLine::new();
    line.respond_with(vec![0x10, 0x01, 0x2C, 0xC3], ack(0x2C, &[0, 0, 0, 0x01]));
    line.respond_with(
        vec![
            0x10, 0x0B, 0x20, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0xC3,
        ],
        ack(0x20, &[]),
    );
    let driver = start_driver(&line);

    driver
        .context()
        .transition_to(Arc::new(SuperviseZeroRequest::new()));

    // OMS = 0：测量模式，进入逐参数调零检查
    line.inject(&continuous_frame(0x0E, &[]));
    assert!(tick_until(&driver, Duration::from_secs(2), || {
        driver.context().current_state_id() == Some(ID_ZERO_IN_PROGRESS_CO2_N2O)
    }));

    // CO2_PS bit5 置位：调零进行中，转去处理调零请求
    line.inject(&continuous_frame(0x03, &[(11, 0x20)]));
    assert!(tick_until(&driver, Duration::from_secs(2), || {
        driver.context().current_state_id() == Some(ID_HANDLE_ZERO_REQUEST)
    }));

    // 功能重读（ZERO_CTRL 置位 = 主流探头路径）后发起调零
    assert!(tick_until(&driver, Duration::from_secs(2), || {
        driver.context().current_state_id() == Some(ID_INITIATE_ZERO)
    }));
    assert!(tick_until(&driver, Duration::from_secs(2), || {
        driver.context().current_state_id() == Some(ID_READ_PARAMETER_UNITS)
    }));
}

// 参数单位帧：记录五个单位并进入连接建立评估
#[test]
fn parameter_units_frame_advances_to_connection_established() {
    let line = ScriptedLine::new();
    let driver = start_driver(&line);

    driver
        .context()
        .transition_to(Arc::new(ReadParameterUnits::new()));
    line.inject(&continuous_frame(0x12, &[(3, 0x05), (4, 0x00), (5, 0x05)]));

    assert!(tick_until(&driver, Duration::from_secs(2), || {
        driver.context().current_state_id() == Some(ID_EVALUATE_CONNECTION)
    }));
}

// 帧按重组顺序到达每个订阅者
#[test]
fn frames_are_delivered_in_order_to_subscribers() {
    let line = ScriptedLine::new();
    let driver = start_driver(&line);

    // 麻醉气体选择是连续订阅：先收到 PAI 可用帧则转移评估识别位
    driver
        .context()
        .transition_to(Arc::new(SelectAnestheticAgent::new()));

    // 一个块里两帧：先 PAI 可用（bit2），后无关帧；期望按序处理
    let mut chunk = continuous_frame(0x0E, &[(4, 0x04)]);
    chunk.extend_from_slice(&continuous_frame(0x0B, &[]));
    line.inject(&chunk);

    assert!(tick_until(&driver, Duration::from_secs(2), || {
        driver.flags().pai_available()
    }));
}
