//! 命令操作码、帧选择子与注册表键常量
//!
//! 注册表键（command id）不是线上值：它把操作码与子命令/帧选择子
//! 字节组合成 32 位内部标识，用于在状态注册表里去重共享状态实例。
//! 键在全表内唯一（逻辑上不同的状态不得碰撞）。

// ============================================================================
// 命令操作码
// ============================================================================

/// CMD_$19 - 停止连续数据
pub const CMD_STOP_CONTINUOUS_DATA: u8 = 0x19;
/// CMD_$02 - 读取间隔基准时间
pub const CMD_GET_INTERVAL_BASE_TIME: u8 = 0x02;
/// CMD_$0A - 读取器件部件信息
pub const CMD_DEVICE_COMPONENT_INFO: u8 = 0x0A;
/// CMD_$2B - 校正时间信息
pub const CMD_ADJUST_TIME_INFORMATION: u8 = 0x2B;
/// CMD_$2C - 读取通用模块功能
pub const CMD_GENERIC_MODULE_FEATURES: u8 = 0x2C;
/// CMD_$1E - 切换呼吸检测模式
pub const CMD_SWITCH_BREATH_DETECTION: u8 = 0x1E;
/// CMD_$12 - 连续数据订阅 / 连续状态帧的操作码
pub const CMD_CONTINUOUS: u8 = 0x12;
/// CMD_$03 - 测量/运行模式查询
pub const CMD_OPERATING_MODE: u8 = 0x03;
/// CMD_$61 - 切换阀位
pub const CMD_SWITCH_VALVES: u8 = 0x61;
/// CMD_$62 - 切换采样泵
pub const CMD_SWITCH_PUMP: u8 = 0x62;
/// CMD_$1D - 选择麻醉气体种类
pub const CMD_SELECT_AGENT_TYPE: u8 = 0x1D;
/// CMD_$1C - 接受外部参数数据
pub const CMD_ACCEPT_EXTERNAL_DATA: u8 = 0x1C;
/// CMD_$20 - 发起调零
pub const CMD_INITIATE_ZERO: u8 = 0x20;

// ============================================================================
// 连续帧（0x12）的帧选择子，位于线上第 13 字节
// ============================================================================

/// CO2/N2O 参数状态帧
pub const SEL_CO2_N2O_STATUS: u8 = 0x03;
/// O2 参数状态帧
pub const SEL_O2_STATUS: u8 = 0x04;
/// 模块状态告警帧（MSW）
pub const SEL_MODULE_STATUS_WARNING: u8 = 0x0B;
/// 参数详细状态帧（MS / OMS / HSP / PAI / PII）
pub const SEL_PARAM_DETAILED_STATUS: u8 = 0x0E;
/// 麻醉气体 1 生理帧（A1_PS / AIF）
pub const SEL_AGENT1_STATUS: u8 = 0x10;
/// 麻醉气体 2 生理帧（A2_PS）
pub const SEL_AGENT2_STATUS: u8 = 0x11;
/// 参数单位信息帧
pub const SEL_PARAM_UNITS: u8 = 0x12;

// ============================================================================
// 注册表键（32 位内部标识，全表唯一）
// ============================================================================

pub const ID_STOP_CONTINUOUS_DATA: u32 = 0x19;
pub const ID_GET_INTERVAL_BASE_TIME: u32 = 0x02;

/// 器件部件信息：`0x0A00 | selector`
pub const ID_DEVICE_INFO_BASE: u32 = 0x0A00;

pub const ID_ADJUST_TIME_INFORMATION: u32 = 0x2B;
pub const ID_GENERIC_MODULE_FEATURES: u32 = 0x2C12;

/// 呼吸检测模式：`0x1E00 | mode`
pub const ID_BREATH_DETECTION_BASE: u32 = 0x1E00;

pub const ID_TRANSMIT_PATIENT_DATA: u32 = 0x0012_0E00;
pub const ID_MEASUREMENT_MODE: u32 = 0x0300;
pub const ID_OPERATING_MODE: u32 = 0x0301;
pub const ID_SWITCH_VALVES: u32 = 0x6100;
pub const ID_SWITCH_PUMP: u32 = 0x6202;

pub const ID_SELECT_ANESTHETIC_AGENT: u32 = 0x120E_0401;
pub const ID_EVALUATE_AGENT_IDENT: u32 = 0x0012_1009;
pub const ID_SELECT_AGENT_TYPE: u32 = 0x1D01;
pub const ID_PROVIDE_REQUIRED_DATA: u32 = 0x0012_0E07;
pub const ID_ACCEPT_EXTERNAL_DATA: u32 = 0x1C02;

pub const ID_CHECK_WATERTRAP: u32 = 0x0012_0E02;
pub const ID_WATERTRAP_DISCONNECTED: u32 = 0x0012_0B05;
pub const ID_WATERTRAP_FULL: u32 = 0x0012_0B06;
pub const ID_WATERTRAP_WARNING: u32 = 0x0012_0B07;
pub const ID_ANY_COMPONENT_FAIL: u32 = 0x0012_0E06;
pub const ID_BREATH_PHASE_DATA: u32 = 0x0012_0E05;
pub const ID_APNEA_MONITOR: u32 = 0x120E_0402;
pub const ID_OCCLUSION_MONITOR: u32 = 0x0012_0E01;

pub const ID_SUPERVISE_ZERO_REQUEST: u32 = 0x120E_1201;
pub const ID_ZERO_IN_PROGRESS_CO2_N2O: u32 = 0x0012_0305;
pub const ID_ZERO_IN_PROGRESS_O2: u32 = 0x0012_0405;
pub const ID_ZERO_IN_PROGRESS_A1: u32 = 0x0012_1005;
pub const ID_ZERO_IN_PROGRESS_A2: u32 = 0x0012_1105;
pub const ID_ZERO_REQUEST: u32 = 0x120E_1200;
pub const ID_HANDLE_ZERO_REQUEST: u32 = 0x2C06;
pub const ID_INITIATE_ZERO: u32 = 0x2001_0100;

pub const ID_READ_PARAMETER_UNITS: u32 = 0x1212;
pub const ID_EVALUATE_CONNECTION: u32 = 0x002C_0601;
pub const ID_HOST_SELECTABLE_PARAMS: u32 = 0x120E_0701;
pub const ID_PARAMETER_AVAILABILITY: u32 = 0x120E_0403;
pub const ID_PARAM_MODE_CO2: u32 = 0x1203_1106;
pub const ID_PARAM_MODE_N2O: u32 = 0x1203_1206;
pub const ID_PARAM_MODE_O2: u32 = 0x1204_1106;
pub const ID_PARAM_MODE_A1: u32 = 0x1210_1206;
pub const ID_PARAM_MODE_A2: u32 = 0x1211_1206;
/// 注意：不得复用 0x120E05（与呼吸相位检查冲突）
pub const ID_PARAMETER_INOP_INFO: u32 = 0x120E_0501;
pub const ID_OPERATING_MODE_STATUS: u32 = 0x120E_1202;

// ============================================================================
// 位掩码（线上下标见各状态）
// ============================================================================

/// HSP 字节中"需要主机提供外部数据"的位集合（bit 1,2,3,4,6,7）
pub const HSP_EXTERNAL_DATA_MASK: u8 = 0xDE;
/// PAI 字节中"参数已安装"的位集合（bit 2,3）
pub const PAI_AVAILABLE_MASK: u8 = 0x0C;
/// PII 字节中参数失效位集合（bit 0..4）
pub const PII_INOP_MASK: u8 = 0x1F;
/// 功能帧 ZERO_CTRL 位（bit 0，置位表示自动调零被禁用）
pub const FEAT_ZERO_CTRL: u8 = 0x01;
/// 功能帧气路部件位（bit 1 / bit 2）
pub const FEAT_PNEUMATICS_PRESENT: u8 = 0x02;
pub const FEAT_PNEUMATICS_AVAILABLE: u8 = 0x04;
/// 参数状态字节的调零进行中位（bit 5）
pub const PS_ZERO_IN_PROGRESS: u8 = 0x20;
/// 参数状态字节的模式位集合（低 2 位全置位 = 参数不可用）
pub const PS_MODE_MASK: u8 = 0x03;
/// 麻醉气体识别位：bit 0,1 全零 = 未检出（NAIF），bit 1 = 已检出（DAIF）
pub const AIF_DETECTED: u8 = 0x02;
pub const AIF_MASK: u8 = 0x03;
