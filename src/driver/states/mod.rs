//! 命令状态全集
//!
//! 初始化与运行序列的全部命令状态，按家族分文件。单发命令封装请求
//! 字节与应答解码；连续订阅状态不发请求，挂在 0x12 连续帧流上按
//! 帧选择子与文档位定义匹配。
//!
//! 序列主线（分支见各状态）：停止连续数据 → 间隔基准时间 → 器件
//! 部件信息 × 6 → 校时 → 模块功能 → 呼吸检测模式 × 7 → 订阅参数
//! 详细状态 → 测量/运行模式 → 阀/泵 → 麻醉气体选择 → 模块状态
//! 监督 → 调零链 → 参数单位 → HSP/PAI/参数模式/PII 持续评估 →
//! 闭塞监测。所有失败路径最坏回落到停止连续数据重启序列。

pub mod agent;
pub mod breath;
pub mod mode;
pub mod params;
pub mod patient;
pub mod setup;
pub mod supervise;
pub mod zero;

use std::time::Duration;

/// 停止连续数据的最小重发间隔
pub(crate) const STOP_RETRY_INTERVAL: Duration = Duration::from_millis(150);

/// 测量模式查询的最小重发间隔（模块切换模式需要时间）
pub(crate) const MEASUREMENT_MODE_INTERVAL: Duration = Duration::from_millis(1000);
