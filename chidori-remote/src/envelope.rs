use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 跨进程传递的事件信封
///
/// - `target`：接收方的包名（大小写不敏感）
/// - `servers`：接收端点列表；为空时仅默认端点接收
/// - `event_type`：编解码注册表中的事件名
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEnvelope {
    pub target: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<String>,
    pub event_type: String,
    pub payload: Value,
}
