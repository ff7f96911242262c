use serde::{Deserialize, Serialize};

/// 默认的设备类型全集，调用方可以整体替换。
pub const ALLOWED_CATEGORIES: [&str; 12] = [
    "AirConditioner",
    "Blind",
    "Charger",
    "Fan",
    "Hub",
    "Light",
    "NetworkAudio",
    "Unknown",
    "Switch",
    "Television",
    "Washer",
    "SmartPlug",
];

pub const ALLOWED_FIELDS: [&str; 6] = ["a", "s", "n", "t", "q", "c"];
pub const REQUIRED_FIELDS: [&str; 5] = ["a", "s", "n", "t", "q"];
pub const VALID_FIXED_ACTIONS: [&str; 4] = ["打开", "关闭", "静音", "取消静音"];
pub const VALID_ACTION_PREFIXES: [&str; 2] = ["设置", "查询"];
pub const VALID_QUANTITIES: [&str; 4] = ["one", "all", "any", "except"];

/// 一条设备控制指令。字段声明顺序即序列化顺序（a,s,n,t,q,c）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Command {
    #[serde(rename = "a")]
    pub action: String,
    #[serde(rename = "s")]
    pub scope: String,
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "t")]
    pub category: String,
    #[serde(rename = "q")]
    pub quantity: String,
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

impl Command {
    /// 解析失败时的统一兜底指令；它本身不再走校验。
    pub fn fallback() -> Self {
        Command {
            action: "UNKNOWN".to_string(),
            scope: "*".to_string(),
            name: "*".to_string(),
            category: "Unknown".to_string(),
            quantity: "one".to_string(),
            count: None,
        }
    }
}

pub fn fallback_commands() -> Vec<Command> {
    vec![Command::fallback()]
}

/// 输出紧凑 JSON：不插空白，非 ASCII 字符保持原文。
pub fn compact_json<T: Serialize>(payload: &T) -> serde_json::Result<String> {
    serde_json::to_string(payload)
}
