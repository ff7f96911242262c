use serde_json::Value;

/// 两阶段解析：先整段 JSON，再从包裹文本里提取数组。
///
/// 模型经常把 JSON 夹在解释文字或代码块里，因此第二阶段取第一个 `[` 到
/// 最后一个 `]` 的贪婪区间，而不是就近配对括号。
pub fn extract_json(raw: &str) -> Option<Vec<Value>> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(raw.trim()) {
        return Some(items);
    }

    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}
