use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use crate::command::extractor::extract_json;
use crate::command::model::{fallback_commands, Command, ALLOWED_CATEGORIES};
use crate::command::validator::validate_commands;
use crate::llm::{AskOptions, ChatClient};

// 通过提示词约束输出形状，便于后续做严格校验。
const SYSTEM_PROMPT_TEMPLATE: &str = r#"你是智能家居用户指令解析器。
请严格遵守以下规则：
1) 只输出 JSON 数组，不解释、不要代码块、不要多余文本。
2) 输出尽量紧凑：不要换行，字段间不需要空格。
3) 数组元素对象字段只允许（按顺序输出）：a,s,n,t,q,c。
4) a（动作）：固定动作仅可为 打开/关闭/静音/取消静音；
   设置动作必须是 设置<属性>=<值>；查询动作必须是 查询<属性>。
5) s（房间）：未知用 "*"；多房间可用 ","；排除房间用 "!" 前缀。
6) n（设备名）：未知用 "*"；泛指类型使用中文原文（如 灯/插座/空调/窗帘）。
7) t（类型）只能是：{categories}；不确定用 Unknown。
8) q 只能是 one/all/any/except；泛指类型默认 all；不确定用 one。
9) c 仅在数量明确时输出为整数，否则不要输出该字段。
10) 多动作/多目标要拆成多个对象并按语序输出；每个对象仅含一个动作和一个目标。
11) 指代词（它/那个/刚才那个）且目标不明确时，保留动作，输出 s="*", n="*", t="Unknown", q="one"。
12) 完全无法解析时输出：[{"a":"UNKNOWN","s":"*","n":"*","t":"Unknown","q":"one"}]。"#;

const RAW_RESPONSE_LOG_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub allowed_categories: Vec<String>,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            allowed_categories: ALLOWED_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            temperature: 0.0,
            top_p: 0.9,
            max_tokens: 512,
        }
    }
}

fn build_system_prompt(allowed_categories: &[String]) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{categories}", &allowed_categories.join(", "))
}

/// 日志里截断原始响应，按字符数而不是字节数。
fn truncate_raw_response(raw: &str) -> String {
    raw.chars().take(RAW_RESPONSE_LOG_LIMIT).collect()
}

/// 把一句中文口语指令解析成结构化指令列表。
///
/// 任何一个环节失败都返回兜底的 UNKNOWN 单元素列表，并记录一条
/// `command_parser.parse_failed` 诊断日志；本函数对调用方永不报错。
pub fn parse_commands<C: ChatClient + ?Sized>(
    client: &C,
    text: &str,
    options: &ParseOptions,
) -> Vec<Command> {
    // 校验时统一使用 set，避免重复创建和线性查找。
    let allowed_categories: HashSet<&str> =
        options.allowed_categories.iter().map(String::as_str).collect();
    let system_prompt = build_system_prompt(&options.allowed_categories);

    let ask_options = AskOptions {
        system_prompt: Some(system_prompt),
        temperature: Some(options.temperature),
        top_p: Some(options.top_p),
        max_tokens: Some(options.max_tokens),
    };

    let raw_response = match client.ask(text, &ask_options) {
        Ok(raw) => raw,
        Err(_) => {
            warn!(
                failure_type = "llm_error",
                input_text = %text,
                "command_parser.parse_failed"
            );
            return fallback_commands();
        }
    };

    let Some(candidates) = extract_json(&raw_response) else {
        warn!(
            failure_type = "json_parse_error",
            input_text = %text,
            raw_response = %truncate_raw_response(&raw_response),
            "command_parser.parse_failed"
        );
        return fallback_commands();
    };

    if !validate_commands(&candidates, &allowed_categories) {
        warn!(
            failure_type = "validation_failed",
            input_text = %text,
            raw_response = %truncate_raw_response(&raw_response),
            "command_parser.parse_failed"
        );
        return fallback_commands();
    }

    // 校验通过后字段集合和类型都已确定，转换失败只剩理论可能，仍按校验失败兜底。
    match serde_json::from_value::<Vec<Command>>(Value::Array(candidates)) {
        Ok(commands) => commands,
        Err(_) => {
            warn!(
                failure_type = "validation_failed",
                input_text = %text,
                raw_response = %truncate_raw_response(&raw_response),
                "command_parser.parse_failed"
            );
            fallback_commands()
        }
    }
}
