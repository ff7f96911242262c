//! 智能家居中文口语指令解析：调用托管大模型，再对输出做严格的结构化校验。
//!
//! 入口是 [`parse_commands`]：构造提示词、请求网关、两阶段提取 JSON 数组、
//! 逐字段校验；任何环节失败都降级为 UNKNOWN 兜底指令，绝不向调用方抛错。

pub mod command;
pub mod error;
pub mod llm;
pub mod orchestrator;

pub use command::model::{compact_json, fallback_commands, Command, ALLOWED_CATEGORIES};
pub use error::QwenClientError;
pub use llm::qwen::{QwenClient, QwenConfig};
pub use llm::{AskOptions, ChatClient, Message};
pub use orchestrator::{parse_commands, ParseOptions};
