pub mod qwen;

use serde::{Deserialize, Serialize};

use crate::error::QwenClientError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message { role: "user".to_string(), content: content.into() }
    }
}

/// 单次调用的可选覆盖项；None 表示沿用客户端的默认值。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AskOptions {
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// 编排器依赖的最小接口，便于在测试里用桩实现替换真实网关。
pub trait ChatClient {
    fn ask(&self, prompt: &str, options: &AskOptions) -> Result<String, QwenClientError>;
}
