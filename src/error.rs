use thiserror::Error;

/// DashScope 网关的类型化错误。
#[derive(Debug, Error)]
pub enum QwenClientError {
    /// 构造时既没有显式 api_key，环境变量也缺失。
    #[error("DASHSCOPE_API_KEY is required")]
    MissingApiKey,

    /// 服务端返回非 200 状态。
    #[error("DashScope error {code:?}: {message:?} (status {status_code})")]
    Api {
        code: Option<String>,
        message: Option<String>,
        status_code: u16,
    },

    #[error("DashScope request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 状态码 200 但响应体里找不到首个 choice 的文本内容。
    #[error("DashScope response is missing message content")]
    MissingContent,
}
