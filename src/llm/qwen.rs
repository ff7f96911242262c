use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::QwenClientError;
use crate::llm::{AskOptions, ChatClient, Message};

const DASHSCOPE_API_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";
const ENV_API_KEY: &str = "DASHSCOPE_API_KEY";

/// 发给生成接口的完整参数，注入的桩实现也收到同样的结构。
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub result_format: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub status_code: u16,
    pub code: Option<String>,
    pub message: Option<String>,
    pub output: Option<GenerationOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationOutput {
    #[serde(default)]
    pub choices: Vec<GenerationChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    pub content: String,
}

pub type GenerationCall =
    Box<dyn Fn(&GenerationRequest) -> Result<GenerationResponse, QwenClientError> + Send + Sync>;

pub struct QwenConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub generation_call: Option<GenerationCall>,
}

impl Default for QwenConfig {
    fn default() -> Self {
        QwenConfig {
            api_key: None,
            model: "qwen-flash".to_string(),
            system_prompt: None,
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 2000,
            generation_call: None,
        }
    }
}

/// DashScope 网关：只做请求/响应转换，不重试、不聚合多个 choice。
pub struct QwenClient {
    model: String,
    system_prompt: Option<String>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    generation_call: GenerationCall,
}

impl std::fmt::Debug for QwenClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QwenClient")
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl QwenClient {
    pub fn new(config: QwenConfig) -> Result<Self, QwenClientError> {
        let api_key = config
            .api_key
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var(ENV_API_KEY).ok().filter(|key| !key.is_empty()))
            .ok_or(QwenClientError::MissingApiKey)?;

        let generation_call = config
            .generation_call
            .unwrap_or_else(|| dashscope_call(api_key));

        Ok(QwenClient {
            model: config.model,
            system_prompt: config.system_prompt,
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
            generation_call,
        })
    }

    pub fn chat(&self, messages: &[Message], options: &AskOptions) -> Result<String, QwenClientError> {
        let mut payload = Vec::with_capacity(messages.len() + 1);
        // 单次调用里显式给出的 system prompt 优先于构造时的默认值。
        let prompt = options.system_prompt.as_deref().or(self.system_prompt.as_deref());
        if let Some(prompt) = prompt {
            payload.push(Message::system(prompt));
        }
        payload.extend_from_slice(messages);

        let request = GenerationRequest {
            model: self.model.clone(),
            messages: payload,
            result_format: "message".to_string(),
            temperature: options.temperature.unwrap_or(self.temperature),
            top_p: options.top_p.unwrap_or(self.top_p),
            max_tokens: options.max_tokens.unwrap_or(self.max_tokens),
        };

        let response = (self.generation_call)(&request)?;
        if response.status_code != 200 {
            return Err(QwenClientError::Api {
                code: response.code,
                message: response.message,
                status_code: response.status_code,
            });
        }

        response
            .output
            .and_then(|output| output.choices.into_iter().next())
            .map(|choice| choice.message.content)
            .ok_or(QwenClientError::MissingContent)
    }

    pub fn ask(&self, prompt: &str, options: &AskOptions) -> Result<String, QwenClientError> {
        self.chat(&[Message::user(prompt)], options)
    }
}

impl ChatClient for QwenClient {
    fn ask(&self, prompt: &str, options: &AskOptions) -> Result<String, QwenClientError> {
        QwenClient::ask(self, prompt, options)
    }
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    code: Option<String>,
    message: Option<String>,
    output: Option<GenerationOutput>,
}

fn dashscope_call(api_key: String) -> GenerationCall {
    let http = Client::new();
    Box::new(move |request| {
        let body = json!({
            "model": request.model,
            "input": { "messages": request.messages },
            "parameters": {
                "result_format": request.result_format,
                "temperature": request.temperature,
                "top_p": request.top_p,
                "max_tokens": request.max_tokens,
            },
        });

        let response = http
            .post(DASHSCOPE_API_URL)
            .bearer_auth(&api_key)
            .json(&body)
            .send()?;

        let status_code = response.status().as_u16();
        let parsed: ResponseBody = response.json()?;
        Ok(GenerationResponse {
            status_code,
            code: parsed.code,
            message: parsed.message,
            output: parsed.output,
        })
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn ok_response(content: &str) -> GenerationResponse {
        GenerationResponse {
            status_code: 200,
            code: None,
            message: None,
            output: Some(GenerationOutput {
                choices: vec![GenerationChoice {
                    message: ChoiceMessage { content: content.to_string() },
                }],
            }),
        }
    }

    fn capture_stub(
        capture: Arc<Mutex<Vec<GenerationRequest>>>,
        response: GenerationResponse,
    ) -> GenerationCall {
        Box::new(move |request| {
            capture.lock().unwrap().push(request.clone());
            Ok(response.clone())
        })
    }

    fn client_with(config: QwenConfig) -> QwenClient {
        QwenClient::new(config).unwrap()
    }

    #[test]
    fn chat_calls_generation_with_defaults() {
        let capture = Arc::new(Mutex::new(Vec::new()));
        let client = client_with(QwenConfig {
            api_key: Some("test".to_string()),
            generation_call: Some(capture_stub(capture.clone(), ok_response("hi"))),
            ..QwenConfig::default()
        });

        let messages = vec![Message::user("Hello")];
        let result = client.chat(&messages, &AskOptions::default()).unwrap();

        assert_eq!(result, "hi");
        let calls = capture.lock().unwrap();
        assert_eq!(calls[0].model, "qwen-flash");
        assert_eq!(calls[0].messages, messages);
        assert_eq!(calls[0].result_format, "message");
        assert_eq!(calls[0].temperature, 0.7);
        assert_eq!(calls[0].top_p, 0.9);
        assert_eq!(calls[0].max_tokens, 2000);
    }

    #[test]
    fn chat_inserts_system_prompt_default() {
        let capture = Arc::new(Mutex::new(Vec::new()));
        let client = client_with(QwenConfig {
            api_key: Some("test".to_string()),
            system_prompt: Some("You are helpful".to_string()),
            generation_call: Some(capture_stub(capture.clone(), ok_response("ok"))),
            ..QwenConfig::default()
        });

        client.chat(&[Message::user("Hello")], &AskOptions::default()).unwrap();

        let calls = capture.lock().unwrap();
        assert_eq!(calls[0].messages[0], Message::system("You are helpful"));
        assert_eq!(calls[0].messages[1], Message::user("Hello"));
    }

    #[test]
    fn chat_overrides_system_prompt() {
        let capture = Arc::new(Mutex::new(Vec::new()));
        let client = client_with(QwenConfig {
            api_key: Some("test".to_string()),
            system_prompt: Some("default".to_string()),
            generation_call: Some(capture_stub(capture.clone(), ok_response("ok"))),
            ..QwenConfig::default()
        });

        let options = AskOptions { system_prompt: Some("override".to_string()), ..AskOptions::default() };
        client.chat(&[Message::user("Hi")], &options).unwrap();

        let calls = capture.lock().unwrap();
        assert_eq!(calls[0].messages[0].content, "override");
    }

    #[test]
    fn chat_overrides_generation_parameters() {
        let capture = Arc::new(Mutex::new(Vec::new()));
        let client = client_with(QwenConfig {
            api_key: Some("test".to_string()),
            generation_call: Some(capture_stub(capture.clone(), ok_response("ok"))),
            ..QwenConfig::default()
        });

        let options = AskOptions {
            temperature: Some(0.2),
            top_p: Some(0.5),
            max_tokens: Some(10),
            ..AskOptions::default()
        };
        client.chat(&[Message::user("Hi")], &options).unwrap();

        let calls = capture.lock().unwrap();
        assert_eq!(calls[0].temperature, 0.2);
        assert_eq!(calls[0].top_p, 0.5);
        assert_eq!(calls[0].max_tokens, 10);
    }

    #[test]
    fn ask_wraps_user_message() {
        let capture = Arc::new(Mutex::new(Vec::new()));
        let client = client_with(QwenConfig {
            api_key: Some("test".to_string()),
            generation_call: Some(capture_stub(capture.clone(), ok_response("ok"))),
            ..QwenConfig::default()
        });

        let result = client.ask("Hello", &AskOptions::default()).unwrap();

        assert_eq!(result, "ok");
        let calls = capture.lock().unwrap();
        assert_eq!(calls[0].messages, vec![Message::user("Hello")]);
    }

    #[test]
    fn chat_fails_on_non_ok_status() {
        let response = GenerationResponse {
            status_code: 400,
            code: Some("Bad".to_string()),
            message: Some("oops".to_string()),
            output: None,
        };
        let client = client_with(QwenConfig {
            api_key: Some("test".to_string()),
            generation_call: Some(capture_stub(Arc::new(Mutex::new(Vec::new())), response)),
            ..QwenConfig::default()
        });

        let err = client.chat(&[Message::user("Hi")], &AskOptions::default()).unwrap_err();

        match err {
            QwenClientError::Api { code, message, status_code } => {
                assert_eq!(code.as_deref(), Some("Bad"));
                assert_eq!(message.as_deref(), Some("oops"));
                assert_eq!(status_code, 400);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn chat_fails_when_content_is_missing() {
        let response = GenerationResponse {
            status_code: 200,
            code: None,
            message: None,
            output: Some(GenerationOutput::default()),
        };
        let client = client_with(QwenConfig {
            api_key: Some("test".to_string()),
            generation_call: Some(capture_stub(Arc::new(Mutex::new(Vec::new())), response)),
            ..QwenConfig::default()
        });

        let err = client.chat(&[Message::user("Hi")], &AskOptions::default()).unwrap_err();

        assert!(matches!(err, QwenClientError::MissingContent));
    }

    #[test]
    fn new_requires_api_key() {
        std::env::remove_var(ENV_API_KEY);

        let err = QwenClient::new(QwenConfig::default()).unwrap_err();

        assert!(matches!(err, QwenClientError::MissingApiKey));
    }
}
