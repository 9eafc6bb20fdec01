//! LLM 服务 - 业务能力层
//!
//! 只负责"文本生成"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）
//!
//! ## 调用约定
//! - 温度固定为 0，输出长度受 `max_output_tokens` 限制
//! - 失败时按 [`RetryPolicy`] 指数退避重试，全部失败后返回空字符串，不向上抛错
//! - 不做任何缓存，每次调用都会请求模型

use std::sync::Arc;

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::config::{Config, RetryPolicy};
use crate::error::{AppResult, ConfigError, LlmError};

/// 底层文本生成模型
///
/// 一次调用就是一次请求，不含重试。
#[async_trait]
pub trait TextModel: Send + Sync {
    /// 模型名称（仅用于日志）
    fn name(&self) -> &str;

    /// 生成文本
    ///
    /// `images` 为图片 URL（可以是 data URL），会追加到用户消息中。
    async fn generate(&self, prompt: &str, images: Option<&[String]>) -> Result<String>;
}

/// OpenAI 兼容接口的模型
pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl OpenAiModel {
    /// 用配置中的文本模型创建
    pub fn new(config: &Config) -> AppResult<Self> {
        Self::with_model(config, config.llm_model_name.clone())
    }

    /// 使用指定模型名创建（例如 OCR 用的视觉模型）
    pub fn with_model(config: &Config, model_name: impl Into<String>) -> AppResult<Self> {
        if config.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                key: "llm_api_key".to_string(),
                env_var: "LLM_API_KEY".to_string(),
            }
            .into());
        }

        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            model_name: model_name.into(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn build_user_message(
        &self,
        prompt: &str,
        images: Option<&[String]>,
    ) -> Result<ChatCompletionRequestMessage> {
        let content = match images {
            Some(urls) if !urls.is_empty() => {
                let mut parts: Vec<ChatCompletionRequestUserMessageContentPart> =
                    Vec::with_capacity(urls.len() + 1);
                parts.push(ChatCompletionRequestUserMessageContentPart::Text(
                    ChatCompletionRequestMessageContentPartText {
                        text: prompt.to_string(),
                    },
                ));
                for url in urls {
                    parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: url.clone(),
                                detail: Some(ImageDetail::High),
                            },
                        },
                    ));
                }
                debug!("使用 Vision API，包含 {} 张图片", urls.len());
                ChatCompletionRequestUserMessageContent::Array(parts)
            }
            _ => ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
        };

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?;
        Ok(ChatCompletionRequestMessage::User(user_msg))
    }
}

#[async_trait]
impl TextModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, prompt: &str, images: Option<&[String]>) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", prompt.len());

        let message = self.build_user_message(prompt, images).map_err(|e| {
            LlmError::RequestBuildFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            }
        })?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![message])
            .temperature(self.temperature)
            .max_tokens(self.max_output_tokens)
            .build()
            .map_err(|e| LlmError::RequestBuildFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            })?;

        // 调用 API
        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            LlmError::ApiCallFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            }
        })?;

        debug!("LLM API 调用成功");

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

/// LLM 服务（带重试的文本补全客户端）
///
/// 职责：
/// - 发送单个 prompt 并返回输出
/// - 失败时有限次数重试，每次等待时间翻倍
/// - 全部失败返回空字符串，由调用方决定跳过、警告还是中止
pub struct LlmService {
    model: Arc<dyn TextModel>,
    retry: RetryPolicy,
}

impl LlmService {
    pub fn new(model: Arc<dyn TextModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    /// 按配置创建真实的 OpenAI 兼容客户端
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let model = OpenAiModel::new(config)?;
        Ok(Self::new(Arc::new(model), config.retry_policy()))
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// 文本补全，全部尝试失败时返回空字符串
    pub async fn complete(&self, prompt: &str) -> String {
        self.complete_with_images(prompt, None).await
    }

    /// 带图片的补全，重试约定与 [`complete`](Self::complete) 相同
    pub async fn complete_with_images(&self, prompt: &str, images: Option<&[String]>) -> String {
        let max_attempts = self.retry.max_attempts;

        for attempt in 1..=max_attempts {
            match self.model.generate(prompt, images).await {
                Ok(text) if !text.trim().is_empty() => {
                    if attempt > 1 {
                        debug!("第 {} 次尝试成功", attempt);
                    }
                    return text;
                }
                Ok(_) => {
                    warn!(
                        attempt,
                        "LLM 返回内容为空 (模型: {}, 尝试 {}/{})",
                        self.model.name(),
                        attempt,
                        max_attempts
                    );
                }
                Err(e) => {
                    warn!(
                        attempt,
                        "LLM 调用出错 (模型: {}, 尝试 {}/{}): {}",
                        self.model.name(),
                        attempt,
                        max_attempts,
                        e
                    );
                }
            }

            if attempt < max_attempts {
                let delay = self.retry.delay_for(attempt);
                warn!("{} 秒后重试...", delay.as_secs_f32());
                tokio::time::sleep(delay).await;
            }
        }

        error!("已达到最大尝试次数 {}，返回空字符串", max_attempts);
        String::new()
    }
}
