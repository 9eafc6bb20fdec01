//! 程序配置
//!
//! 加载顺序：内置默认值 → TOML 配置文件（可选）→ 环境变量（`.env` 会先被加载）。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, AppResult, FileError};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_FILE: &str = "exam_insight.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 用作 OCR 引擎的视觉模型
    pub ocr_model_name: String,
    /// 单次输出的最大 token 数
    pub max_output_tokens: u32,
    /// 采样温度，固定为 0 以保证可复现
    pub temperature: f32,
    // --- 重试与限速 ---
    /// 每次调用的最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 指数退避的初始等待秒数
    pub retry_base_delay_secs: u64,
    /// 每次调用之后固定等待的秒数（外部 API 限速）
    pub pacing_delay_secs: u64,
    // --- 数据文件 ---
    pub data_dir: String,
    pub questions_file: String,
    pub model_answers_file: String,
    pub insights_file: String,
    pub student_answer_file: String,
    /// 运行日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            ocr_model_name: "gemini-2.5-flash".to_string(),
            max_output_tokens: 4096,
            temperature: 0.0,
            max_attempts: 3,
            retry_base_delay_secs: 5,
            pacing_delay_secs: 20,
            data_dir: "data".to_string(),
            questions_file: "questions.json".to_string(),
            model_answers_file: "model_answers.json".to_string(),
            insights_file: "insights.txt".to_string(),
            student_answer_file: "student_answer.txt".to_string(),
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 按 默认值 → 配置文件 → 环境变量 的顺序加载
    pub fn load() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        let path = std::env::var("EXAM_INSIGHT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            debug!("未找到配置文件 {}，使用默认配置", path);
            Self::default()
        };
        base.with_env_overrides()
    }

    /// 从 TOML 文件加载，未出现的字段取默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        toml::from_str(&content).map_err(|source| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            })
        })
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> AppResult<Self> {
        Ok(Self {
            llm_api_key: env_or("LLM_API_KEY", self.llm_api_key),
            llm_api_base_url: env_or("LLM_API_BASE_URL", self.llm_api_base_url),
            llm_model_name: env_or("LLM_MODEL_NAME", self.llm_model_name),
            ocr_model_name: env_or("OCR_MODEL_NAME", self.ocr_model_name),
            max_output_tokens: env_parse("MAX_OUTPUT_TOKENS", self.max_output_tokens)?,
            temperature: env_parse("LLM_TEMPERATURE", self.temperature)?,
            max_attempts: env_parse("LLM_MAX_ATTEMPTS", self.max_attempts)?,
            retry_base_delay_secs: env_parse("RETRY_BASE_DELAY_SECS", self.retry_base_delay_secs)?,
            pacing_delay_secs: env_parse("PACING_DELAY_SECS", self.pacing_delay_secs)?,
            data_dir: env_or("DATA_DIR", self.data_dir),
            questions_file: env_or("QUESTIONS_FILE", self.questions_file),
            model_answers_file: env_or("MODEL_ANSWERS_FILE", self.model_answers_file),
            insights_file: env_or("INSIGHTS_FILE", self.insights_file),
            student_answer_file: env_or("STUDENT_ANSWER_FILE", self.student_answer_file),
            output_log_file: env_or("OUTPUT_LOG_FILE", self.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging)?,
        })
    }

    pub fn questions_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.questions_file)
    }

    pub fn model_answers_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.model_answers_file)
    }

    pub fn insights_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.insights_file)
    }

    /// 未指定作答来源时使用的默认文件
    pub fn default_answer_source(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.student_answer_file)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.retry_base_delay_secs))
    }

    pub fn pacing_policy(&self) -> PacingPolicy {
        PacingPolicy::new(Duration::from_secs(self.pacing_delay_secs))
    }
}

fn env_or(var_name: &str, current: String) -> String {
    std::env::var(var_name).unwrap_or(current)
}

fn env_parse<T: std::str::FromStr>(var_name: &str, current: T) -> AppResult<T> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map_err(|_| {
            AppError::Config(crate::error::ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            })
        }),
        Err(_) => Ok(current),
    }
}

/// 有上限的指数退避重试策略
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次），至少为 1
    pub max_attempts: u32,
    /// 第一次失败后的等待时间，之后每次翻倍
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// 不等待的重试策略（测试用）
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// 第 `attempt` 次（从 1 开始）失败后的等待时间
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

/// 每次外部调用后的固定等待
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacingPolicy {
    pub delay: Duration,
}

impl PacingPolicy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tracing::info!("🕒 等待 {} 秒后再发送下一个请求...", self.delay.as_secs());
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(20))
    }
}
