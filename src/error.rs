use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// OCR 错误
    #[error("OCR错误: {0}")]
    Ocr(#[from] OcrError),
    /// 答案对齐响应解析错误
    #[error("答案对齐错误: {0}")]
    Align(#[from] AlignError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 前置文件缺失，命令在做任何工作之前中止
    #[error("缺少{what}: {path}。{hint}")]
    Prerequisite {
        what: String,
        path: String,
        hint: String,
    },
    /// 答案对齐失败，本次不生成任何分析
    #[error("无法将学生作答对齐到题目，本次未生成任何分析，已有的分析文件保持不变")]
    AlignmentFailed,
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    JsonParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
    /// 题库中题号重复
    #[error("题库中题号重复 ({path}): {id}")]
    DuplicateQuestionId { path: String, id: u32 },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 构建请求失败
    #[error("构建LLM请求失败 (模型: {model}): {message}")]
    RequestBuildFailed { model: String, message: String },
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// OCR 错误
#[derive(Debug, Error)]
pub enum OcrError {
    /// 图片解码失败
    #[error("无法读取图片 ({path}): {source}")]
    ImageDecodeFailed {
        path: String,
        #[source]
        source: image::ImageError,
    },
    /// 图片编码失败
    #[error("图片编码失败: {0}")]
    ImageEncodeFailed(#[source] image::ImageError),
    /// 识别引擎失败
    #[error("OCR 引擎返回空结果 (页面尺寸 {width}x{height})")]
    EngineReturnedNothing { width: u32, height: u32 },
}

/// 答案对齐响应的解析错误
///
/// 任何一种都视为"对齐响应格式错误"，不做部分提取。
#[derive(Debug, Error)]
pub enum AlignError {
    /// 响应为空
    #[error("LLM 响应为空")]
    EmptyResponse,
    /// 代码块没有闭合
    #[error("代码块没有闭合")]
    UnterminatedFence,
    /// 不是合法 JSON
    #[error("不是合法的 JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// 顶层不是对象
    #[error("JSON 顶层不是对象")]
    NotAnObject,
    /// 键不是整数
    #[error("题号不是整数: {0:?}")]
    NonIntegerKey(String),
    /// 值不是字符串
    #[error("题目 {0} 的作答不是字符串")]
    NonStringValue(u32),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 必需的配置项缺失
    #[error("缺少配置项 {key} (可通过环境变量 {env_var} 设置)")]
    MissingValue { key: String, env_var: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建前置文件缺失错误
    pub fn prerequisite(
        what: impl Into<String>,
        path: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        AppError::Prerequisite {
            what: what.into(),
            path: path.into(),
            hint: hint.into(),
        }
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建 JSON 解析错误
    pub fn json_parse_failed(path: impl Into<String>, source: serde_json::Error) -> Self {
        AppError::File(FileError::JsonParseFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否为前置文件缺失
    pub fn is_prerequisite(&self) -> bool {
        matches!(self, AppError::Prerequisite { .. })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
