//! # Exam Insight
//!
//! 一个用 LLM 批改学生答卷、生成逐题分析文档的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个题目或单页图片
//! - `LlmService` - 带重试的文本补全能力
//! - `OcrExtractor` - 答题纸图片 → 文本
//! - `AnswerAligner` - 整份作答 → 题号到原文的映射
//! - `ModelAnswerService` / `InsightService` - 标准答案与点评
//!
//! ### ② 流程层（Workflow）
//! - `workflow/` - 定义"一道题"的分析流程
//! - `QuestionCtx` - 上下文封装（题号 + 位置）
//! - `InsightFlow` - 流程编排（查标准答案 → 查作答 → 点评）
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 两个阶段的批量调度、前置检查、限速和写文件
//!
//! ## 产物
//!
//! - `model_answers.json`：`[{question_id, model_answer}]`
//! - `insights.txt`：按题库顺序拼接的分析文档，供检索/对话组件索引
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, PacingPolicy, RetryPolicy};
pub use error::{AppError, AppResult};
pub use models::{AlignedAnswers, InsightCorpus, InsightRecord, ModelAnswer, ModelAnswerSet, Question};
pub use orchestrator::{AnswerSource, InsightStats, Pipeline};
pub use workflow::{InsightFlow, ProcessResult, QuestionCtx};
