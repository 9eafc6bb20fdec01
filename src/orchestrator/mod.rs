//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整批题目的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `answer_source` - 学生作答来源
//! - 文本文件（`Question N:` 标记）或答题纸图片目录
//!
//! ### `pipeline` - 生成流水线
//! - 检查前置文件，缺失时在做任何工作之前中止
//! - 按题库顺序逐题调用，每次调用后固定等待
//! - 一次性写出标准答案文件 / 分析文档
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (处理 Vec<Question>)
//!     ↓
//! workflow::InsightFlow (处理单个 Question)
//!     ↓
//! services (能力层：llm / ocr / align / model answer / insight)
//! ```
//!
//! ## 并发
//!
//! 严格串行：同一时刻只有一个外部调用。同一数据目录只允许一个进程运行，
//! 输出文件没有加锁，并发运行会互相覆盖。

pub mod answer_source;
pub mod pipeline;

pub use answer_source::AnswerSource;
pub use pipeline::{check_all_inputs, check_insight_inputs, check_model_answer_inputs, InsightStats, Pipeline};
