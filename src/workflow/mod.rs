pub mod insight_flow;
pub mod question_ctx;

pub use insight_flow::{InsightFlow, ProcessResult};
pub use question_ctx::QuestionCtx;
