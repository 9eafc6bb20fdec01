//! 单题分析流程 - 流程层
//!
//! 核心职责：定义"一道题"的分析流程
//!
//! 流程顺序：
//! 1. 查标准答案（没有则跳过并警告）
//! 2. 查学生作答（没有则使用占位值）
//! 3. LLM 点评 → 包装成带标题的分析记录

use std::collections::HashMap;

use tracing::{info, warn};

use crate::models::answer::AlignedAnswers;
use crate::models::insight::InsightRecord;
use crate::models::question::Question;
use crate::services::InsightService;
use crate::workflow::question_ctx::QuestionCtx;

/// 题目处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    /// 已生成分析（点评可能为空，表示 LLM 调用失败）
    Generated(InsightRecord),
    /// 跳过（没有标准答案）
    Skipped,
}

impl ProcessResult {
    /// 本次是否调用了 LLM
    pub fn called_model(&self) -> bool {
        matches!(self, ProcessResult::Generated(_))
    }
}

/// 单题分析流程
///
/// - 决定跳过还是分析
/// - 不持有任何文件
/// - 不负责限速，由编排层在每次调用后等待
pub struct InsightFlow {
    insight_service: InsightService,
}

impl InsightFlow {
    pub fn new(insight_service: InsightService) -> Self {
        Self { insight_service }
    }

    pub async fn run(
        &self,
        question: &Question,
        ctx: &QuestionCtx,
        model_answers: &HashMap<u32, &str>,
        aligned: &AlignedAnswers,
    ) -> ProcessResult {
        let Some(model_answer) = model_answers.get(&question.id) else {
            warn!(
                question_id = question.id,
                "{} ⚠️ 没有找到标准答案，跳过该题", ctx
            );
            return ProcessResult::Skipped;
        };

        let student_answer = aligned.answer_for(question.id);
        info!(question_id = question.id, "{} 🕵️ 正在生成分析...", ctx);

        let critique = self
            .insight_service
            .critique(question, model_answer, student_answer)
            .await;

        if critique.is_empty() {
            warn!(question_id = question.id, "{} ⚠️ 分析生成失败，记录为空", ctx);
        } else {
            info!(question_id = question.id, "{} ✓ 分析生成完成", ctx);
        }

        ProcessResult::Generated(InsightRecord::new(question.id, question.text.clone(), critique))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::models::answer::NO_ANSWER_PROVIDED;
    use crate::services::{LlmService, TextModel};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// 把 prompt 记下来，回复固定文本
    struct Recorder {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextModel for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn generate(&self, prompt: &str, _images: Option<&[String]>) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("### 1. Overall Summary\nFine.".to_string())
        }
    }

    fn flow() -> (InsightFlow, Arc<Recorder>) {
        let model = Arc::new(Recorder {
            prompts: Mutex::new(Vec::new()),
        });
        let llm = Arc::new(LlmService::new(model.clone(), RetryPolicy::immediate(1)));
        (InsightFlow::new(InsightService::new(llm)), model)
    }

    fn question(id: u32) -> Question {
        Question {
            id,
            text: format!("Question text {}", id),
            max_marks: 5.0,
        }
    }

    #[tokio::test]
    async fn skips_without_model_answer() {
        let (flow, model) = flow();
        let result = flow
            .run(&question(1), &QuestionCtx::new(1, 1, 1), &HashMap::new(), &AlignedAnswers::empty())
            .await;

        assert_eq!(result, ProcessResult::Skipped);
        assert!(!result.called_model());
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_student_answer_uses_sentinel() {
        let (flow, model) = flow();
        let model_answers = HashMap::from([(2, "Model text")]);
        let (aligned, _) = AlignedAnswers::totalize(BTreeMap::new(), &[2]);

        let result = flow
            .run(&question(2), &QuestionCtx::new(2, 1, 1), &model_answers, &aligned)
            .await;

        let ProcessResult::Generated(record) = result else {
            panic!("应当生成分析");
        };
        assert_eq!(record.question_id, 2);
        assert_eq!(record.question_text, "Question text 2");
        assert_eq!(record.critique, "### 1. Overall Summary\nFine.");

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains(&format!("\"{}\"", NO_ANSWER_PROVIDED)));
        assert!(prompts[0].contains("\"Model text\""));
    }
}
