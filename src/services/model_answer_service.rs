//! 标准答案服务 - 业务能力层
//!
//! 只负责"为一道题生成标准答案"能力，不关心流程和限速

use std::sync::Arc;

use tracing::{info, warn};

use crate::models::question::{ModelAnswer, Question};
use crate::services::llm_service::LlmService;

/// 标准答案服务
///
/// 生成失败（LLM 返回空）时仍产出一条空答案记录，不再额外重试。
pub struct ModelAnswerService {
    llm: Arc<LlmService>,
}

impl ModelAnswerService {
    pub fn new(llm: Arc<LlmService>) -> Self {
        Self { llm }
    }

    /// 为单道题生成标准答案
    pub async fn generate(&self, question: &Question) -> ModelAnswer {
        info!(question_id = question.id, "🧠 正在生成第 {} 题的标准答案...", question.id);
        let prompt = build_model_answer_prompt(question);
        let answer = self.llm.complete(&prompt).await;

        if answer.is_empty() {
            warn!(question_id = question.id, "⚠️ 第 {} 题标准答案生成失败，记录为空", question.id);
        } else {
            info!(
                question_id = question.id,
                "✓ 第 {} 题标准答案生成完成 ({} 字符)",
                question.id,
                answer.chars().count()
            );
        }

        ModelAnswer::new(question.id, answer)
    }
}

/// 构建评分标准式的标准答案 prompt
pub fn build_model_answer_prompt(question: &Question) -> String {
    format!(
        r####"You are a University Professor and Chief Examiner for a Computer Science course. Your task is to create a gold-standard model answer suitable for a university-level examination.

**Goal:** The answer must be exemplary, serving as the ultimate reference for grading. It should be comprehensive, accurate, and exceptionally clear.

**Formatting and Structural Requirements:**
1.  **Introduction:** Start with a concise, direct definition or introduction of the main topic.
2.  **Structured Body:** Use Markdown headings (`###`) to separate distinct parts of the answer (e.g., "### Key Differences", "### Advantages of Threads").
3.  **Use Lists:** For enumerating points, advantages, disadvantages, or characteristics, use bulleted or numbered lists.
4.  **Bold Key Terms:** Enclose all critical terminology in bold Markdown (`**key term**`). This is essential for emphasis and clarity.
5.  **Conclusion:** End with a brief concluding paragraph that summarizes the most crucial points.

**Question:** "{}"
**Maximum Marks:** {}
"####,
        question.text, question.max_marks
    )
}
