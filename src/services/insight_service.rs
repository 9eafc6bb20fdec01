//! 分析服务 - 业务能力层
//!
//! 只负责"对比学生作答与标准答案，给出点评"能力

use std::sync::Arc;

use tracing::debug;

use crate::models::question::Question;
use crate::services::llm_service::LlmService;

/// 分析服务
pub struct InsightService {
    llm: Arc<LlmService>,
}

impl InsightService {
    pub fn new(llm: Arc<LlmService>) -> Self {
        Self { llm }
    }

    /// 生成单道题的点评原文，LLM 失败时为空字符串
    pub async fn critique(&self, question: &Question, model_answer: &str, student_answer: &str) -> String {
        let prompt = build_insight_prompt(question, model_answer, student_answer);
        debug!(question_id = question.id, "分析 prompt 长度: {} 字符", prompt.len());
        self.llm.complete(&prompt).await
    }
}

/// 构建五段式点评 prompt
pub fn build_insight_prompt(question: &Question, model_answer: &str, student_answer: &str) -> String {
    format!(
        r#"You are an empathetic yet rigorous Teaching Assistant. Your primary goal is to help the student understand their mistakes and learn from them.

**Task:** Create a detailed, multi-part feedback report by comparing the student's answer to the model answer. This report will be the *only* document the student sees, so it must be self-contained, clear, and actionable. It will also be used as a knowledge base for a support chatbot, so a predictable, detailed structure is critical.

**Required Output Structure:**

### 1. Overall Summary
Provide a concise paragraph summarizing the student's grasp of the topic. Mention both strengths and the primary areas that need improvement.

### 2. Positive Points
Even if the answer is poor, identify at least one or two things the student did correctly or partially correctly. This encourages the student. (e.g., "The student correctly identified that a process is an executing program.")

### 3. Areas for Improvement (Detailed Breakdown)
This is the most important section. Iterate through every error, omission, or misconception. For each point, you **MUST** follow this exact format:
* **[Error Type, e.g., Conceptual Error/Omission/Vague Statement]:** The student wrote, "[Directly quote the student's incorrect phrase here]".
* **Correction:** Explain *why* it's wrong and what the correct concept is, referencing the model answer. Be specific.

**Example Format for a single point:**
* **Conceptual Error:** The student wrote, "a thread is a separate program."
* **Correction:** This is incorrect. A thread is not a separate program but the smallest unit of execution *within* a process. Threads of the same process share the same memory space, whereas separate programs (processes) do not.

### 4. Actionable Path to Improvement
Suggest concrete next steps for the student. For example: "To improve, the student should review the concepts of 'shared memory vs. separate memory spaces' and practice explaining the 'process state model'."

### 5. Estimated Score
Provide a numerical score out of the maximum marks and a brief, one-sentence justification that links back to the major issues identified in the breakdown.
---
**Question:** "{}"
**Maximum Marks:** {}
**Model Answer:**
"{}"
**Student's Answer:**
"{}"
"#,
        question.text, question.max_marks, model_answer, student_answer
    )
}
