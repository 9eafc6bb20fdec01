use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 题库中的一道题
///
/// 每次运行加载一次，之后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// 题号，题库内唯一且跨运行稳定
    pub id: u32,
    /// 题干
    #[serde(rename = "question")]
    pub text: String,
    /// 满分
    pub max_marks: f64,
}

/// 某道题的标准答案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAnswer {
    pub question_id: u32,
    pub model_answer: String,
}

impl ModelAnswer {
    pub fn new(question_id: u32, model_answer: impl Into<String>) -> Self {
        Self {
            question_id,
            model_answer: model_answer.into(),
        }
    }
}

/// 标准答案集合，按题库顺序保存
///
/// 序列化为 `[{question_id, model_answer}, ...]`。重新生成会整体替换。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelAnswerSet {
    answers: Vec<ModelAnswer>,
}

impl ModelAnswerSet {
    pub fn new(answers: Vec<ModelAnswer>) -> Self {
        Self { answers }
    }

    pub fn answers(&self) -> &[ModelAnswer] {
        &self.answers
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// 题号 → 标准答案 的查找表
    ///
    /// 同一题号出现多次时以最后一条为准。
    pub fn by_question_id(&self) -> HashMap<u32, &str> {
        self.answers
            .iter()
            .map(|a| (a.question_id, a.model_answer.as_str()))
            .collect()
    }

    /// 不在题库中的题号
    pub fn unknown_ids(&self, questions: &[Question]) -> Vec<u32> {
        self.answers
            .iter()
            .map(|a| a.question_id)
            .filter(|id| !questions.iter().any(|q| q.id == *id))
            .collect()
    }
}
