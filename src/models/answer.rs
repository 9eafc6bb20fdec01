use std::collections::BTreeMap;

/// 找不到作答时使用的占位值
pub const NO_ANSWER_PROVIDED: &str = "No answer provided";

/// 题号 → 学生原文作答
///
/// 对题库是全覆盖的：每个题号都有值，找不到作答的题目为 [`NO_ANSWER_PROVIDED`]。
/// 作答原样保留，不做改写。空集合表示对齐失败。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignedAnswers {
    answers: BTreeMap<u32, String>,
}

impl AlignedAnswers {
    /// 对齐失败时的空结果
    pub fn empty() -> Self {
        Self::default()
    }

    /// 把解析结果补全到 `question_ids`
    ///
    /// 不在 `question_ids` 中的题号被丢弃，缺失的题号填入占位值。
    /// 返回补全后的结果和被丢弃的题号。
    pub fn totalize(mut parsed: BTreeMap<u32, String>, question_ids: &[u32]) -> (Self, Vec<u32>) {
        let mut answers = BTreeMap::new();
        for id in question_ids {
            let answer = parsed
                .remove(id)
                .unwrap_or_else(|| NO_ANSWER_PROVIDED.to_string());
            answers.insert(*id, answer);
        }
        let dropped = parsed.into_keys().collect();
        (Self { answers }, dropped)
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn get(&self, question_id: u32) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    /// 取作答，缺失时返回占位值
    pub fn answer_for(&self, question_id: u32) -> &str {
        self.get(question_id).unwrap_or(NO_ANSWER_PROVIDED)
    }

    pub fn question_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.answers.keys().copied()
    }

    /// 实际找到作答（非占位值）的题目数
    pub fn answered_count(&self) -> usize {
        self.answers
            .values()
            .filter(|a| a.as_str() != NO_ANSWER_PROVIDED)
            .count()
    }
}
