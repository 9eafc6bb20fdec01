/// 分析块标题上下的分隔线宽度
pub const BANNER_WIDTH: usize = 50;

/// 单道题的分析
#[derive(Debug, Clone, PartialEq)]
pub struct InsightRecord {
    pub question_id: u32,
    pub question_text: String,
    /// LLM 给出的点评原文
    pub critique: String,
}

impl InsightRecord {
    pub fn new(question_id: u32, question_text: impl Into<String>, critique: impl Into<String>) -> Self {
        Self {
            question_id,
            question_text: question_text.into(),
            critique: critique.into(),
        }
    }

    /// 带分隔线标题的文本块
    pub fn render(&self) -> String {
        let banner = "=".repeat(BANNER_WIDTH);
        format!(
            "\n{banner}\nAnalysis for Question {}: {}\n{banner}\n{}\n",
            self.question_id, self.question_text, self.critique
        )
    }
}

/// 最终的分析文档，供检索/对话组件索引
///
/// 按题库顺序拼接，被跳过的题目不出现。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsightCorpus {
    records: Vec<InsightRecord>,
}

impl InsightCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: InsightRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[InsightRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn render(&self) -> String {
        self.records.iter().map(InsightRecord::render).collect()
    }
}
