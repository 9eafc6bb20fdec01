//! 题目处理上下文
//!
//! 封装"我正在处理第几道题、题号是多少"这一信息

use std::fmt::Display;

/// 题目处理上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionCtx {
    /// 题号
    pub question_id: u32,

    /// 在题库中的位置（从1开始，仅用于日志显示）
    pub position: usize,

    /// 题目总数
    pub total: usize,
}

impl QuestionCtx {
    pub fn new(question_id: u32, position: usize, total: usize) -> Self {
        Self {
            question_id,
            position,
            total,
        }
    }
}

impl Display for QuestionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[题目 {}/{} 题号#{}]", self.position, self.total, self.question_id)
    }
}
