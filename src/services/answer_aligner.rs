//! 答案对齐服务 - 业务能力层
//!
//! 只负责"把一整份作答文本切分到各个题号"能力
//!
//! 两种来源：
//! - OCR 文本：交给 LLM 切分，要求返回 `{"<题号>": "<原文>"}` 形式的 JSON
//! - 旧版文本文件：按 `Question N:` 标记直接切分，不调用 LLM
//!
//! LLM 响应解析失败时返回空结果，这是整个分析阶段的中止信号，不做部分提取。

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use crate::error::AlignError;
use crate::models::answer::{AlignedAnswers, NO_ANSWER_PROVIDED};
use crate::services::llm_service::LlmService;

const FENCE: &str = "```";

/// 答案对齐服务
///
/// 职责：
/// - 构建切分 prompt 并调用 LLM
/// - 严格解析 LLM 返回的 JSON
/// - 把结果补全到题库的全部题号
pub struct AnswerAligner {
    llm: Arc<LlmService>,
}

impl AnswerAligner {
    pub fn new(llm: Arc<LlmService>) -> Self {
        Self { llm }
    }

    /// 对齐 OCR 文本
    ///
    /// 成功时返回的题号集合与 `question_ids` 完全一致；失败时返回空结果。
    pub async fn align(&self, raw_text: &str, question_ids: &[u32]) -> AlignedAnswers {
        if question_ids.is_empty() {
            warn!("⚠️ 题号列表为空，跳过答案对齐");
            return AlignedAnswers::empty();
        }

        info!("🧠 使用 LLM 切分学生作答...");
        let prompt = build_alignment_prompt(raw_text, question_ids);
        let response = self.llm.complete(&prompt).await;
        debug!("LLM 对齐原始响应:\n{}", response);

        match parse_alignment(&response) {
            Ok(parsed) => {
                let (aligned, dropped) = AlignedAnswers::totalize(parsed, question_ids);
                if !dropped.is_empty() {
                    debug!("丢弃题库之外的题号: {:?}", dropped);
                }
                info!(
                    "✓ 答案对齐成功: {}/{} 道题找到作答",
                    aligned.answered_count(),
                    aligned.len()
                );
                aligned
            }
            Err(e) => {
                error!("❌ 无法解析 LLM 对齐响应: {}", e);
                error!("   LLM 响应为: {}", response);
                AlignedAnswers::empty()
            }
        }
    }
}

/// 构建切分 prompt
pub fn build_alignment_prompt(raw_text: &str, question_ids: &[u32]) -> String {
    let id_list = question_ids
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a text structuring expert. Your task is to analyze the raw, unstructured text from a student's answer sheet and map the answers to the correct question numbers.

**Instructions:**
1.  Read the provided "Raw Text from Answer Sheet".
2.  The official question numbers are: [{id_list}].
3.  Your job is to intelligently associate the text with the correct question number. Students may label questions inconsistently or answer them out of order.
4.  Structure your final output as a single, valid JSON object whose keys are the question numbers as strings and whose values are the answers as strings.
5.  If you cannot find an answer for a specific question, the value for that key should be "{NO_ANSWER_PROVIDED}".

**CRITICAL RULE:** You MUST NOT alter, correct, add to, or summarize the student's original text. Your only job is to copy the existing text verbatim into the correct JSON value. The integrity of the student's answer is paramount.

**Example Output Format:**
{{
  "1": "This is the complete answer for question 1...",
  "2": "This is the answer for question 2...",
  "3": "{NO_ANSWER_PROVIDED}"
}}

---
**Raw Text from Answer Sheet:**
"{raw_text}"
---

Now, provide the structured JSON object and nothing else."#
    )
}

/// 取出第一对代码块标记之间的内容
///
/// 只有响应以代码块开头，或某一行以代码块标记开头时才视为代码块；
/// 否则原样返回。紧跟开头标记的语言标记（如 `json`）会被去掉，不要求换行。
pub fn strip_code_fence(response: &str) -> Result<&str, AlignError> {
    let trimmed = response.trim();
    let Some(open) = opening_fence(trimmed) else {
        return Ok(trimmed);
    };
    let after_open = &trimmed[open + FENCE.len()..];
    let tag_len = after_open
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(after_open.len());
    let body = &after_open[tag_len..];
    let close = body.find(FENCE).ok_or(AlignError::UnterminatedFence)?;
    Ok(body[..close].trim())
}

/// 开头代码块标记的位置：响应开头，或某一行的行首（允许缩进）
fn opening_fence(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        if line[indent..].starts_with(FENCE) {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// 严格解析对齐响应
///
/// 先把整个响应当作 JSON 解析，失败时再尝试取出代码块内容。
/// 结构必须是 `{"<整数>": "<字符串>", ...}`，任何偏差都返回错误。
pub fn parse_alignment(response: &str) -> Result<BTreeMap<u32, String>, AlignError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(AlignError::EmptyResponse);
    }
    let value: JsonValue = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(e) if opening_fence(trimmed).is_none() => return Err(AlignError::InvalidJson(e)),
        Err(_) => serde_json::from_str(strip_code_fence(trimmed)?).map_err(AlignError::InvalidJson)?,
    };
    let JsonValue::Object(object) = value else {
        return Err(AlignError::NotAnObject);
    };

    let mut parsed = BTreeMap::new();
    for (key, value) in object {
        let id: u32 = key
            .trim()
            .parse()
            .map_err(|_| AlignError::NonIntegerKey(key.clone()))?;
        let JsonValue::String(answer) = value else {
            return Err(AlignError::NonStringValue(id));
        };
        parsed.insert(id, answer);
    }
    Ok(parsed)
}

fn question_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"Question (\d+):").expect("静态正则表达式"))
}

/// 按 `Question N:` 标记切分旧版文本作答
///
/// 标记之前的内容被忽略；同一题号出现多次时以最后一次为准。
pub fn parse_labeled_answers(text: &str) -> BTreeMap<u32, String> {
    let marker = question_marker();
    let matches: Vec<_> = marker.captures_iter(text).collect();

    let mut parsed = BTreeMap::new();
    for (i, caps) in matches.iter().enumerate() {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let body_end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let Ok(id) = caps[1].parse::<u32>() else {
            warn!("⚠️ 题号超出范围，忽略: {}", &caps[1]);
            continue;
        };
        parsed.insert(id, text[whole.end()..body_end].trim().to_string());
    }
    parsed
}

/// 对齐旧版文本作答（不调用 LLM）
pub fn align_labeled(text: &str, question_ids: &[u32]) -> AlignedAnswers {
    let (aligned, dropped) = AlignedAnswers::totalize(parse_labeled_answers(text), question_ids);
    if !dropped.is_empty() {
        warn!("⚠️ 作答中出现题库之外的题号: {:?}", dropped);
    }
    info!(
        "✓ 学生作答解析完成: {}/{} 道题找到作答",
        aligned.answered_count(),
        aligned.len()
    );
    aligned
}
