//! 题库、标准答案和分析文档的读写
//!
//! 写入先落到同目录的临时文件，再整体替换目标文件，
//! 读者要么看到旧文件，要么看到完整的新文件。

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, FileError};
use crate::models::insight::InsightCorpus;
use crate::models::question::{ModelAnswerSet, Question};

/// 加载题库
///
/// 题号必须唯一。
pub fn load_questions(path: &Path) -> AppResult<Vec<Question>> {
    let questions: Vec<Question> = read_json(path)?;
    let mut seen = HashSet::with_capacity(questions.len());
    if let Some(dup) = questions.iter().find(|q| !seen.insert(q.id)) {
        return Err(FileError::DuplicateQuestionId {
            path: path.display().to_string(),
            id: dup.id,
        }
        .into());
    }
    info!("✓ 已加载 {} 道题目: {}", questions.len(), path.display());
    Ok(questions)
}

/// 加载标准答案
pub fn load_model_answers(path: &Path) -> AppResult<ModelAnswerSet> {
    let answers: ModelAnswerSet = read_json(path)?;
    info!("✓ 已加载 {} 条标准答案: {}", answers.len(), path.display());
    Ok(answers)
}

/// 保存标准答案，覆盖已有文件
pub fn save_model_answers(path: &Path, answers: &ModelAnswerSet) -> AppResult<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(answers, &mut ser)
        .map_err(|e| AppError::json_parse_failed(path.display().to_string(), e))?;
    write_atomic(path, &buf)
}

/// 写入分析文档，覆盖已有文件
pub fn write_corpus(path: &Path, corpus: &InsightCorpus) -> AppResult<()> {
    write_atomic(path, corpus.render().as_bytes())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> AppResult<T> {
    if !path.exists() {
        return Err(FileError::NotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
    serde_json::from_str(&content).map_err(|e| AppError::json_parse_failed(path.display().to_string(), e))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let shown = path.display().to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| AppError::file_write_failed(&shown, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| AppError::file_write_failed(&shown, e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| AppError::file_write_failed(&shown, e))?;
    tmp.persist(path)
        .map_err(|e| AppError::file_write_failed(&shown, e.error))?;

    debug!("已写入 {} 字节: {}", bytes.len(), shown);
    Ok(())
}
