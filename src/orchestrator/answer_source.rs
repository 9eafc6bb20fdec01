//! 学生作答来源

use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// 学生作答来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSource {
    /// 带 `Question N:` 标记的文本文件
    LegacyText(PathBuf),
    /// 答题纸图片目录（`.png` / `.jpg`，按文件名排序）
    ImageDirectory(PathBuf),
}

impl AnswerSource {
    /// 根据路径类型判断来源，路径不存在时返回前置文件缺失错误
    pub fn resolve(path: &Path) -> AppResult<Self> {
        if path.is_dir() {
            Ok(AnswerSource::ImageDirectory(path.to_path_buf()))
        } else if path.is_file() {
            Ok(AnswerSource::LegacyText(path.to_path_buf()))
        } else {
            Err(AppError::prerequisite(
                "学生作答",
                path.display().to_string(),
                "请提供学生作答文本文件或答题纸图片目录",
            ))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            AnswerSource::LegacyText(path) | AnswerSource::ImageDirectory(path) => path,
        }
    }
}
