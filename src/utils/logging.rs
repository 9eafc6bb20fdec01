/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs;
use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, AppResult};

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug 或 info 级别。
/// 重复调用不会报错（测试中会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: impl AsRef<Path>) -> AppResult<()> {
    let path = log_file_path.as_ref();
    let log_header = format!(
        "{}\n答卷分析日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(path, log_header).map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
}

/// 记录阶段开始
pub fn log_stage_start(stage: &str, total: usize) {
    info!("{}", "=".repeat(60));
    info!(stage, total, "🚀 开始: {}（共 {} 道题）", stage, total);
    info!("{}", "=".repeat(60));
}

/// 记录阶段完成
pub fn log_stage_complete(stage: &str, output: &Path) {
    info!("\n{}", "─".repeat(60));
    info!(stage, output = %output.display(), "✅ {} 完成，已保存至 {}", stage, output.display());
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "─".repeat(60));
}

/// 记录题目开始
pub fn log_question_start(question_id: u32, position: usize, total: usize) {
    info!("\n{}", "─".repeat(30));
    info!(question_id, "处理第 {}/{} 道题目 (题号 {})", position, total, question_id);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
