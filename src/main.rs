use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use exam_insight::utils::logging;
use exam_insight::orchestrator::{check_all_inputs, check_insight_inputs, check_model_answer_inputs};
use exam_insight::{Config, Pipeline};
use tracing::error;

const USAGE: &str = "\
用法: exam_insight <命令> [作答来源]

命令:
  generate-model-answers            第一步：只生成标准答案
  generate-insights [作答来源]      第二步：只生成学生作答分析
  generate-all [作答来源]           依次执行以上两步

作答来源可以是带 `Question N:` 标记的文本文件，或答题纸图片目录；
省略时使用 <data_dir>/student_answer.txt。";

/// 解析后的命令
enum Command {
    ModelAnswers,
    Insights(Option<PathBuf>),
    All(Option<PathBuf>),
}

fn parse_command(args: &[String]) -> Option<Command> {
    let source = args.get(2).map(PathBuf::from);
    match args.get(1)?.to_lowercase().as_str() {
        "generate-model-answers" | "generate-answers" => Some(Command::ModelAnswers),
        "generate-insights" => Some(Command::Insights(source)),
        "generate-all" => Some(Command::All(source)),
        _ => None,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let Some(command) = parse_command(&args) else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };

    // 加载配置
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ 配置加载失败: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    match run(command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> Result<()> {
    let default_source = config.default_answer_source();

    // 输入文件检查在创建 LLM 客户端之前完成
    match &command {
        Command::ModelAnswers => check_model_answer_inputs(&config)?,
        Command::Insights(source) => {
            check_insight_inputs(&config, source.as_deref().unwrap_or(default_source.as_path()))?;
        }
        Command::All(source) => check_all_inputs(&config, source.as_deref().unwrap_or(default_source.as_path()))?,
    }

    logging::init_log_file(&config.output_log_file)?;
    let pipeline = Pipeline::from_config(config)?;

    match command {
        Command::ModelAnswers => {
            pipeline.generate_model_answers().await?;
        }
        Command::Insights(source) => {
            pipeline
                .generate_insights(&source.unwrap_or(default_source))
                .await?;
        }
        Command::All(source) => {
            pipeline.generate_all(&source.unwrap_or(default_source)).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_insight::AppError;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_commands_and_optional_source() {
        assert!(matches!(
            parse_command(&args(&["exam_insight", "generate-answers"])),
            Some(Command::ModelAnswers)
        ));
        assert!(matches!(
            parse_command(&args(&["exam_insight", "Generate-Insights", "sheets/"])),
            Some(Command::Insights(Some(p))) if p == PathBuf::from("sheets/")
        ));
        assert!(matches!(
            parse_command(&args(&["exam_insight", "generate-all"])),
            Some(Command::All(None))
        ));
        assert!(parse_command(&args(&["exam_insight", "chat"])).is_none());
        assert!(parse_command(&args(&["exam_insight"])).is_none());
    }

    #[test]
    fn missing_model_answers_reported_before_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_string_lossy().to_string(),
            llm_api_key: String::new(),
            ..Config::default()
        };
        std::fs::write(config.questions_path(), "[]").unwrap();
        std::fs::write(config.default_answer_source(), "Question 1: a").unwrap();

        let err = tokio_test::block_on(run(Command::Insights(None), config)).unwrap_err();
        match err.downcast_ref::<AppError>() {
            Some(AppError::Prerequisite { hint, .. }) => assert!(hint.contains("generate-model-answers")),
            other => panic!("意外的错误: {other:?}"),
        }
    }
}
