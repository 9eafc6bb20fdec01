//! 生成流水线 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责两个阶段的批量调度和文件读写。
//!
//! ## 核心功能
//!
//! 1. **标准答案阶段**：逐题生成标准答案，整体覆盖写出
//! 2. **分析阶段**：OCR/解析作答 → 对齐 → 逐题点评 → 整体覆盖写出分析文档
//! 3. **前置检查**：缺少题库、标准答案或作答来源时，在任何调用之前中止
//! 4. **限速**：每次 LLM 调用之后固定等待
//!
//! ## 失败策略
//!
//! - 对齐失败：本次不生成任何分析，旧的分析文档保持不变
//! - 某题没有标准答案：跳过该题并警告
//! - 中途崩溃没有断点，需要从头重跑该阶段

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{Config, PacingPolicy};
use crate::error::{AppError, AppResult};
use crate::models::answer::AlignedAnswers;
use crate::models::insight::InsightCorpus;
use crate::models::loaders;
use crate::models::question::{ModelAnswerSet, Question};
use crate::orchestrator::answer_source::AnswerSource;
use crate::services::answer_aligner::{self, AnswerAligner};
use crate::services::{InsightService, LlmService, ModelAnswerService, OcrExtractor, OpenAiModel};
use crate::utils::logging;
use crate::utils::truncate_text;
use crate::workflow::{InsightFlow, ProcessResult, QuestionCtx};

const MODEL_ANSWER_STAGE: &str = "生成标准答案";
const INSIGHT_STAGE: &str = "生成学生作答分析";

/// 分析阶段统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InsightStats {
    /// 写入分析文档的题目数
    pub generated: usize,
    /// 因没有标准答案而跳过的题目数
    pub skipped: usize,
    /// LLM 重试耗尽、点评为空的题目数
    pub empty_responses: usize,
}

/// 生成流水线
///
/// 持有配置和所有外部依赖，不使用任何全局状态。
pub struct Pipeline {
    config: Config,
    llm: Arc<LlmService>,
    ocr: OcrExtractor,
    pacing: PacingPolicy,
}

impl Pipeline {
    pub fn new(config: Config, llm: Arc<LlmService>, ocr: OcrExtractor, pacing: PacingPolicy) -> Self {
        Self {
            config,
            llm,
            ocr,
            pacing,
        }
    }

    /// 按配置创建真实的 LLM 与视觉 OCR 客户端
    pub fn from_config(config: Config) -> AppResult<Self> {
        let llm = Arc::new(LlmService::from_config(&config)?);
        let vision_model = OpenAiModel::with_model(&config, config.ocr_model_name.clone())?;
        let vision_llm = Arc::new(LlmService::new(Arc::new(vision_model), config.retry_policy()));
        let ocr = OcrExtractor::with_vision_model(vision_llm);
        let pacing = config.pacing_policy();
        Ok(Self::new(config, llm, ocr, pacing))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 第一阶段：生成标准答案并覆盖写出
    ///
    /// 单题失败记为空答案，阶段总会完成并写出文件。
    pub async fn generate_model_answers(&self) -> AppResult<ModelAnswerSet> {
        check_model_answer_inputs(&self.config)?;

        let questions = loaders::load_questions(&self.config.questions_path())?;
        logging::log_stage_start(MODEL_ANSWER_STAGE, questions.len());

        let service = ModelAnswerService::new(self.llm.clone());
        let mut answers = Vec::with_capacity(questions.len());
        for (index, question) in questions.iter().enumerate() {
            logging::log_question_start(question.id, index + 1, questions.len());
            answers.push(service.generate(question).await);
            self.pacing.pause().await;
        }

        let answers = ModelAnswerSet::new(answers);
        let output = self.config.model_answers_path();
        loaders::save_model_answers(&output, &answers)?;
        logging::log_stage_complete(MODEL_ANSWER_STAGE, &output);

        Ok(answers)
    }

    /// 第二阶段：生成学生作答分析并覆盖写出
    pub async fn generate_insights(&self, answer_source: &Path) -> AppResult<InsightStats> {
        // 前置检查，任何外部调用之前完成
        let source = check_insight_inputs(&self.config, answer_source)?;
        let questions_path = self.config.questions_path();
        let model_answers_path = self.config.model_answers_path();

        let questions = loaders::load_questions(&questions_path)?;
        let model_answers = loaders::load_model_answers(&model_answers_path)?;
        let unknown = model_answers.unknown_ids(&questions);
        if !unknown.is_empty() {
            warn!("⚠️ 标准答案中存在题库之外的题号，将被忽略: {:?}", unknown);
        }

        logging::log_stage_start(INSIGHT_STAGE, questions.len());

        let aligned = self.align_answers(&source, &questions).await?;
        if aligned.is_empty() && !questions.is_empty() {
            error!("❌ 答案对齐失败，中止分析阶段，不写入任何分析");
            return Err(AppError::AlignmentFailed);
        }

        let lookup = model_answers.by_question_id();
        let flow = InsightFlow::new(InsightService::new(self.llm.clone()));
        let mut corpus = InsightCorpus::new();
        let mut stats = InsightStats::default();

        for (index, question) in questions.iter().enumerate() {
            logging::log_question_start(question.id, index + 1, questions.len());
            let ctx = QuestionCtx::new(question.id, index + 1, questions.len());

            match flow.run(question, &ctx, &lookup, &aligned).await {
                ProcessResult::Generated(record) => {
                    if record.critique.is_empty() {
                        stats.empty_responses += 1;
                    }
                    stats.generated += 1;
                    corpus.push(record);
                    self.pacing.pause().await;
                }
                ProcessResult::Skipped => {
                    stats.skipped += 1;
                }
            }
        }

        let output = self.config.insights_path();
        loaders::write_corpus(&output, &corpus)?;
        log_insight_stats(&stats, questions.len());
        logging::log_stage_complete(INSIGHT_STAGE, &output);

        Ok(stats)
    }

    /// 两个阶段依次执行
    ///
    /// 作答来源在第一阶段之前检查，避免白白生成标准答案。
    pub async fn generate_all(&self, answer_source: &Path) -> AppResult<InsightStats> {
        info!("--- 依次执行全部生成步骤 ---");
        check_all_inputs(&self.config, answer_source)?;
        self.generate_model_answers().await?;
        let stats = self.generate_insights(answer_source).await?;
        info!("--- 全部生成步骤完成 ---");
        Ok(stats)
    }

    async fn align_answers(&self, source: &AnswerSource, questions: &[Question]) -> AppResult<AlignedAnswers> {
        let question_ids: Vec<u32> = questions.iter().map(|q| q.id).collect();

        match source {
            AnswerSource::LegacyText(path) => {
                info!("📄 读取学生作答文本: {}", path.display());
                let text = std::fs::read_to_string(path)
                    .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
                Ok(answer_aligner::align_labeled(&text, &question_ids))
            }
            AnswerSource::ImageDirectory(dir) => {
                let raw_text = self.ocr.extract_sheet(dir).await?;
                info!(
                    "✓ OCR 完成，共 {} 字符: {}",
                    raw_text.chars().count(),
                    truncate_text(raw_text.trim(), 80)
                );
                let aligner = AnswerAligner::new(self.llm.clone());
                Ok(aligner.align(&raw_text, &question_ids).await)
            }
        }
    }

}

/// 标准答案阶段的前置检查
pub fn check_model_answer_inputs(config: &Config) -> AppResult<()> {
    require_file(&config.questions_path(), "题库文件", "请检查数据目录或 QUESTIONS_FILE 配置")
}

/// 分析阶段的前置检查，返回解析出的作答来源
pub fn check_insight_inputs(config: &Config, answer_source: &Path) -> AppResult<AnswerSource> {
    check_model_answer_inputs(config)?;
    require_file(
        &config.model_answers_path(),
        "标准答案文件",
        "请先运行 generate-model-answers 命令生成标准答案",
    )?;
    AnswerSource::resolve(answer_source)
}

/// 全部步骤的前置检查，标准答案由第一阶段生成
pub fn check_all_inputs(config: &Config, answer_source: &Path) -> AppResult<()> {
    check_model_answer_inputs(config)?;
    AnswerSource::resolve(answer_source).map(|_| ())
}

fn require_file(path: &Path, what: &str, hint: &str) -> AppResult<()> {
    if path.is_file() {
        return Ok(());
    }
    error!("❌ 错误: 未找到{}: {}", what, path.display());
    error!("{}", hint);
    Err(AppError::prerequisite(what, path.display().to_string(), hint))
}

fn log_insight_stats(stats: &InsightStats, total: usize) {
    info!(
        generated = stats.generated,
        skipped = stats.skipped,
        empty = stats.empty_responses,
        "题目统计: 生成 {}, 跳过 {}, 点评为空 {}, 总计 {}",
        stats.generated,
        stats.skipped,
        stats.empty_responses,
        total
    );
}
