//! 集成测试共用的假模型和数据目录

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use exam_insight::error::AppResult;
use exam_insight::services::{BinarizePreprocessor, LlmService, OcrEngine, OcrExtractor, TextModel};
use exam_insight::{Config, PacingPolicy, Pipeline, RetryPolicy};
use image::GrayImage;
use tempfile::TempDir;

/// 按 prompt 类型回复的假模型，记录所有 prompt
pub struct RoutedModel {
    alignment_reply: String,
    fail_model_answers_for: Vec<u32>,
    prompts: Mutex<Vec<String>>,
}

impl RoutedModel {
    pub fn new(alignment_reply: impl Into<String>) -> Arc<Self> {
        Self::failing_model_answers(alignment_reply, Vec::new())
    }

    /// 对指定题号的标准答案请求返回错误
    pub fn failing_model_answers(alignment_reply: impl Into<String>, ids: Vec<u32>) -> Arc<Self> {
        Arc::new(Self {
            alignment_reply: alignment_reply.into(),
            fail_model_answers_for: ids,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn count(&self, marker: &str) -> usize {
        self.prompts().iter().filter(|p| p.contains(marker)).count()
    }
}

pub const ALIGN_MARKER: &str = "text structuring expert";
pub const MODEL_ANSWER_MARKER: &str = "Chief Examiner";
pub const INSIGHT_MARKER: &str = "Teaching Assistant";

#[async_trait]
impl TextModel for RoutedModel {
    fn name(&self) -> &str {
        "routed"
    }

    async fn generate(&self, prompt: &str, _images: Option<&[String]>) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if prompt.contains(ALIGN_MARKER) {
            return Ok(self.alignment_reply.clone());
        }
        if prompt.contains(MODEL_ANSWER_MARKER) {
            for id in &self.fail_model_answers_for {
                if prompt.contains(&format!("\"Question text {}\"", id)) {
                    anyhow::bail!("quota exceeded");
                }
            }
            return Ok("MODEL ANSWER".to_string());
        }
        if prompt.contains(INSIGHT_MARKER) {
            let question = prompt
                .lines()
                .find(|l| l.starts_with("**Question:**"))
                .unwrap_or("")
                .to_string();
            return Ok(format!("CRITIQUE for {}", question));
        }
        anyhow::bail!("unexpected prompt")
    }
}

/// 每页返回固定文本的 OCR 引擎
pub struct FixedOcr(pub String);

#[async_trait]
impl OcrEngine for FixedOcr {
    async fn recognize(&self, _page: &GrayImage) -> AppResult<String> {
        Ok(self.0.clone())
    }
}

/// 临时数据目录
pub struct Workspace {
    pub dir: TempDir,
    pub config: Config,
}

impl Workspace {
    /// 写入题库，题干为 `Question text <id>`
    pub fn with_questions(ids: &[u32]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_string_lossy().to_string(),
            ..Config::default()
        };
        let questions: Vec<_> = ids
            .iter()
            .map(|id| serde_json::json!({"id": id, "question": format!("Question text {}", id), "max_marks": 10}))
            .collect();
        std::fs::write(config.questions_path(), serde_json::to_string(&questions).unwrap()).unwrap();
        Self { dir, config }
    }

    pub fn write_model_answers(&self, ids: &[u32]) {
        let answers: Vec<_> = ids
            .iter()
            .map(|id| serde_json::json!({"question_id": id, "model_answer": format!("Model answer {}", id)}))
            .collect();
        std::fs::write(self.config.model_answers_path(), serde_json::to_string(&answers).unwrap()).unwrap();
    }

    /// 建一个只有一页的答题纸目录
    pub fn answer_sheet_dir(&self) -> PathBuf {
        let sheet = self.dir.path().join("sheet");
        std::fs::create_dir_all(&sheet).unwrap();
        GrayImage::from_pixel(6, 6, image::Luma([200])).save(sheet.join("page1.png")).unwrap();
        sheet
    }

    pub fn write_text_answers(&self, text: &str) -> PathBuf {
        let path = self.config.default_answer_source();
        std::fs::write(&path, text).unwrap();
        path
    }

    pub fn pipeline(&self, model: Arc<RoutedModel>, pacing: PacingPolicy) -> Pipeline {
        let llm = Arc::new(LlmService::new(model, RetryPolicy::immediate(3)));
        let ocr = OcrExtractor::new(
            Box::new(BinarizePreprocessor),
            Arc::new(FixedOcr("Q1: Ans1".to_string())),
        );
        Pipeline::new(self.config.clone(), llm, ocr, pacing)
    }

    pub fn insights(&self) -> Option<String> {
        std::fs::read_to_string(self.config.insights_path()).ok()
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
