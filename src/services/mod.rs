pub mod answer_aligner;
pub mod insight_service;
pub mod llm_service;
pub mod model_answer_service;
pub mod ocr_service;

pub use answer_aligner::AnswerAligner;
pub use insight_service::InsightService;
pub use llm_service::{LlmService, OpenAiModel, TextModel};
pub use model_answer_service::ModelAnswerService;
pub use ocr_service::{BinarizePreprocessor, ImagePreprocessor, OcrEngine, OcrExtractor, VisionOcrEngine};
