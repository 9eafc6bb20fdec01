//! OCR 服务 - 业务能力层
//!
//! 只负责"答题纸图片 → 文本"能力
//!
//! 流程：预处理（灰度 + Otsu 二值化 + 3x3 中值去噪）→ OCR 引擎识别。
//! 单页失败只影响该页，返回空文本，不中止整份答卷。

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult, FileError, OcrError};
use crate::services::llm_service::LlmService;
use crate::utils::truncate_text;

/// 页与页之间插入的分隔标记
pub const PAGE_BREAK: &str = "\n\n--- PAGE BREAK ---\n\n";

/// 支持的答题纸图片扩展名
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// 图片预处理
pub trait ImagePreprocessor: Send + Sync {
    fn preprocess(&self, image: DynamicImage) -> GrayImage;
}

/// 灰度 + 自动阈值二值化 + 中值去噪
#[derive(Debug, Default, Clone, Copy)]
pub struct BinarizePreprocessor;

impl ImagePreprocessor for BinarizePreprocessor {
    fn preprocess(&self, image: DynamicImage) -> GrayImage {
        let gray = image.to_luma8();
        let threshold = otsu_threshold(&gray);
        let binary = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            if gray.get_pixel(x, y)[0] > threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        median_filter_3x3(&binary)
    }
}

/// Otsu 法求类间方差最大的阈值
pub fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }
    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, count)| level as f64 * *count as f64)
        .sum();

    let mut sum_background = 0.0;
    let mut weight_background = 0u64;
    let mut best_threshold = 0u8;
    let mut best_variance = 0.0;

    for (level, count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0 {
            break;
        }
        sum_background += level as f64 * *count as f64;

        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_all - sum_background) / weight_foreground as f64;
        let diff = mean_background - mean_foreground;
        let variance = weight_background as f64 * weight_foreground as f64 * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_threshold = level as u8;
        }
    }

    best_threshold
}

/// 3x3 中值滤波，边界按最近像素补齐
pub fn median_filter_3x3(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let mut window = [0u8; 9];
        let mut i = 0;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let nx = (x as i64 + dx).clamp(0, width as i64 - 1) as u32;
                let ny = (y as i64 + dy).clamp(0, height as i64 - 1) as u32;
                window[i] = image.get_pixel(nx, ny)[0];
                i += 1;
            }
        }
        window.sort_unstable();
        Luma([window[4]])
    })
}

/// OCR 引擎
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// 识别已预处理的页面
    async fn recognize(&self, page: &GrayImage) -> AppResult<String>;
}

const OCR_PROMPT: &str = "\
You are an OCR engine. Transcribe every piece of handwritten or printed text on this answer sheet page exactly as written.

Rules:
- Preserve the original wording, spelling mistakes, numbering and line breaks.
- Do NOT correct, summarize, translate or add anything.
- Output only the transcribed text, with no commentary. If the page is blank, output nothing.";

/// 使用视觉模型做 OCR
pub struct VisionOcrEngine {
    llm: Arc<LlmService>,
}

impl VisionOcrEngine {
    pub fn new(llm: Arc<LlmService>) -> Self {
        Self { llm }
    }

    /// 编码为 PNG data URL
    fn to_data_url(page: &GrayImage) -> AppResult<String> {
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(page.clone())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(OcrError::ImageEncodeFailed)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        Ok(format!("data:image/png;base64,{}", encoded))
    }
}

#[async_trait]
impl OcrEngine for VisionOcrEngine {
    async fn recognize(&self, page: &GrayImage) -> AppResult<String> {
        let data_url = Self::to_data_url(page)?;
        let images = [data_url];
        let text = self.llm.complete_with_images(OCR_PROMPT, Some(&images)).await;
        if text.is_empty() {
            return Err(OcrError::EngineReturnedNothing {
                width: page.width(),
                height: page.height(),
            }
            .into());
        }
        Ok(text)
    }
}

/// OCR 提取器
///
/// 职责：
/// - 单页图片 → 文本，失败返回空字符串
/// - 整份答卷（目录）→ 按文件名排序后拼接的文本
pub struct OcrExtractor {
    preprocessor: Box<dyn ImagePreprocessor>,
    engine: Arc<dyn OcrEngine>,
}

impl OcrExtractor {
    pub fn new(preprocessor: Box<dyn ImagePreprocessor>, engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            preprocessor,
            engine,
        }
    }

    /// 默认预处理 + 视觉模型
    pub fn with_vision_model(llm: Arc<LlmService>) -> Self {
        Self::new(Box::new(BinarizePreprocessor), Arc::new(VisionOcrEngine::new(llm)))
    }

    /// 提取单页文本
    pub async fn extract(&self, image_path: &Path) -> String {
        match self.try_extract(image_path).await {
            Ok(text) => {
                debug!(
                    "OCR 完成 {}: {}",
                    image_path.display(),
                    truncate_text(&text, 80)
                );
                text
            }
            Err(AppError::File(FileError::NotFound { path })) => {
                error!("错误: 文件不存在: {}", path);
                String::new()
            }
            Err(e) => {
                error!("OCR 处理 {} 时出错: {}", image_path.display(), e);
                String::new()
            }
        }
    }

    async fn try_extract(&self, image_path: &Path) -> AppResult<String> {
        if !image_path.is_file() {
            return Err(FileError::NotFound {
                path: image_path.display().to_string(),
            }
            .into());
        }
        let image = image::open(image_path).map_err(|source| OcrError::ImageDecodeFailed {
            path: image_path.display().to_string(),
            source,
        })?;
        let cleaned = self.preprocessor.preprocess(image);
        self.engine.recognize(&cleaned).await
    }

    /// 提取整份答卷，页之间插入 [`PAGE_BREAK`]
    ///
    /// 目录不存在时报错；无法识别的页贡献空文本。
    pub async fn extract_sheet(&self, dir: &Path) -> AppResult<String> {
        let pages = list_page_images(dir)?;
        info!("📄 找到 {} 页答题纸: {}", pages.len(), dir.display());

        let mut texts = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            info!("🔍 正在识别第 {}/{} 页: {}", index + 1, pages.len(), page.display());
            let text = self.extract(page).await;
            if text.is_empty() {
                warn!("⚠️ 第 {} 页没有识别出文本", index + 1);
            }
            texts.push(text);
        }

        Ok(texts.join(PAGE_BREAK))
    }
}

/// 按文件名字典序列出目录下的答题纸图片
pub fn list_page_images(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FileError::DirectoryNotFound {
            path: dir.display().to_string(),
        }
        .into());
    }

    let entries =
        std::fs::read_dir(dir).map_err(|e| AppError::file_read_failed(dir.display().to_string(), e))?;

    let mut pages = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| AppError::file_read_failed(dir.display().to_string(), e))?
            .path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_image {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages)
}
