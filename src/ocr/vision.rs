//! Vision OCR engine: pdfium rasterisation + vision-LLM transcription.
//!
//! ```text
//! PDF bytes ──▶ render (pdfium, spawn_blocking) ──▶ PNG/base64 ──▶ VLM ──▶ clean ──▶ RecognizedPage
//! ```
//!
//! Pages are transcribed concurrently, bounded by `ocr_concurrency`, and
//! re-sorted into page order before the document is assembled. A single page
//! failure fails the whole recognition; the extractor never returns a
//! transcript with holes in it.

use crate::config::ServiceConfig;
use crate::error::ExtractionError;
use crate::ocr::{OcrEngine, RecognizedDocument, RecognizedPage};
use crate::pipeline::llm::{ChatBackend, ChatRequest, ProviderBackend, ProviderSource};
use crate::pipeline::postprocess::clean_transcription;
use crate::pipeline::render::{render_pdf_bytes, PdfiumLibrary};
use crate::prompts::TRANSCRIPTION_PROMPT;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use futures::stream::{self, StreamExt, TryStreamExt};
use image::DynamicImage;
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Transcription is copy work; keep sampling fully greedy.
const TRANSCRIPTION_TEMPERATURE: f32 = 0.0;

/// Output budget for one page transcription.
const TRANSCRIPTION_MAX_TOKENS: usize = 4096;

pub struct VisionOcrEngine {
    library: PdfiumLibrary,
    backend: Arc<dyn ChatBackend>,
    concurrency: usize,
    max_rendered_pixels: u32,
    password: Option<String>,
}

impl VisionOcrEngine {
    /// Build the engine from config: locate libpdfium, check it binds, and
    /// prepare (but do not yet resolve) the vision provider.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, ExtractionError> {
        let model = config.vision_model.as_str();
        let source = ProviderSource::from_parts(
            config.vision_provider.as_ref(),
            config
                .vision_provider_name
                .as_deref()
                .or(config.provider_name.as_deref()),
            model,
        );
        let backend = Arc::new(ProviderBackend::new(
            source,
            Duration::from_secs(config.api_timeout_secs),
        ));

        let library = PdfiumLibrary::locate(config.pdfium_lib_path.as_deref());
        let probe = library.clone();
        tokio::task::spawn_blocking(move || probe.bind().map(drop))
            .await
            .map_err(|e| ExtractionError::EngineInit(format!("pdfium probe panicked: {e}")))??;
        info!("Vision OCR engine ready (pdfium: {:?}, model: {})", library, model);

        Ok(Self::new(
            library,
            backend,
            config.ocr_concurrency,
            config.max_rendered_pixels,
            config.pdf_password.clone(),
        ))
    }

    pub fn new(
        library: PdfiumLibrary,
        backend: Arc<dyn ChatBackend>,
        concurrency: usize,
        max_rendered_pixels: u32,
        password: Option<String>,
    ) -> Self {
        Self {
            library,
            backend,
            concurrency: concurrency.max(1),
            max_rendered_pixels,
            password,
        }
    }

    async fn render(&self, pdf: &[u8]) -> Result<Vec<ImageData>, ExtractionError> {
        let library = self.library.clone();
        let bytes = pdf.to_vec();
        let password = self.password.clone();
        let max_pixels = self.max_rendered_pixels;

        tokio::task::spawn_blocking(move || -> Result<Vec<ImageData>, ExtractionError> {
            let pdfium = library.bind()?;
            let images = render_pdf_bytes(&pdfium, &bytes, password.as_deref(), max_pixels)?;
            images
                .iter()
                .enumerate()
                .map(|(idx, img)| {
                    encode_page(img).map_err(|e| ExtractionError::RasterisationFailed {
                        page: idx + 1,
                        detail: format!("Image encoding failed: {}", e),
                    })
                })
                .collect()
        })
        .await
        .map_err(|e| ExtractionError::Internal(format!("Render task panicked: {}", e)))?
    }

    async fn transcribe_page(
        &self,
        page_num: usize,
        image: ImageData,
    ) -> Result<(usize, RecognizedPage), ExtractionError> {
        let start = Instant::now();
        let request = ChatRequest {
            system: TRANSCRIPTION_PROMPT.to_string(),
            user: String::new(),
            images: vec![image],
            temperature: TRANSCRIPTION_TEMPERATURE,
            max_tokens: TRANSCRIPTION_MAX_TOKENS,
        };
        let reply = self.backend.chat(&request).await.map_err(|e| {
            ExtractionError::PageTranscriptionFailed {
                page: page_num,
                detail: e.to_string(),
            }
        })?;

        let page = RecognizedPage::from_plain_text(&clean_transcription(&reply.content));
        debug!(
            "Page {}: {} blocks, {} output tokens, {:?}",
            page_num,
            page.blocks.len(),
            reply.completion_tokens,
            start.elapsed()
        );
        Ok((page_num, page))
    }

    /// Transcribe `images` concurrently and reassemble them in page order.
    async fn transcribe_pages(
        &self,
        images: Vec<ImageData>,
    ) -> Result<RecognizedDocument, ExtractionError> {
        let mut pages: Vec<(usize, RecognizedPage)> = stream::iter(
            images
                .into_iter()
                .enumerate()
                .map(|(idx, image)| self.transcribe_page(idx + 1, image)),
        )
        .buffer_unordered(self.concurrency)
        .try_collect()
        .await?;

        pages.sort_by_key(|(page_num, _)| *page_num);
        Ok(RecognizedDocument {
            pages: pages.into_iter().map(|(_, page)| page).collect(),
        })
    }
}

#[async_trait]
impl OcrEngine for VisionOcrEngine {
    fn name(&self) -> &'static str {
        "vision"
    }

    async fn recognize(&self, pdf: &[u8]) -> Result<RecognizedDocument, ExtractionError> {
        let images = self.render(pdf).await?;
        info!("Rendered {} pages for transcription", images.len());
        self.transcribe_pages(images).await
    }
}

/// Encode a rasterised page as a base64 PNG for the vision API.
///
/// PNG keeps glyph edges crisp; `detail: "high"` lets GPT-4-class models tile
/// the full page instead of a single low-resolution overview.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(ImageData::new(STANDARD.encode(&buf), "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StructuringError;
    use crate::ocr::Transcript;
    use crate::pipeline::llm::ChatReply;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;

    struct ScriptedBackend {
        replies: Mutex<Vec<Result<String, String>>>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, StructuringError> {
            self.seen.lock().unwrap().push(request.clone());
            match self.replies.lock().unwrap().remove(0) {
                Ok(content) => Ok(ChatReply {
                    content,
                    ..Default::default()
                }),
                Err(message) => Err(StructuringError::LlmApiError { message }),
            }
        }
    }

    fn tiny_page() -> ImageData {
        encode_page(&DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            8,
            8,
            Rgba([255, 255, 255, 255]),
        )))
        .unwrap()
    }

    fn engine(replies: Vec<Result<String, String>>) -> (VisionOcrEngine, Arc<ScriptedBackend>) {
        let backend = Arc::new(ScriptedBackend {
            replies: Mutex::new(replies),
            seen: Mutex::new(Vec::new()),
        });
        let engine = VisionOcrEngine::new(PdfiumLibrary::System, backend.clone(), 1, 2000, None);
        (engine, backend)
    }

    /// Replies "PAGE n" for the n-th page image, holding page 1 back so it
    /// completes after every other page.
    struct SlowFirstPageBackend {
        pages: Vec<String>,
        completed: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ChatBackend for SlowFirstPageBackend {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, StructuringError> {
            let data = &request.images[0].data;
            let page = self.pages.iter().position(|p| p == data).unwrap() + 1;
            if page == 1 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.completed.lock().unwrap().push(page);
            Ok(ChatReply {
                content: format!("PAGE {page}"),
                ..Default::default()
            })
        }
    }

    fn sized_page(side: u32) -> ImageData {
        encode_page(&DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            side,
            side,
            Rgba([255, 255, 255, 255]),
        )))
        .unwrap()
    }

    #[tokio::test]
    async fn pages_keep_document_order_when_completed_out_of_order() {
        let images: Vec<ImageData> = (1..=4).map(sized_page).collect();
        let backend = Arc::new(SlowFirstPageBackend {
            pages: images.iter().map(|i| i.data.clone()).collect(),
            completed: Mutex::new(Vec::new()),
        });
        let engine = VisionOcrEngine::new(PdfiumLibrary::System, backend.clone(), 4, 2000, None);

        let doc = engine.transcribe_pages(images).await.unwrap();

        assert_eq!(backend.completed.lock().unwrap().last(), Some(&1));
        assert_eq!(
            Transcript::from_document(&doc).as_str(),
            "PAGE 1\nPAGE 2\nPAGE 3\nPAGE 4\n"
        );
    }

    #[tokio::test]
    async fn one_failed_page_fails_the_document() {
        let (engine, _) = engine(vec![Ok("PAGE 1".into()), Err("quota exceeded".into())]);
        let err = engine
            .transcribe_pages(vec![tiny_page(), tiny_page()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::PageTranscriptionFailed { page: 2, .. }
        ));
    }

    #[test]
    fn encode_small_image() {
        let data = tiny_page();
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert!(decoded.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn transcribe_page_parses_cleaned_reply() {
        let (engine, backend) = engine(vec![Ok(
            "```\nTAX INVOICE\nPage 1/1\n\nTotal  128033.00\n```".to_string()
        )]);

        let (num, page) = engine.transcribe_page(1, tiny_page()).await.unwrap();
        assert_eq!(num, 1);
        let doc = RecognizedDocument { pages: vec![page] };
        assert_eq!(
            Transcript::from_document(&doc).as_str(),
            "TAX INVOICE\nPage 1/1\nTotal 128033.00\n"
        );

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system, TRANSCRIPTION_PROMPT);
        assert_eq!(seen[0].images.len(), 1);
    }

    #[tokio::test]
    async fn failed_page_names_the_page() {
        let (engine, _) = engine(vec![Err("503 overloaded".to_string())]);
        let err = engine.transcribe_page(4, tiny_page()).await.unwrap_err();
        match err {
            ExtractionError::PageTranscriptionFailed { page, detail } => {
                assert_eq!(page, 4);
                assert!(detail.contains("503 overloaded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
