//! Page rasterisation and normalisation.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread, preventing the Tokio worker threads from stalling during CPU-heavy
//! rendering.
//!
//! ## Normalisation order
//!
//! Each page goes through a fixed sequence: render at the configured density,
//! grayscale, crop the scan margin, cap the longer side (Lanczos3, aspect
//! ratio preserved), JPEG-encode at the configured quality. Grayscale before
//! crop keeps the crop cheap; the dimension cap runs after crop so the cap
//! applies to the content that is actually sent.
//!
//! Rendered images live only for one batch: the caller drops the returned
//! `Vec<PageImage>` before the next batch starts, so memory stays bounded
//! per batch even for documents spanning hundreds of pages.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::planner::PageRange;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage};
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One normalised page image, ready for model input.
///
/// Ephemeral: lives for the duration of one batch, then released.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-indexed page number this image was rendered from.
    pub page: u32,
    /// Encoded image bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub media_type: &'static str,
}

/// Knobs for the per-page normalisation pipeline.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub dpi: u32,
    pub max_dim: u32,
    pub crop_margin_px: u32,
    pub jpeg_quality: u8,
}

impl From<&ExtractionConfig> for RenderOptions {
    fn from(c: &ExtractionConfig) -> Self {
        Self {
            dpi: c.render_dpi,
            max_dim: c.max_image_dim,
            crop_margin_px: c.crop_margin_px,
            jpeg_quality: c.jpeg_quality,
        }
    }
}

/// Rasterisation collaborator: page counting and range rendering.
///
/// The pdfium-backed implementation is [`PdfiumRasterizer`]; tests substitute
/// a synthetic implementation so no native library is needed.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Total page count of the document.
    async fn page_count(&self, document: &Path) -> Result<u32, ExtractError>;

    /// Render the pages of `range` to normalised images, ascending order.
    async fn rasterize_range(
        &self,
        document: &Path,
        range: PageRange,
    ) -> Result<Vec<PageImage>, ExtractError>;
}

/// pdfium-backed [`Rasterizer`].
pub struct PdfiumRasterizer {
    options: RenderOptions,
}

impl PdfiumRasterizer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Rasterizer for PdfiumRasterizer {
    async fn page_count(&self, document: &Path) -> Result<u32, ExtractError> {
        let path = document.to_path_buf();
        tokio::task::spawn_blocking(move || page_count_blocking(&path))
            .await
            .map_err(|e| ExtractError::Internal(format!("Page-count task panicked: {e}")))?
    }

    async fn rasterize_range(
        &self,
        document: &Path,
        range: PageRange,
    ) -> Result<Vec<PageImage>, ExtractError> {
        let path: PathBuf = document.to_path_buf();
        let options = self.options;
        tokio::task::spawn_blocking(move || rasterize_range_blocking(&path, range, options))
            .await
            .map_err(|e| ExtractError::Internal(format!("Render task panicked: {e}")))?
    }
}

fn open_document<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, ExtractError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ExtractError::DocumentInfo {
            detail: format!("{e:?}"),
        })
}

fn page_count_blocking(path: &Path) -> Result<u32, ExtractError> {
    let pdfium = Pdfium::default();
    let document = open_document(&pdfium, path)?;
    let total = document.pages().len() as u32;
    if total == 0 {
        return Err(ExtractError::DocumentInfo {
            detail: "document has no pages".to_string(),
        });
    }
    debug!("Document has {total} pages");
    Ok(total)
}

fn rasterize_range_blocking(
    path: &Path,
    range: PageRange,
    options: RenderOptions,
) -> Result<Vec<PageImage>, ExtractError> {
    let pdfium = Pdfium::default();
    let document = open_document(&pdfium, path)?;
    let pages = document.pages();
    let total = pages.len() as u32;

    let mut images = Vec::with_capacity(range.width() as usize);

    for page_num in range.pages() {
        if page_num > total {
            return Err(ExtractError::Rasterization {
                page: page_num,
                detail: format!("page out of range (document has {total} pages)"),
            });
        }

        let page = pages
            .get((page_num - 1) as u16)
            .map_err(|e| ExtractError::Rasterization {
                page: page_num,
                detail: format!("{e:?}"),
            })?;

        // Target width from the page's physical size and the configured
        // density; pdfium scales height proportionally.
        let target_width = (page.width().value * options.dpi as f32 / 72.0).round() as i32;
        let render_config = PdfRenderConfig::new().set_target_width(target_width.max(1));

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ExtractError::Rasterization {
                page: page_num,
                detail: format!("{e:?}"),
            })?;

        let raw = bitmap.as_image();
        let bytes = normalize_page(&raw, &options).map_err(|e| ExtractError::Rasterization {
            page: page_num,
            detail: format!("normalisation failed: {e}"),
        })?;

        debug!(
            "Rendered page {page_num}: {}x{} px → {} JPEG bytes",
            raw.width(),
            raw.height(),
            bytes.len()
        );

        images.push(PageImage {
            page: page_num,
            bytes,
            media_type: "image/jpeg",
        });
    }

    Ok(images)
}

/// Normalise one rendered page: grayscale → margin crop → dimension cap →
/// JPEG encode.
///
/// The dimension cap guarantees the longer side never exceeds
/// `options.max_dim` and preserves aspect ratio within rounding error.
pub fn normalize_page(
    img: &DynamicImage,
    options: &RenderOptions,
) -> Result<Vec<u8>, image::ImageError> {
    let gray = DynamicImage::ImageLuma8(img.to_luma8());

    let margin = options.crop_margin_px;
    let cropped = if gray.width() > 2 * margin && gray.height() > 2 * margin {
        gray.crop_imm(margin, margin, gray.width() - 2 * margin, gray.height() - 2 * margin)
    } else {
        // Page smaller than twice the margin: cropping would eat content.
        gray
    };

    let longest = cropped.width().max(cropped.height());
    let bounded = if longest > options.max_dim {
        cropped.resize(options.max_dim, options.max_dim, FilterType::Lanczos3)
    } else {
        cropped
    };

    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, options.jpeg_quality);
    bounded.write_with_encoder(encoder)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};

    fn options() -> RenderOptions {
        RenderOptions {
            dpi: 200,
            max_dim: 2000,
            crop_margin_px: 12,
            jpeg_quality: 80,
        }
    }

    fn solid(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([200, 180, 40, 255])))
    }

    #[test]
    fn output_is_grayscale_jpeg() {
        let bytes = normalize_page(&solid(100, 80), &options()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
    }

    #[test]
    fn margin_is_cropped() {
        let bytes = normalize_page(&solid(200, 100), &options()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 200 - 24);
        assert_eq!(decoded.height(), 100 - 24);
    }

    #[test]
    fn tiny_page_is_not_cropped_away() {
        let bytes = normalize_page(&solid(20, 20), &options()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 20));
    }

    #[test]
    fn longer_side_never_exceeds_cap() {
        let opts = RenderOptions {
            max_dim: 500,
            ..options()
        };
        let bytes = normalize_page(&solid(3000, 1500), &opts).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(decoded.width().max(decoded.height()) <= 500);
    }

    #[test]
    fn aspect_ratio_preserved_within_rounding() {
        let opts = RenderOptions {
            max_dim: 500,
            ..options()
        };
        let bytes = normalize_page(&solid(3000, 1500), &opts).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        // Source after crop is 2976x1476; ratio ≈ 2.0163
        let source_ratio = 2976.0 / 1476.0;
        let out_ratio = decoded.width() as f64 / decoded.height() as f64;
        assert!(
            (out_ratio - source_ratio).abs() < 0.02,
            "ratio drifted: {out_ratio} vs {source_ratio}"
        );
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let bytes = normalize_page(&solid(300, 200), &options()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300 - 24, 200 - 24));
    }

    #[test]
    fn grayscale_input_passes_through() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            100,
            100,
            Luma([128]),
        ));
        let bytes = normalize_page(&img, &options()).unwrap();
        assert!(!bytes.is_empty());
    }
}
