//! Configuration for the extraction pipeline.
//!
//! Every tunable lives in [`ExtractionConfig`], built via
//! [`ExtractionConfigBuilder`] or read from the environment with
//! [`ExtractionConfig::from_env`]. None of these knobs change pipeline
//! *logic* — they substitute constants (batch width, render density, image
//! bounds, output bucket) without touching the algorithm.

use crate::error::ExtractError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for one extraction invocation.
///
/// # Example
/// ```rust
/// use uwextract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .batch_width(3)
///     .render_dpi(200)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Pages per batch when no explicit range is given. Default: 1.
    ///
    /// One page per model call keeps each reply small and the carried-forward
    /// context dominant; widen this only when per-call overhead matters more
    /// than reply quality.
    pub batch_width: u32,

    /// Rendering density in DPI. Range: 72–400. Default: 200.
    ///
    /// Scanned underwriting forms carry small print (lab values, prescription
    /// tables); 200 DPI keeps it legible after JPEG compression while staying
    /// within API upload limits.
    pub render_dpi: u32,

    /// Maximum image dimension (longer side) in pixels. Default: 2000.
    ///
    /// A safety cap independent of DPI: a 200-DPI render of an oversized scan
    /// could exhaust memory and blow past model input limits. Images above
    /// the cap are downscaled uniformly, preserving aspect ratio.
    pub max_image_dim: u32,

    /// Margin cropped from all four page edges, in pixels. Default: 12.
    ///
    /// Scanned submissions routinely carry punch holes, feeder shadows, and
    /// skew artifacts along the edges; trimming a thin margin removes them
    /// without touching content.
    pub crop_margin_px: u32,

    /// JPEG quality for encoded page images, 1–100. Default: 80.
    pub jpeg_quality: u8,

    /// Maximum tokens the model may generate per batch. Default: 4096.
    ///
    /// Dense pages (lab panels, schedules of values) can produce long
    /// key-value lists; too low a bound silently truncates the JSON reply
    /// mid-object and the batch is then skipped by the parser.
    pub max_tokens: usize,

    /// Model identifier, e.g. "gpt-4.1-nano", "claude-sonnet-4-20250514".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "anthropic"). If None along with
    /// `provider`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed model provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Bucket result chunks are written to. Default: "extraction-output".
    pub output_bucket: String,

    /// Job-status table identifier, consumed by deployable status stores
    /// (see [`crate::stores::HttpStatusStore`]). Default: "jobs".
    pub jobs_table: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            batch_width: 1,
            render_dpi: 200,
            max_image_dim: 2000,
            crop_margin_px: 12,
            jpeg_quality: 80,
            max_tokens: 4096,
            model: None,
            provider_name: None,
            provider: None,
            output_bucket: "extraction-output".to_string(),
            jobs_table: "jobs".to_string(),
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("batch_width", &self.batch_width)
            .field("render_dpi", &self.render_dpi)
            .field("max_image_dim", &self.max_image_dim)
            .field("crop_margin_px", &self.crop_margin_px)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_tokens", &self.max_tokens)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("output_bucket", &self.output_bucket)
            .field("jobs_table", &self.jobs_table)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read configuration from `UW_*` environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// Recognised variables: `UW_BATCH_WIDTH`, `UW_RENDER_DPI`,
    /// `UW_MAX_IMAGE_DIM`, `UW_CROP_MARGIN_PX`, `UW_JPEG_QUALITY`,
    /// `UW_MAX_TOKENS`, `UW_MODEL_ID`, `UW_PROVIDER`, `UW_OUTPUT_BUCKET`,
    /// `UW_JOBS_TABLE`.
    pub fn from_env() -> Result<Self, ExtractError> {
        fn parsed<T: std::str::FromStr>(var: &str) -> Result<Option<T>, ExtractError> {
            match std::env::var(var) {
                Ok(v) if !v.is_empty() => v.parse::<T>().map(Some).map_err(|_| {
                    ExtractError::InvalidConfig(format!("{var} is not a valid number: '{v}'"))
                }),
                _ => Ok(None),
            }
        }

        let mut builder = Self::builder();
        if let Some(w) = parsed::<u32>("UW_BATCH_WIDTH")? {
            builder = builder.batch_width(w);
        }
        if let Some(dpi) = parsed::<u32>("UW_RENDER_DPI")? {
            builder = builder.render_dpi(dpi);
        }
        if let Some(px) = parsed::<u32>("UW_MAX_IMAGE_DIM")? {
            builder = builder.max_image_dim(px);
        }
        if let Some(px) = parsed::<u32>("UW_CROP_MARGIN_PX")? {
            builder = builder.crop_margin_px(px);
        }
        if let Some(q) = parsed::<u8>("UW_JPEG_QUALITY")? {
            builder = builder.jpeg_quality(q);
        }
        if let Some(n) = parsed::<usize>("UW_MAX_TOKENS")? {
            builder = builder.max_tokens(n);
        }
        if let Ok(model) = std::env::var("UW_MODEL_ID") {
            if !model.is_empty() {
                builder = builder.model(model);
            }
        }
        if let Ok(provider) = std::env::var("UW_PROVIDER") {
            if !provider.is_empty() {
                builder = builder.provider_name(provider);
            }
        }
        if let Ok(bucket) = std::env::var("UW_OUTPUT_BUCKET") {
            if !bucket.is_empty() {
                builder = builder.output_bucket(bucket);
            }
        }
        if let Ok(table) = std::env::var("UW_JOBS_TABLE") {
            if !table.is_empty() {
                builder = builder.jobs_table(table);
            }
        }
        builder.build()
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn batch_width(mut self, w: u32) -> Self {
        self.config.batch_width = w.max(1);
        self
    }

    pub fn render_dpi(mut self, dpi: u32) -> Self {
        self.config.render_dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_image_dim(mut self, px: u32) -> Self {
        self.config.max_image_dim = px.max(100);
        self
    }

    pub fn crop_margin_px(mut self, px: u32) -> Self {
        self.config.crop_margin_px = px;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn output_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.output_bucket = bucket.into();
        self
    }

    pub fn jobs_table(mut self, table: impl Into<String>) -> Self {
        self.config.jobs_table = table.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.batch_width == 0 {
            return Err(ExtractError::InvalidConfig(
                "Batch width must be ≥ 1".into(),
            ));
        }
        if c.render_dpi < 72 || c.render_dpi > 400 {
            return Err(ExtractError::InvalidConfig(format!(
                "Render DPI must be 72–400, got {}",
                c.render_dpi
            )));
        }
        if c.max_image_dim <= 2 * c.crop_margin_px {
            return Err(ExtractError::InvalidConfig(format!(
                "Max image dimension ({}) must exceed twice the crop margin ({})",
                c.max_image_dim, c.crop_margin_px
            )));
        }
        if c.output_bucket.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "Output bucket must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Serialisable view of the config, emitted at the start of each invocation
/// (see [`crate::extract::extract`]).
///
/// The provider handle is not serialisable; everything else is.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub batch_width: u32,
    pub render_dpi: u32,
    pub max_image_dim: u32,
    pub crop_margin_px: u32,
    pub jpeg_quality: u8,
    pub max_tokens: usize,
    pub model: Option<String>,
    pub output_bucket: String,
    pub jobs_table: String,
}

impl From<&ExtractionConfig> for ConfigSummary {
    fn from(c: &ExtractionConfig) -> Self {
        Self {
            batch_width: c.batch_width,
            render_dpi: c.render_dpi,
            max_image_dim: c.max_image_dim,
            crop_margin_px: c.crop_margin_px,
            jpeg_quality: c.jpeg_quality,
            max_tokens: c.max_tokens,
            model: c.model.clone(),
            output_bucket: c.output_bucket.clone(),
            jobs_table: c.jobs_table.clone(),
        }
    }
}
