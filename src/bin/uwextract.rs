//! CLI binary for uwextract.
//!
//! A thin shim over the library: stages a local PDF into a filesystem object
//! store, builds the invocation event, runs the pipeline, and prints the
//! invocation result as JSON. Useful for smoke-testing prompts and
//! configurations against real documents without any cloud wiring.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uwextract::{
    handle_event, Collaborators, DocumentLocation, ExtractionConfig, FsObjectStore,
    MemoryStatusStore, ObjectStore, PdfiumRasterizer, VisionModel,
};

#[derive(Parser, Debug)]
#[command(
    name = "uwextract",
    version,
    about = "Extract structured data from a scanned underwriting submission"
)]
struct Args {
    /// Path to the PDF document to process.
    input: PathBuf,

    /// Job identifier (keys the status row and the chunk prefix).
    #[arg(long, default_value = "local-job")]
    job_id: String,

    /// Document-level classification label.
    #[arg(long, default_value = "OTHER")]
    classification: String,

    /// Insurance type label.
    #[arg(long, default_value = "property_casualty")]
    insurance_type: String,

    /// Explicit page range "first-last" (e.g. "4-6"); omits = whole document.
    #[arg(long)]
    pages: Option<String>,

    /// Root directory of the filesystem object store.
    #[arg(long, default_value = "./uwextract-store")]
    store_root: PathBuf,

    /// Pages per batch.
    #[arg(long, env = "UW_BATCH_WIDTH")]
    batch_width: Option<u32>,

    /// Model identifier (e.g. "gpt-4.1-nano").
    #[arg(long, env = "UW_MODEL_ID")]
    model: Option<String>,

    /// Provider name (e.g. "openai", "anthropic"); auto-detected if omitted.
    #[arg(long, env = "UW_PROVIDER")]
    provider: Option<String>,
}

fn parse_pages(spec: &str) -> Result<(u32, u32)> {
    let (first, last) = spec
        .split_once('-')
        .with_context(|| format!("--pages must be 'first-last', got '{spec}'"))?;
    Ok((
        first.trim().parse().context("invalid first page")?,
        last.trim().parse().context("invalid last page")?,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut builder = ExtractionConfig::builder();
    if let Some(w) = args.batch_width {
        builder = builder.batch_width(w);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    let config = builder.build()?;

    // Stage the local file into the store so the pipeline sees the same
    // fetch path it would in a deployment.
    let store = Arc::new(FsObjectStore::new(&args.store_root));
    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let filename = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf");
    let key = format!("uploads/{}/{}", args.job_id, filename);
    let document = DocumentLocation::new("submissions", key.clone());
    store.put(&document, bytes).await?;

    let deps = Collaborators {
        store,
        status: Arc::new(MemoryStatusStore::new()),
        model: Arc::new(VisionModel::from_config(&config)?),
        rasterizer: Arc::new(PdfiumRasterizer::new((&config).into())),
    };

    let mut event = serde_json::json!({
        "detail": {
            "bucket": { "name": "submissions" },
            "object": { "key": key }
        },
        "classification": {
            "jobId": args.job_id,
            "classification": args.classification,
            "insuranceType": args.insurance_type
        }
    });
    if let Some(ref spec) = args.pages {
        let (first, last) = parse_pages(spec)?;
        event["pages"] = serde_json::json!({ "start": first, "end": last });
    }

    let result = handle_event(&event, &deps, &config).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.get("status").and_then(|s| s.as_str()) == Some("ERROR") {
        bail!("extraction failed");
    }
    Ok(())
}
