//! Pipeline stages for batch extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations (rendering backend, model provider, storage) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ render ──▶ prompt ──▶ model ──▶ parse ──▶ merge
//! (store)   (pdfium)   (context)  (vision)  (JSON)    (fold)
//! ```
//!
//! 1. [`fetch`]  — download the document from object storage to a temp file
//! 2. [`render`] — rasterise and normalise one batch's pages; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`model`]  — drive the multimodal call; the only stage with network I/O
//! 4. [`parse`]  — best-effort JSON extraction from the free-form reply
//!
//! Prompt construction lives in [`crate::prompts`] and merging in
//! [`crate::accumulator`]; the fold itself is in [`crate::extract`].

pub mod fetch;
pub mod model;
pub mod parse;
pub mod render;
