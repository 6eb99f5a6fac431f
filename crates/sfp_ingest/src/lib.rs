//! Capture intake for the stylefp pipeline.
//!
//! A capture collaborator (headless browser, archived snapshot, test
//! fixture) produces a [`RawCapture`]: a viewport plus an ordered list of
//! visible elements with their computed styles and bounding boxes. This
//! crate turns that into a [`CaptureRecord`] the downstream stages can
//! trust:
//!
//! - malformed nodes (blank id, missing tag, negative or non-finite
//!   bounding box) are dropped and counted, never fatal;
//! - a blank capture id or an unusable viewport *is* fatal; nothing
//!   downstream can be keyed or normalized without them;
//! - a stable record id is derived from the capture id with UUID v5, so
//!   re-processing the same capture overwrites deterministically.
//!
//! An empty node list is accepted: degenerate pages still vectorize to a
//! defined neutral result further down the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sfp_math::BBox;
use std::time::Instant;
use thiserror::Error;
use tracing::{Level, info, warn};
use uuid::Uuid;

/// Supported ingest config version.
pub const INGEST_CONFIG_VERSION: u32 = 1;

/// Errors surfaced by ingest. Node-level problems are not here on
/// purpose: bad nodes are dropped and counted, not raised.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported ingest config version: {found}")]
    UnsupportedVersion { found: u32 },
    #[error("invalid ingest config: {0}")]
    InvalidConfig(String),
    #[error("capture id is empty")]
    MissingCaptureId,
    #[error("invalid viewport: {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
    #[error("capture carries {count} nodes, budget is {limit}")]
    NodeBudgetExceeded { count: usize, limit: usize },
}

/// Ingest behavior knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Config schema version, must equal [`INGEST_CONFIG_VERSION`].
    #[serde(default = "default_version")]
    pub version: u32,
    /// Namespace for UUID v5 record-id derivation.
    #[serde(default = "default_namespace")]
    pub id_namespace: Uuid,
    /// Remove control characters from ids and text content.
    #[serde(default = "default_true")]
    pub strip_control_chars: bool,
    /// Upper bound on nodes per capture; larger captures are rejected.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
}

fn default_version() -> u32 {
    INGEST_CONFIG_VERSION
}

fn default_namespace() -> Uuid {
    Uuid::NAMESPACE_URL
}

fn default_true() -> bool {
    true
}

fn default_max_nodes() -> usize {
    20_000
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            id_namespace: default_namespace(),
            strip_control_chars: default_true(),
            max_nodes: default_max_nodes(),
        }
    }
}

impl IngestConfig {
    pub fn with_namespace(mut self, namespace: Uuid) -> Self {
        self.id_namespace = namespace;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.version != INGEST_CONFIG_VERSION {
            return Err(IngestError::UnsupportedVersion {
                found: self.version,
            });
        }
        if self.max_nodes == 0 {
            return Err(IngestError::InvalidConfig(
                "max_nodes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Capture viewport in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    #[inline]
    pub fn perimeter(&self) -> f64 {
        2.0 * (self.width + self.height)
    }
}

/// Computed-style subset captured per element. Every property is optional;
/// consumers pattern-match on presence instead of probing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeStyles {
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<String>,
    pub font_weight: Option<String>,
    pub line_height: Option<String>,
    pub border_radius: Option<String>,
    pub box_shadow: Option<String>,
    pub margin: Option<String>,
    pub padding: Option<String>,
    pub border: Option<String>,
    pub display: Option<String>,
    pub text_align: Option<String>,
}

/// One visible element as captured. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleNode {
    pub id: String,
    pub tag: String,
    pub bbox: BBox,
    #[serde(default)]
    pub styles: NodeStyles,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
}

/// A capture as delivered by the collaborator, before sanitization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCapture {
    pub id: String,
    #[serde(default)]
    pub source_ref: Option<String>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
    pub viewport: Viewport,
    #[serde(default)]
    pub nodes: Vec<StyleNode>,
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
}

/// Sanitized capture ready for token aggregation and layout extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Deterministic storage id, UUID v5 of the capture id.
    pub record_id: Uuid,
    pub capture_id: String,
    pub source_ref: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub viewport: Viewport,
    pub nodes: Vec<StyleNode>,
    /// Nodes discarded during sanitization; surfaced in vector metadata.
    pub dropped_nodes: usize,
}

/// Sanitize a raw capture into a [`CaptureRecord`].
pub fn ingest(raw: RawCapture, config: &IngestConfig) -> Result<CaptureRecord, IngestError> {
    config.validate()?;

    let span = tracing::span!(Level::INFO, "sfp_ingest.ingest", capture_id = %raw.id);
    let _guard = span.enter();
    let started = Instant::now();

    let capture_id = clean_text(&raw.id, config.strip_control_chars);
    if capture_id.is_empty() {
        warn!(event = "ingest_failure", reason = "empty capture id");
        return Err(IngestError::MissingCaptureId);
    }
    if !raw.viewport.is_valid() {
        warn!(
            event = "ingest_failure",
            reason = "invalid viewport",
            width = raw.viewport.width,
            height = raw.viewport.height,
        );
        return Err(IngestError::InvalidViewport {
            width: raw.viewport.width,
            height: raw.viewport.height,
        });
    }
    if raw.nodes.len() > config.max_nodes {
        warn!(
            event = "ingest_failure",
            reason = "node budget exceeded",
            count = raw.nodes.len(),
            limit = config.max_nodes,
        );
        return Err(IngestError::NodeBudgetExceeded {
            count: raw.nodes.len(),
            limit: config.max_nodes,
        });
    }

    let total = raw.nodes.len();
    let mut nodes = Vec::with_capacity(total);
    let mut dropped_nodes = 0usize;
    for node in raw.nodes {
        match sanitize_node(node, config.strip_control_chars) {
            Ok(clean) => nodes.push(clean),
            Err((node_id, reason)) => {
                dropped_nodes += 1;
                warn!(event = "node_dropped", node_id = %node_id, reason = reason);
            }
        }
    }

    let record = CaptureRecord {
        record_id: Uuid::new_v5(&config.id_namespace, capture_id.as_bytes()),
        capture_id,
        source_ref: raw.source_ref,
        captured_at: raw.captured_at.unwrap_or_else(Utc::now),
        viewport: raw.viewport,
        nodes,
        dropped_nodes,
    };

    info!(
        event = "ingest_success",
        record_id = %record.record_id,
        nodes = record.nodes.len(),
        dropped = record.dropped_nodes,
        elapsed_micros = started.elapsed().as_micros() as u64,
    );
    Ok(record)
}

/// Per-node sanitization. Returns the offending node id and a reason on
/// rejection so the caller can log it.
fn sanitize_node(
    mut node: StyleNode,
    strip_control_chars: bool,
) -> Result<StyleNode, (String, &'static str)> {
    let original_id = node.id.clone();
    node.id = clean_text(&node.id, strip_control_chars);
    if node.id.is_empty() {
        return Err((original_id, "empty node id"));
    }
    node.tag = clean_text(&node.tag, strip_control_chars).to_ascii_lowercase();
    if node.tag.is_empty() {
        return Err((original_id, "empty tag"));
    }
    if !node.bbox.is_valid() {
        return Err((original_id, "invalid bbox"));
    }
    if strip_control_chars {
        node.text_content = node
            .text_content
            .map(|t| clean_text(&t, true))
            .filter(|t| !t.is_empty());
    }
    Ok(node)
}

fn clean_text(value: &str, strip_control_chars: bool) -> String {
    if strip_control_chars {
        value.chars().filter(|c| !c.is_control()).collect::<String>().trim().to_string()
    } else {
        value.trim().to_string()
    }
}
