//! Workspace umbrella crate for StyleFP style fingerprinting.
//!
//! This crate stitches capture ingest, design-token aggregation, layout
//! feature extraction and vector assembly together so callers can go from a
//! raw page capture to a stored, queryable style vector with a single call.

pub use sfp_index::{
    BackendConfig, CompressionCodec, CompressionConfig, INDEX_SCHEMA_VERSION, IndexBackend,
    IndexConfig, IndexError, IndexRecord, InMemoryBackend, Neighbor, VectorIndex,
    euclidean_distance,
};
pub use sfp_ingest::{
    CaptureRecord, IngestConfig, IngestError, NodeStyles, RawCapture, StyleNode, Viewport, ingest,
};
pub use sfp_layout::{Calibration, LayoutConfig, LayoutError, LayoutFeatures, extract_layout};
pub use sfp_math::{BBox, Point};
pub use sfp_tokens::{
    ColorSample, ColorTiers, ComponentTokens, DesignTokens, TokenConfig, TokenError, aggregate,
    classify_tiers, collect_color_samples, digest, extract_component,
};
pub use sfp_vector::{
    COMPONENT_DIMS, FeatureVector, PAGE_DIMS, PAGE_RESERVED_DIMS, ReservedSpan, VectorConfig,
    VectorError, VectorKind, VectorMeta, build_component, build_page,
};

mod config;
pub use config::{ConfigLoadError, IndexSettings, StylefpConfig};

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};
use tracing::{info, info_span};

/// Errors that can occur while processing a capture through the pipeline.
#[derive(Debug)]
pub enum PipelineError {
    Ingest(IngestError),
    Tokens(TokenError),
    Layout(LayoutError),
    Vector(VectorError),
    Index(IndexError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Ingest(err) => write!(f, "ingest failure: {err}"),
            PipelineError::Tokens(err) => write!(f, "token aggregation failure: {err}"),
            PipelineError::Layout(err) => write!(f, "layout extraction failure: {err}"),
            PipelineError::Vector(err) => write!(f, "vector assembly failure: {err}"),
            PipelineError::Index(err) => write!(f, "index failure: {err}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Ingest(err) => Some(err),
            PipelineError::Tokens(err) => Some(err),
            PipelineError::Layout(err) => Some(err),
            PipelineError::Vector(err) => Some(err),
            PipelineError::Index(err) => Some(err),
        }
    }
}

impl From<IngestError> for PipelineError {
    fn from(value: IngestError) -> Self {
        PipelineError::Ingest(value)
    }
}

impl From<TokenError> for PipelineError {
    fn from(value: TokenError) -> Self {
        PipelineError::Tokens(value)
    }
}

impl From<LayoutError> for PipelineError {
    fn from(value: LayoutError) -> Self {
        PipelineError::Layout(value)
    }
}

impl From<VectorError> for PipelineError {
    fn from(value: VectorError) -> Self {
        PipelineError::Vector(value)
    }
}

impl From<IndexError> for PipelineError {
    fn from(value: IndexError) -> Self {
        PipelineError::Index(value)
    }
}

/// Metrics observer for pipeline stages. Errors are passed by reference so
/// non-cloneable stage errors can still be observed.
pub trait StageMetrics: Send + Sync {
    fn record_ingest(&self, latency: Duration, result: Result<(), &IngestError>);
    fn record_tokens(&self, latency: Duration, result: Result<(), &TokenError>);
    fn record_layout(&self, latency: Duration, result: Result<(), &LayoutError>);
    fn record_vector(&self, latency: Duration, result: Result<(), &VectorError>);
    fn record_index(&self, latency: Duration, result: Result<(), &IndexError>);
}

/// Install or clear the global stage metrics recorder.
pub fn set_stage_metrics(recorder: Option<Arc<dyn StageMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn StageMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn StageMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

// A poisoned lock degrades to "no metrics" instead of panicking.
fn metrics_recorder() -> Option<Arc<dyn StageMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn StageMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_ingest(self, result: Result<(), &IngestError>) {
        self.recorder.record_ingest(self.start.elapsed(), result);
    }

    fn record_tokens(self, result: Result<(), &TokenError>) {
        self.recorder.record_tokens(self.start.elapsed(), result);
    }

    fn record_layout(self, result: Result<(), &LayoutError>) {
        self.recorder.record_layout(self.start.elapsed(), result);
    }

    fn record_vector(self, result: Result<(), &VectorError>) {
        self.recorder.record_vector(self.start.elapsed(), result);
    }

    fn record_index(self, result: Result<(), &IndexError>) {
        self.recorder.record_index(self.start.elapsed(), result);
    }
}

/// Everything the pipeline derives from one capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub record: CaptureRecord,
    pub tokens: DesignTokens,
    /// Stable digest of the aggregated tokens, useful as a cache key.
    pub token_digest: String,
    pub layout: LayoutFeatures,
    pub vector: FeatureVector,
}

/// Process a raw capture end-to-end with default configuration.
pub fn process_capture(raw: RawCapture) -> Result<PageAnalysis, PipelineError> {
    process_capture_with_configs(raw, &StylefpConfig::default())
}

/// Process a raw capture end-to-end: ingest, aggregate tokens, extract layout
/// features and assemble the page vector.
pub fn process_capture_with_configs(
    raw: RawCapture,
    cfg: &StylefpConfig,
) -> Result<PageAnalysis, PipelineError> {
    let span = info_span!("stylefp.vectorize", capture_id = %raw.id);
    let _guard = span.enter();
    let started = Instant::now();

    let mut ingest_span = MetricsSpan::start();
    let record = match ingest(raw, &cfg.ingest) {
        Ok(record) => {
            if let Some(span) = ingest_span.take() {
                span.record_ingest(Ok(()));
            }
            record
        }
        Err(err) => {
            if let Some(span) = ingest_span.take() {
                span.record_ingest(Err(&err));
            }
            return Err(PipelineError::Ingest(err));
        }
    };

    let mut token_span = MetricsSpan::start();
    let aggregated = aggregate(&record.nodes, &cfg.tokens).and_then(|tokens| {
        let token_digest = digest(&tokens)?;
        Ok((tokens, token_digest))
    });
    let (tokens, token_digest) = match aggregated {
        Ok(pair) => {
            if let Some(span) = token_span.take() {
                span.record_tokens(Ok(()));
            }
            pair
        }
        Err(err) => {
            if let Some(span) = token_span.take() {
                span.record_tokens(Err(&err));
            }
            return Err(PipelineError::Tokens(err));
        }
    };

    let mut layout_span = MetricsSpan::start();
    let layout = match extract_layout(&record.nodes, &record.viewport, &cfg.layout) {
        Ok(layout) => {
            if let Some(span) = layout_span.take() {
                span.record_layout(Ok(()));
            }
            layout
        }
        Err(err) => {
            if let Some(span) = layout_span.take() {
                span.record_layout(Err(&err));
            }
            return Err(PipelineError::Layout(err));
        }
    };

    let mut vector_span = MetricsSpan::start();
    let samples = collect_color_samples(&record.nodes, cfg.tokens.max_samples);
    let vector = match build_page(&tokens, &samples, &layout, &cfg.vector) {
        Ok(vector) => {
            if let Some(span) = vector_span.take() {
                span.record_vector(Ok(()));
            }
            vector
        }
        Err(err) => {
            if let Some(span) = vector_span.take() {
                span.record_vector(Err(&err));
            }
            return Err(PipelineError::Vector(err));
        }
    };

    info!(
        event = "vectorize_success",
        record_id = %record.record_id,
        nodes = record.nodes.len(),
        dropped = record.dropped_nodes,
        non_zero = vector.meta.non_zero_count,
        elapsed_micros = started.elapsed().as_micros() as u64,
    );

    Ok(PageAnalysis {
        record,
        tokens,
        token_digest,
        layout,
        vector,
    })
}

/// Build the index record for an analysis without inserting it.
pub fn index_record(analysis: &PageAnalysis) -> IndexRecord {
    IndexRecord {
        schema_version: INDEX_SCHEMA_VERSION,
        id: analysis.record.record_id.to_string(),
        source_ref: analysis.record.source_ref.clone().unwrap_or_default(),
        vector: analysis.vector.combined.clone(),
        metadata: serde_json::json!({
            "kind": analysis.vector.kind,
            "capture_id": analysis.record.capture_id,
            "token_digest": analysis.token_digest,
            "non_zero_count": analysis.vector.meta.non_zero_count,
            "dropped_nodes": analysis.record.dropped_nodes,
            "reserved": analysis.vector.meta.reserved,
        }),
        created_at: analysis.record.captured_at.to_rfc3339(),
    }
}

/// Insert an already-computed analysis into `index`, returning the stored
/// record.
pub fn store_analysis(
    analysis: &PageAnalysis,
    index: &VectorIndex,
) -> Result<IndexRecord, PipelineError> {
    let rec = index_record(analysis);
    let mut index_span = MetricsSpan::start();
    match index.insert(&rec) {
        Ok(()) => {
            if let Some(span) = index_span.take() {
                span.record_index(Ok(()));
            }
            Ok(rec)
        }
        Err(err) => {
            if let Some(span) = index_span.take() {
                span.record_index(Err(&err));
            }
            Err(PipelineError::Index(err))
        }
    }
}

/// Run the full pipeline and insert the combined vector into `index`.
pub fn vectorize_and_store(
    raw: RawCapture,
    cfg: &StylefpConfig,
    index: &VectorIndex,
) -> Result<IndexRecord, PipelineError> {
    let analysis = process_capture_with_configs(raw, cfg)?;
    store_analysis(&analysis, index)
}

/// Nearest-neighbour lookup over stored vectors.
pub fn query_similar(
    index: &VectorIndex,
    vector: &[f32],
    top_k: usize,
) -> Result<Vec<Neighbor>, PipelineError> {
    index.query(vector, top_k).map_err(PipelineError::Index)
}

fn styled(id: &str, tag: &str, bbox: BBox, styles: NodeStyles, text: Option<&str>) -> StyleNode {
    StyleNode {
        id: id.to_string(),
        tag: tag.to_string(),
        bbox,
        styles,
        role: None,
        class_name: None,
        text_content: text.map(str::to_string),
    }
}

/// Synthetic landing-page capture used by the demo binary, the benches and
/// the integration smoke tests.
pub fn demo_page() -> RawCapture {
    let mut nodes = vec![
        styled(
            "header",
            "header",
            BBox::new(0.0, 0.0, 1440.0, 72.0),
            NodeStyles {
                background_color: Some("#ffffff".into()),
                padding: Some("0 32px".into()),
                ..NodeStyles::default()
            },
            None,
        ),
        styled(
            "logo",
            "span",
            BBox::new(32.0, 24.0, 120.0, 24.0),
            NodeStyles {
                color: Some("#0a0a0a".into()),
                font_family: Some("\"Inter\", sans-serif".into()),
                font_size: Some("20px".into()),
                font_weight: Some("700".into()),
                ..NodeStyles::default()
            },
            Some("stylefp"),
        ),
        styled(
            "nav-products",
            "a",
            BBox::new(1040.0, 26.0, 80.0, 20.0),
            NodeStyles {
                color: Some("#4b5563".into()),
                font_size: Some("15px".into()),
                font_weight: Some("500".into()),
                ..NodeStyles::default()
            },
            Some("Products"),
        ),
        styled(
            "nav-docs",
            "a",
            BBox::new(1140.0, 26.0, 60.0, 20.0),
            NodeStyles {
                color: Some("#4b5563".into()),
                font_size: Some("15px".into()),
                font_weight: Some("500".into()),
                ..NodeStyles::default()
            },
            Some("Docs"),
        ),
        styled(
            "nav-pricing",
            "a",
            BBox::new(1220.0, 26.0, 70.0, 20.0),
            NodeStyles {
                color: Some("#4b5563".into()),
                font_size: Some("15px".into()),
                font_weight: Some("500".into()),
                ..NodeStyles::default()
            },
            Some("Pricing"),
        ),
        styled(
            "hero",
            "section",
            BBox::new(0.0, 72.0, 1440.0, 420.0),
            NodeStyles {
                background_color: Some("#f5f7fb".into()),
                padding: Some("48px 120px".into()),
                ..NodeStyles::default()
            },
            None,
        ),
        styled(
            "badge-new",
            "span",
            BBox::new(120.0, 120.0, 64.0, 22.0),
            NodeStyles {
                background_color: Some("#f59e0b".into()),
                color: Some("#78350f".into()),
                border_radius: Some("11px".into()),
                font_size: Some("12px".into()),
                font_weight: Some("700".into()),
                padding: Some("4px 10px".into()),
                ..NodeStyles::default()
            },
            Some("NEW"),
        ),
        styled(
            "hero-title",
            "h1",
            BBox::new(120.0, 150.0, 640.0, 120.0),
            NodeStyles {
                color: Some("#0a0a0a".into()),
                font_family: Some("\"Inter\", sans-serif".into()),
                font_size: Some("56px".into()),
                font_weight: Some("800".into()),
                line_height: Some("60px".into()),
                ..NodeStyles::default()
            },
            Some("Find pages that share your look"),
        ),
        styled(
            "hero-copy",
            "p",
            BBox::new(120.0, 294.0, 560.0, 72.0),
            NodeStyles {
                color: Some("#4b5563".into()),
                font_size: Some("18px".into()),
                line_height: Some("28px".into()),
                ..NodeStyles::default()
            },
            Some("Vectorize captured styles and query the nearest designs in milliseconds."),
        ),
        styled(
            "hero-cta",
            "button",
            BBox::new(120.0, 398.0, 190.0, 52.0),
            NodeStyles {
                background_color: Some("#2563eb".into()),
                color: Some("#ffffff".into()),
                border_radius: Some("26px".into()),
                box_shadow: Some("0 8px 24px rgba(37, 99, 235, 0.35)".into()),
                font_size: Some("16px".into()),
                font_weight: Some("600".into()),
                padding: Some("14px 28px".into()),
                ..NodeStyles::default()
            },
            Some("Get started"),
        ),
        styled(
            "hero-alt",
            "button",
            BBox::new(330.0, 398.0, 150.0, 52.0),
            NodeStyles {
                color: Some("#111827".into()),
                border: Some("1px solid #d1d5db".into()),
                border_radius: Some("26px".into()),
                font_size: Some("16px".into()),
                font_weight: Some("600".into()),
                padding: Some("14px 24px".into()),
                ..NodeStyles::default()
            },
            Some("Live demo"),
        ),
        styled(
            "hero-art",
            "img",
            BBox::new(820.0, 132.0, 500.0, 320.0),
            NodeStyles {
                border_radius: Some("16px".into()),
                ..NodeStyles::default()
            },
            None,
        ),
    ];

    let card_titles = [
        "Palette tiers",
        "Spacing rhythm",
        "Type scale",
        "Shape language",
        "Depth cues",
        "Grouping",
    ];
    let columns = [120.0, 560.0, 1000.0];
    let rows = [560.0, 756.0];
    for (i, title) in card_titles.iter().enumerate() {
        let x = columns[i % 3];
        let y = rows[i / 3];
        nodes.push(styled(
            &format!("card-{}", i + 1),
            "div",
            BBox::new(x, y, 400.0, 168.0),
            NodeStyles {
                background_color: Some("#ffffff".into()),
                border_radius: Some("12px".into()),
                box_shadow: Some("0 2px 8px rgba(15, 23, 42, 0.08)".into()),
                padding: Some("24px".into()),
                ..NodeStyles::default()
            },
            None,
        ));
        nodes.push(styled(
            &format!("card-{}-title", i + 1),
            "h3",
            BBox::new(x + 24.0, y + 24.0, 200.0, 24.0),
            NodeStyles {
                color: Some("#111827".into()),
                font_size: Some("20px".into()),
                font_weight: Some("600".into()),
                ..NodeStyles::default()
            },
            Some(title),
        ));
    }

    RawCapture {
        id: "demo-landing".into(),
        source_ref: Some("https://stylefp.dev/demo/landing".into()),
        captured_at: DateTime::from_timestamp(1_740_000_000, 0),
        viewport: Viewport::new(1440.0, 900.0),
        nodes,
        attributes: None,
    }
}
