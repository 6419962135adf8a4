//! Core data types for the Precedente pattern store
//!
//! This module defines the entity model shared by the store and the
//! extraction pipeline: casos, signature vectors, observed patterns,
//! divergences, hints and observation results. Value objects validate at
//! construction time; out-of-range values are rejected, never clamped.

use crate::config::StoreConfig;
use crate::error::{PrecedenteError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;

/// Maximum number of components in a signature feature vector
pub const MAX_SIGNATURE_FEATURES: usize = 100;

/// Extraction engines known to the pipeline
///
/// The enum is closed on purpose: the quality lattice below is a `match`,
/// so adding an engine without a quality score fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    /// Layout-aware ML extractor
    Marker,
    /// Classical text-layer extractor
    Pdfplumber,
    /// OCR extractor
    Tesseract,
}

impl EngineType {
    /// Relative quality of each engine, used to gate pattern overwrites.
    /// A strictly lower-quality engine never overwrites a pattern validated
    /// by a higher-quality one.
    pub fn quality(&self) -> f64 {
        match self {
            EngineType::Marker => 1.0,
            EngineType::Pdfplumber => 0.9,
            EngineType::Tesseract => 0.7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineType::Marker => "marker",
            EngineType::Pdfplumber => "pdfplumber",
            EngineType::Tesseract => "tesseract",
        }
    }

    /// All engine variants, in descending quality order
    pub fn all() -> [EngineType; 3] {
        [
            EngineType::Marker,
            EngineType::Pdfplumber,
            EngineType::Tesseract,
        ]
    }
}

impl FromStr for EngineType {
    type Err = PrecedenteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "marker" => Ok(EngineType::Marker),
            "pdfplumber" => Ok(EngineType::Pdfplumber),
            "tesseract" => Ok(EngineType::Tesseract),
            other => Err(PrecedenteError::Validation(format!(
                "unknown engine: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for EngineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Categorical tag of what a page region represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Header,
    Footer,
    Table,
    TextBlock,
    Image,
    Signature,
    Stamp,
    Unknown,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Header => "header",
            PatternType::Footer => "footer",
            PatternType::Table => "table",
            PatternType::TextBlock => "text_block",
            PatternType::Image => "image",
            PatternType::Signature => "signature",
            PatternType::Stamp => "stamp",
            PatternType::Unknown => "unknown",
        }
    }
}

impl FromStr for PatternType {
    type Err = PrecedenteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "header" => Ok(PatternType::Header),
            "footer" => Ok(PatternType::Footer),
            "table" => Ok(PatternType::Table),
            "text_block" => Ok(PatternType::TextBlock),
            "image" => Ok(PatternType::Image),
            "signature" => Ok(PatternType::Signature),
            "stamp" => Ok(PatternType::Stamp),
            "unknown" => Ok(PatternType::Unknown),
            other => Err(PrecedenteError::Validation(format!(
                "unknown pattern type: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Page-region rectangle as `[x0, y0, x1, y1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BBox(pub [f64; 4]);

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self([x0, y0, x1, y1])
    }

    /// Parse from a slice, rejecting anything but 4 coordinates
    pub fn from_slice(coords: &[f64]) -> Result<Self> {
        let arr: [f64; 4] = coords.try_into().map_err(|_| {
            PrecedenteError::Validation(format!(
                "bbox must have exactly 4 coordinates, got {}",
                coords.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn area(&self) -> f64 {
        let [x0, y0, x1, y1] = self.0;
        ((x1 - x0) * (y1 - y0)).max(0.0)
    }
}

/// A processing unit: one judicial case (or comparable document family)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caso {
    /// Store-assigned row id
    pub id: i64,
    /// External CNJ case number, unique across the store
    pub numero_cnj: String,
    /// Judicial-system code ('pje', 'eproc', 'tucujuris', ...)
    pub sistema: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable page signature: a fixed-length numeric feature vector plus a
/// deterministic digest of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureVector {
    features: Vec<f64>,
    hash: String,
}

impl SignatureVector {
    /// Build a signature from raw features, computing the digest.
    ///
    /// Rejects empty vectors and vectors longer than
    /// [`MAX_SIGNATURE_FEATURES`].
    pub fn new(features: Vec<f64>) -> Result<Self> {
        Self::check_len(&features)?;
        let hash = Self::digest(&features)?;
        Ok(Self { features, hash })
    }

    /// Rebuild a signature from already-persisted parts without re-hashing
    pub fn from_parts(features: Vec<f64>, hash: String) -> Result<Self> {
        Self::check_len(&features)?;
        Ok(Self { features, hash })
    }

    fn check_len(features: &[f64]) -> Result<()> {
        if features.is_empty() {
            return Err(PrecedenteError::Validation(
                "feature vector cannot be empty".to_string(),
            ));
        }
        if features.len() > MAX_SIGNATURE_FEATURES {
            return Err(PrecedenteError::Validation(format!(
                "feature vector too large: {} > {}",
                features.len(),
                MAX_SIGNATURE_FEATURES
            )));
        }
        Ok(())
    }

    fn digest(features: &[f64]) -> Result<String> {
        let canonical = serde_json::to_string(features)?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(format!("{:x}", digest))
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// A learned rule: pages whose signature resembles this one, within this
/// caso, were best handled by `suggested_engine` with confidence around
/// `confidence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedPattern {
    pub id: i64,
    pub caso_id: i64,
    pub pattern_type: PatternType,
    pub signature_hash: String,
    pub signature_vector: Vec<f64>,
    pub suggested_bbox: Option<BBox>,
    pub suggested_engine: Option<EngineType>,
    /// Expected-confidence baseline in [0, 1]
    pub confidence: f64,
    /// Engine whose observation created or last validated this pattern
    pub created_by_engine: EngineType,
    /// One-way flag; once true it never reverts
    pub deprecated: bool,
    pub first_seen_page: u32,
    pub last_seen_page: u32,
    pub occurrence_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only record that a pattern's prediction did not hold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Divergence {
    pub id: i64,
    pub pattern_id: i64,
    pub page_num: u32,
    pub expected_confidence: f64,
    pub actual_confidence: f64,
    pub engine_used: EngineType,
    pub recorded_at: DateTime<Utc>,
}

impl Divergence {
    /// Magnitude of the prediction miss (always positive)
    pub fn magnitude(&self) -> f64 {
        (self.expected_confidence - self.actual_confidence).abs()
    }
}

/// Transient read result: a suggestion for how to process a similar page.
/// Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternHint {
    pub pattern_id: i64,
    /// Cosine similarity between the query vector and the stored one
    pub similarity: f64,
    pub suggested_bbox: Option<BBox>,
    pub suggested_engine: Option<EngineType>,
    /// The pattern's expected-confidence baseline
    pub confidence: f64,
    pub created_by_engine: EngineType,
    pub pattern_type: PatternType,
    pub occurrence_count: u32,
}

impl PatternHint {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pattern_id: i64,
        similarity: f64,
        suggested_bbox: Option<BBox>,
        suggested_engine: Option<EngineType>,
        confidence: f64,
        created_by_engine: EngineType,
        pattern_type: PatternType,
        occurrence_count: u32,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&similarity) {
            return Err(PrecedenteError::Validation(format!(
                "invalid similarity: {}",
                similarity
            )));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(PrecedenteError::Validation(format!(
                "invalid confidence: {}",
                confidence
            )));
        }
        Ok(Self {
            pattern_id,
            similarity,
            suggested_bbox,
            suggested_engine,
            confidence,
            created_by_engine,
            pattern_type,
            occurrence_count,
        })
    }

    /// Whether the caller should act on this hint. Callers must never apply
    /// a hint whose `should_use` is false; a low-similarity or
    /// low-confidence hint is returned only for observability.
    pub fn should_use(&self, config: &StoreConfig) -> bool {
        self.similarity >= config.similarity_threshold
            && self.confidence >= config.confidence_threshold
    }
}

/// What actually happened when a page was processed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationResult {
    pub page_num: u32,
    pub engine_used: EngineType,
    pub confidence: f64,
    pub text_length: usize,
    pub pattern_type: PatternType,
    pub bbox: Option<BBox>,
}

impl ObservationResult {
    pub fn new(
        page_num: u32,
        engine_used: EngineType,
        confidence: f64,
        text_length: usize,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(PrecedenteError::Validation(format!(
                "invalid confidence: {}",
                confidence
            )));
        }
        Ok(Self {
            page_num,
            engine_used,
            confidence,
            text_length,
            pattern_type: PatternType::Unknown,
            bbox: None,
        })
    }

    pub fn with_pattern_type(mut self, pattern_type: PatternType) -> Self {
        self.pattern_type = pattern_type;
        self
    }

    pub fn with_bbox(mut self, bbox: BBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

/// Per-engine aggregate over all casos
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub engine: EngineType,
    pub active_patterns: u64,
    pub deprecated_patterns: u64,
    /// Mean confidence over active patterns (0 when there are none)
    pub avg_confidence: f64,
    pub total_occurrences: u64,
}

impl EngineStats {
    /// Combined reliability in [0, 1]: mean confidence weighted against the
    /// inverse deprecation rate.
    pub fn reliability_score(&self) -> f64 {
        let total = self.active_patterns + self.deprecated_patterns;
        if total == 0 {
            return 0.0;
        }
        let deprecation_rate = self.deprecated_patterns as f64 / total as f64;
        self.avg_confidence * 0.7 + (1.0 - deprecation_rate) * 0.3
    }
}

/// Result of [`get_engine_stats`](crate::store::PatternStore::get_engine_stats).
/// Aggregation is best effort: malformed rows are skipped, and the skip
/// count is reported instead of failing the whole query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatsReport {
    pub engines: Vec<EngineStats>,
    pub skipped_rows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_quality_ordering() {
        assert!(EngineType::Marker.quality() > EngineType::Pdfplumber.quality());
        assert!(EngineType::Pdfplumber.quality() > EngineType::Tesseract.quality());
    }

    #[test]
    fn test_engine_roundtrip() {
        for engine in EngineType::all() {
            assert_eq!(engine.as_str().parse::<EngineType>().unwrap(), engine);
        }
        assert!("docx2txt".parse::<EngineType>().is_err());
    }

    #[test]
    fn test_signature_vector_bounds() {
        assert!(SignatureVector::new(vec![]).is_err());
        assert!(SignatureVector::new(vec![0.5; 101]).is_err());
        assert!(SignatureVector::new(vec![0.5; 100]).is_ok());
        assert!(SignatureVector::new(vec![0.5]).is_ok());
    }

    #[test]
    fn test_signature_hash_deterministic() {
        let a = SignatureVector::new(vec![0.1, 0.2, 0.3]).unwrap();
        let b = SignatureVector::new(vec![0.1, 0.2, 0.3]).unwrap();
        let c = SignatureVector::new(vec![0.1, 0.2, 0.4]).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_observation_result_validation() {
        assert!(ObservationResult::new(1, EngineType::Marker, 1.1, 100).is_err());
        assert!(ObservationResult::new(1, EngineType::Marker, -0.1, 100).is_err());
        let result = ObservationResult::new(1, EngineType::Marker, 0.95, 100)
            .unwrap()
            .with_pattern_type(PatternType::Header)
            .with_bbox(BBox::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(result.pattern_type, PatternType::Header);
        assert!(result.bbox.is_some());
    }

    #[test]
    fn test_bbox_from_slice() {
        assert!(BBox::from_slice(&[0.0, 0.0, 100.0]).is_err());
        let bbox = BBox::from_slice(&[0.0, 0.0, 100.0, 50.0]).unwrap();
        assert_eq!(bbox.area(), 5000.0);
    }

    #[test]
    fn test_hint_should_use() {
        let cfg = StoreConfig::default();
        let usable = PatternHint::new(
            1,
            0.92,
            None,
            Some(EngineType::Marker),
            0.9,
            EngineType::Marker,
            PatternType::Header,
            1,
        )
        .unwrap();
        assert!(usable.should_use(&cfg));

        let low_similarity = PatternHint { similarity: 0.6, ..usable.clone() };
        assert!(!low_similarity.should_use(&cfg));

        let low_confidence = PatternHint { confidence: 0.4, ..usable };
        assert!(!low_confidence.should_use(&cfg));
    }

    #[test]
    fn test_hint_validation() {
        assert!(PatternHint::new(
            1,
            1.2,
            None,
            None,
            0.5,
            EngineType::Marker,
            PatternType::Unknown,
            1
        )
        .is_err());
    }

    #[test]
    fn test_reliability_score() {
        let stats = EngineStats {
            engine: EngineType::Marker,
            active_patterns: 8,
            deprecated_patterns: 2,
            avg_confidence: 0.9,
            total_occurrences: 40,
        };
        // 0.9 * 0.7 + 0.8 * 0.3
        assert!((stats.reliability_score() - 0.87).abs() < 1e-9);

        let empty = EngineStats {
            engine: EngineType::Tesseract,
            active_patterns: 0,
            deprecated_patterns: 0,
            avg_confidence: 0.0,
            total_occurrences: 0,
        };
        assert_eq!(empty.reliability_score(), 0.0);
    }
}
