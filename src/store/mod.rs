//! Storage layer for the Precedente pattern store
//!
//! Defines the backend contract and the SQLite implementation. The store is
//! the only component that talks to persistence; the pipeline consumes its
//! hints and feeds back observation results.

pub mod sqlite;

use crate::error::Result;
use crate::types::{
    Caso, EngineStatsReport, ObservationResult, PatternHint, PatternType, SignatureVector,
};
use async_trait::async_trait;

/// Backend contract for the pattern store
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Idempotent upsert keyed on `numero_cnj`. An existing caso keeps its
    /// originally recorded `sistema` (first write wins).
    async fn get_or_create_caso(&self, numero_cnj: &str, sistema: &str) -> Result<Caso>;

    /// Nearest-neighbor search over the caso's non-deprecated patterns,
    /// optionally restricted to one `pattern_type`. Pure read.
    ///
    /// Returns `None` when no candidate scores above the configured noise
    /// floor. A returned hint is not necessarily usable: callers must check
    /// [`PatternHint::should_use`](crate::types::PatternHint::should_use).
    async fn find_similar_pattern(
        &self,
        caso_id: i64,
        signature_vector: &[f64],
        pattern_type: Option<PatternType>,
    ) -> Result<Option<PatternHint>>;

    /// Quality gate for overwrites: true iff the incoming engine's quality
    /// is greater than or equal to the quality of the engine that created
    /// or last validated the pattern.
    async fn should_update_pattern(
        &self,
        pattern_id: i64,
        result: &ObservationResult,
    ) -> Result<bool>;

    /// Sole write path. Creates a pattern, refreshes one, or records a
    /// divergence, depending on the supplied hint and observation. Returns
    /// the id of the pattern involved.
    async fn learn_from_page(
        &self,
        caso_id: i64,
        signature: &SignatureVector,
        result: &ObservationResult,
        hint: Option<&PatternHint>,
    ) -> Result<i64>;

    /// Count the caso's patterns, filtered by deprecation flag
    async fn get_pattern_count(&self, caso_id: i64, deprecated: bool) -> Result<u64>;

    /// Per-engine aggregate of patterns across all casos. Best-effort:
    /// malformed rows are skipped and counted, not fatal.
    async fn get_engine_stats(&self) -> Result<EngineStatsReport>;
}
