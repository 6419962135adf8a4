//! Precedente - Learned Pattern Store for Document Extraction
//!
//! A similarity-indexed cache that lets a judicial document-extraction
//! pipeline remember which processing strategy worked for structurally
//! similar pages, so later pages of the same caso reuse a validated engine
//! choice, bounding box and confidence estimate instead of being
//! re-evaluated from scratch.
//!
//! # Architecture
//!
//! - **Types**: the entity model (Caso, SignatureVector, ObservedPattern,
//!   Divergence, PatternHint, ObservationResult)
//! - **Similarity**: cosine similarity over signature feature vectors
//! - **Signature**: turns page layout attributes into a feature vector
//! - **Store**: the SQLite-backed pattern store with its quality-gated
//!   write policy and divergence-driven deprecation
//!
//! # Example
//!
//! ```ignore
//! use precedente::{
//!     EngineType, ObservationResult, PatternStore, PatternType,
//!     SignatureVector, SqlitePatternStore, StoreConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SqlitePatternStore::new("patterns.db", StoreConfig::default()).await?;
//!     let caso = store.get_or_create_caso("0000001-12.2024.5.01.0001", "pje").await?;
//!
//!     let signature = SignatureVector::new(vec![0.1, 0.2, 0.3, 0.4, 0.5])?;
//!     let hint = store
//!         .find_similar_pattern(caso.id, signature.features(), Some(PatternType::Header))
//!         .await?;
//!
//!     // ... extract the page, honoring the hint when should_use is true ...
//!
//!     let result = ObservationResult::new(1, EngineType::Marker, 0.95, 1200)?
//!         .with_pattern_type(PatternType::Header);
//!     store.learn_from_page(caso.id, &signature, &result, hint.as_ref()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod signature;
pub mod similarity;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::StoreConfig;
pub use error::{PrecedenteError, Result};
pub use similarity::cosine_similarity;
pub use store::{sqlite::SqlitePatternStore, PatternStore};
pub use types::{
    BBox, Caso, Divergence, EngineStats, EngineStatsReport, EngineType, ObservationResult,
    ObservedPattern, PatternHint, PatternType, SignatureVector,
};
