//! SQLite pattern store implementation
//!
//! Single embedded database behind a deadpool-sqlite connection pool.
//! Workers processing different casos share the pool without a global lock;
//! within one caso the pipeline is sequential by design, so a read-then-write
//! race at worst creates a duplicate pattern, never corrupt data.
//!
//! `learn_from_page` runs as one IMMEDIATE transaction so the divergence
//! insert, the divergence count and the deprecation flip are a single atomic
//! unit per pattern.

use crate::config::StoreConfig;
use crate::error::{PrecedenteError, Result};
use crate::similarity::cosine_similarity;
use crate::store::PatternStore;
use crate::types::{
    BBox, Caso, Divergence, EngineStats, EngineStatsReport, EngineType, ObservationResult,
    ObservedPattern, PatternHint, PatternType, SignatureVector,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_sqlite::{Config, Pool, PoolConfig, Runtime};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS casos (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    numero_cnj      TEXT NOT NULL UNIQUE,
    sistema         TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS patterns (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    caso_id           INTEGER NOT NULL REFERENCES casos(id) ON DELETE CASCADE,
    pattern_type      TEXT NOT NULL,
    signature_hash    TEXT NOT NULL,
    signature_vector  TEXT NOT NULL,
    suggested_bbox    TEXT,
    suggested_engine  TEXT,
    confidence        REAL NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
    created_by_engine TEXT NOT NULL,
    deprecated        INTEGER NOT NULL DEFAULT 0,
    first_seen_page   INTEGER NOT NULL,
    last_seen_page    INTEGER NOT NULL,
    occurrence_count  INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patterns_caso ON patterns(caso_id, deprecated);
CREATE INDEX IF NOT EXISTS idx_patterns_hash ON patterns(caso_id, signature_hash);

CREATE TABLE IF NOT EXISTS divergences (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    pattern_id          INTEGER NOT NULL REFERENCES patterns(id) ON DELETE CASCADE,
    page_num            INTEGER NOT NULL,
    expected_confidence REAL NOT NULL,
    actual_confidence   REAL NOT NULL,
    engine_used         TEXT NOT NULL,
    recorded_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_divergences_pattern ON divergences(pattern_id);
";

/// Busy timeout for every pooled connection; writers from different casos
/// contend on SQLite's single write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pattern store backed by an embedded SQLite database
pub struct SqlitePatternStore {
    pool: Pool,
    config: StoreConfig,
}

/// Candidate row carried through the similarity scan
struct Candidate {
    id: i64,
    pattern_type: PatternType,
    similarity: f64,
    suggested_bbox: Option<BBox>,
    suggested_engine: Option<EngineType>,
    confidence: f64,
    created_by_engine: EngineType,
    occurrence_count: u32,
}

impl SqlitePatternStore {
    /// Open (or create) the store at `db_path` with the given configuration.
    pub async fn new<P: AsRef<Path>>(db_path: P, config: StoreConfig) -> Result<Self> {
        config.validate()?;

        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let path_str = db_path.as_ref().to_string_lossy().to_string();
        info!(
            "Opening pattern store at {} (pool_size: {})",
            path_str, config.pool_size
        );

        let mut pool_cfg = Config::new(path_str);
        pool_cfg.pool = Some(PoolConfig::new(config.pool_size));
        let pool = pool_cfg
            .create_pool(Runtime::Tokio1)
            .map_err(|e| PrecedenteError::Pool(format!("failed to create pool: {}", e)))?;

        let store = Self { pool, config };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.checkout().await?;
        conn.interact(|conn| -> Result<()> {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(|e| PrecedenteError::Pool(format!("interact failed: {}", e)))??;

        debug!("Schema initialized");
        Ok(())
    }

    async fn checkout(&self) -> Result<deadpool_sqlite::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| PrecedenteError::Pool(format!("failed to get connection: {}", e)))
    }

    /// Load a full pattern row. Used by diagnostics and tests.
    pub async fn get_pattern(&self, pattern_id: i64) -> Result<ObservedPattern> {
        let conn = self.checkout().await?;
        conn.interact(move |conn| -> Result<ObservedPattern> {
            tune(conn)?;
            load_pattern(conn, pattern_id)
        })
        .await
        .map_err(|e| PrecedenteError::Pool(format!("interact failed: {}", e)))?
    }

    /// All divergences recorded against a pattern, oldest first.
    pub async fn get_divergences(&self, pattern_id: i64) -> Result<Vec<Divergence>> {
        let conn = self.checkout().await?;
        conn.interact(move |conn| -> Result<Vec<Divergence>> {
            tune(conn)?;
            let mut stmt = conn.prepare(
                "SELECT id, pattern_id, page_num, expected_confidence, actual_confidence,
                        engine_used, recorded_at
                 FROM divergences WHERE pattern_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![pattern_id], |row| {
                Ok(Divergence {
                    id: row.get(0)?,
                    pattern_id: row.get(1)?,
                    page_num: row.get::<_, i64>(2)? as u32,
                    expected_confidence: row.get(3)?,
                    actual_confidence: row.get(4)?,
                    engine_used: parse_engine(5, &row.get::<_, String>(5)?)?,
                    recorded_at: parse_ts(6, &row.get::<_, String>(6)?)?,
                })
            })?;
            let divergences = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(divergences)
        })
        .await
        .map_err(|e| PrecedenteError::Pool(format!("interact failed: {}", e)))?
    }
}

#[async_trait]
impl PatternStore for SqlitePatternStore {
    async fn get_or_create_caso(&self, numero_cnj: &str, sistema: &str) -> Result<Caso> {
        let conn = self.checkout().await?;
        let numero_cnj = numero_cnj.to_string();
        let sistema = sistema.to_string();

        conn.interact(move |conn| -> Result<Caso> {
            tune(conn)?;
            let now = Utc::now().to_rfc3339();

            // INSERT OR IGNORE keeps this race-safe across pooled writers:
            // the first writer wins, everyone reads the surviving row.
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO casos (numero_cnj, sistema, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![numero_cnj, sistema, now],
            )?;
            if inserted > 0 {
                info!("Created caso {}", numero_cnj);
            }

            let caso = conn.query_row(
                "SELECT id, numero_cnj, sistema, created_at, updated_at
                 FROM casos WHERE numero_cnj = ?1",
                params![numero_cnj],
                |row| {
                    Ok(Caso {
                        id: row.get(0)?,
                        numero_cnj: row.get(1)?,
                        sistema: row.get(2)?,
                        created_at: parse_ts(3, &row.get::<_, String>(3)?)?,
                        updated_at: parse_ts(4, &row.get::<_, String>(4)?)?,
                    })
                },
            )?;
            Ok(caso)
        })
        .await
        .map_err(|e| PrecedenteError::Pool(format!("interact failed: {}", e)))?
    }

    async fn find_similar_pattern(
        &self,
        caso_id: i64,
        signature_vector: &[f64],
        pattern_type: Option<PatternType>,
    ) -> Result<Option<PatternHint>> {
        let conn = self.checkout().await?;
        let query = signature_vector.to_vec();
        let cfg = self.config.clone();

        conn.interact(move |conn| -> Result<Option<PatternHint>> {
            tune(conn)?;
            ensure_caso(conn, caso_id)?;

            let best = match best_candidate(conn, caso_id, &query, pattern_type)? {
                Some(c) => c,
                None => return Ok(None),
            };

            if best.similarity < cfg.similarity_noise_floor {
                debug!(
                    "Best match for caso {} below noise floor ({:.3} < {:.3})",
                    caso_id, best.similarity, cfg.similarity_noise_floor
                );
                return Ok(None);
            }

            let hint = PatternHint::new(
                best.id,
                best.similarity.clamp(0.0, 1.0),
                best.suggested_bbox,
                best.suggested_engine,
                best.confidence,
                best.created_by_engine,
                best.pattern_type,
                best.occurrence_count,
            )?;
            debug!(
                "Found similar pattern {} (similarity={:.3}, type={}, usable={})",
                hint.pattern_id,
                hint.similarity,
                hint.pattern_type,
                hint.should_use(&cfg)
            );
            Ok(Some(hint))
        })
        .await
        .map_err(|e| PrecedenteError::Pool(format!("interact failed: {}", e)))?
    }

    async fn should_update_pattern(
        &self,
        pattern_id: i64,
        result: &ObservationResult,
    ) -> Result<bool> {
        let conn = self.checkout().await?;
        let incoming = result.engine_used;

        conn.interact(move |conn| -> Result<bool> {
            tune(conn)?;
            let created_by = load_created_by_engine(conn, pattern_id)?;
            let allowed = incoming.quality() >= created_by.quality();
            if !allowed {
                debug!(
                    "Skipping update of pattern {}: {} (q={:.2}) < {} (q={:.2})",
                    pattern_id,
                    incoming,
                    incoming.quality(),
                    created_by,
                    created_by.quality()
                );
            }
            Ok(allowed)
        })
        .await
        .map_err(|e| PrecedenteError::Pool(format!("interact failed: {}", e)))?
    }

    async fn learn_from_page(
        &self,
        caso_id: i64,
        signature: &SignatureVector,
        result: &ObservationResult,
        hint: Option<&PatternHint>,
    ) -> Result<i64> {
        let conn = self.checkout().await?;
        let cfg = self.config.clone();
        let signature = signature.clone();
        let result = result.clone();
        let hint = hint.cloned();

        conn.interact(move |conn| -> Result<i64> {
            tune(conn)?;
            // IMMEDIATE takes the write lock up front so the divergence
            // insert, count and deprecation flip cannot interleave.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            ensure_caso(&tx, caso_id)?;

            let usable = hint.as_ref().filter(|h| h.should_use(&cfg));
            let pattern_id = match usable {
                Some(h) => {
                    let created_by = load_created_by_engine(&tx, h.pattern_id)?;
                    let gap = (h.confidence - result.confidence).abs();

                    if gap > cfg.divergence_tolerance {
                        // A diverging result never touches the stored
                        // suggestion; it only accumulates toward deprecation.
                        let deprecated = record_divergence(
                            &tx,
                            h.pattern_id,
                            &result,
                            h.confidence,
                            cfg.deprecation_threshold,
                        )?;
                        warn!(
                            "Divergence on pattern {}: expected={:.3}, actual={:.3}{}",
                            h.pattern_id,
                            h.confidence,
                            result.confidence,
                            if deprecated { " (pattern deprecated)" } else { "" }
                        );
                    } else if result.engine_used.quality() >= created_by.quality() {
                        refresh_pattern(&tx, h.pattern_id, &result)?;
                        debug!("Refreshed pattern {} after confirmation", h.pattern_id);
                    } else {
                        // Inferior engine confirming: a hit, but the stored
                        // fields stay as the superior engine left them.
                        debug!(
                            "Pattern {} confirmed by inferior engine {}; left untouched",
                            h.pattern_id, result.engine_used
                        );
                    }
                    h.pattern_id
                }
                None => {
                    // No usable prediction: exact-hash shortcut, then a
                    // similarity rescan, before creating anything new.
                    let mut existing =
                        find_by_hash(&tx, caso_id, signature.hash(), result.pattern_type)?;
                    if existing.is_none() {
                        if let Some(c) = best_candidate(
                            &tx,
                            caso_id,
                            signature.features(),
                            Some(result.pattern_type),
                        )? {
                            if c.similarity >= cfg.similarity_threshold {
                                existing = Some(c.id);
                            }
                        }
                    }

                    match existing {
                        Some(id) => {
                            let created_by = load_created_by_engine(&tx, id)?;
                            if result.engine_used.quality() >= created_by.quality() {
                                refresh_pattern(&tx, id, &result)?;
                            }
                            id
                        }
                        None => insert_pattern(&tx, caso_id, &signature, &result)?,
                    }
                }
            };

            tx.commit()?;
            Ok(pattern_id)
        })
        .await
        .map_err(|e| PrecedenteError::Pool(format!("interact failed: {}", e)))?
    }

    async fn get_pattern_count(&self, caso_id: i64, deprecated: bool) -> Result<u64> {
        let conn = self.checkout().await?;
        conn.interact(move |conn| -> Result<u64> {
            tune(conn)?;
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM patterns WHERE caso_id = ?1 AND deprecated = ?2",
                params![caso_id, deprecated],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(|e| PrecedenteError::Pool(format!("interact failed: {}", e)))?
    }

    async fn get_engine_stats(&self) -> Result<EngineStatsReport> {
        let conn = self.checkout().await?;
        conn.interact(move |conn| -> Result<EngineStatsReport> {
            tune(conn)?;
            let mut stmt = conn.prepare(
                "SELECT created_by_engine, deprecated, confidence, occurrence_count
                 FROM patterns",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, bool>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?;

            struct Acc {
                active: u64,
                deprecated: u64,
                confidence_sum: f64,
                occurrences: u64,
            }
            let mut by_engine: HashMap<EngineType, Acc> = HashMap::new();
            let mut skipped = 0u64;

            for row in rows {
                // Best-effort aggregation: a malformed row is skipped and
                // counted, not fatal.
                let (engine_str, deprecated, confidence, occurrences) = match row {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("Skipping malformed pattern row: {}", e);
                        skipped += 1;
                        continue;
                    }
                };
                let engine = match EngineType::from_str(&engine_str) {
                    Ok(e) => e,
                    Err(_) => {
                        warn!("Skipping pattern row with unknown engine: {}", engine_str);
                        skipped += 1;
                        continue;
                    }
                };
                let acc = by_engine.entry(engine).or_insert(Acc {
                    active: 0,
                    deprecated: 0,
                    confidence_sum: 0.0,
                    occurrences: 0,
                });
                if deprecated {
                    acc.deprecated += 1;
                } else {
                    acc.active += 1;
                    acc.confidence_sum += confidence;
                }
                acc.occurrences += occurrences.max(0) as u64;
            }

            let engines = EngineType::all()
                .into_iter()
                .filter_map(|engine| {
                    by_engine.get(&engine).map(|acc| EngineStats {
                        engine,
                        active_patterns: acc.active,
                        deprecated_patterns: acc.deprecated,
                        avg_confidence: if acc.active > 0 {
                            acc.confidence_sum / acc.active as f64
                        } else {
                            0.0
                        },
                        total_occurrences: acc.occurrences,
                    })
                })
                .collect();

            Ok(EngineStatsReport {
                engines,
                skipped_rows: skipped,
            })
        })
        .await
        .map_err(|e| PrecedenteError::Pool(format!("interact failed: {}", e)))?
    }
}

fn tune(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)
}

fn ensure_caso(conn: &Connection, caso_id: i64) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM casos WHERE id = ?1",
            params![caso_id],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(PrecedenteError::CasoNotFound(caso_id));
    }
    Ok(())
}

fn load_created_by_engine(conn: &Connection, pattern_id: i64) -> Result<EngineType> {
    let engine_str: Option<String> = conn
        .query_row(
            "SELECT created_by_engine FROM patterns WHERE id = ?1",
            params![pattern_id],
            |row| row.get(0),
        )
        .optional()?;
    match engine_str {
        Some(s) => EngineType::from_str(&s),
        None => Err(PrecedenteError::PatternNotFound(pattern_id)),
    }
}

/// Linear scan over the caso's non-deprecated patterns, computing cosine
/// similarity against each. Ties break on confidence, then on the most
/// recently created row. Per-case pattern counts are small by design, so a
/// scan beats any index here.
fn best_candidate(
    conn: &Connection,
    caso_id: i64,
    query: &[f64],
    pattern_type: Option<PatternType>,
) -> Result<Option<Candidate>> {
    type Raw = (
        i64,
        String,
        String,
        Option<String>,
        Option<String>,
        f64,
        String,
        i64,
    );
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Raw> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
        ))
    };

    const BASE: &str = "SELECT id, pattern_type, signature_vector, suggested_bbox,
                               suggested_engine, confidence, created_by_engine, occurrence_count
                        FROM patterns WHERE caso_id = ?1 AND deprecated = 0";

    let rows: Vec<Raw> = match pattern_type {
        Some(pt) => {
            let mut stmt = conn.prepare(&format!("{} AND pattern_type = ?2 ORDER BY id", BASE))?;
            let rows = stmt.query_map(params![caso_id, pt.as_str()], map_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!("{} ORDER BY id", BASE))?;
            let rows = stmt.query_map(params![caso_id], map_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
    };

    let mut best: Option<Candidate> = None;
    for (id, pt_str, vector_json, bbox_json, engine_str, confidence, created_by_str, occ) in rows {
        let stored: Vec<f64> = serde_json::from_str(&vector_json)?;
        let similarity = cosine_similarity(query, &stored)?;

        let better = match &best {
            None => true,
            // ties prefer higher confidence, then the newer row; rows
            // iterate in id order so >= picks the newest
            Some(b) => {
                similarity > b.similarity
                    || (similarity == b.similarity && confidence >= b.confidence)
            }
        };
        if !better {
            continue;
        }

        best = Some(Candidate {
            id,
            pattern_type: PatternType::from_str(&pt_str)?,
            similarity,
            suggested_bbox: bbox_json
                .as_deref()
                .map(serde_json::from_str::<BBox>)
                .transpose()?,
            suggested_engine: engine_str
                .as_deref()
                .map(EngineType::from_str)
                .transpose()?,
            confidence,
            created_by_engine: EngineType::from_str(&created_by_str)?,
            occurrence_count: occ.max(0) as u32,
        });
    }

    Ok(best)
}

fn find_by_hash(
    conn: &Connection,
    caso_id: i64,
    signature_hash: &str,
    pattern_type: PatternType,
) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM patterns
             WHERE caso_id = ?1 AND signature_hash = ?2 AND pattern_type = ?3
               AND deprecated = 0
             ORDER BY id DESC LIMIT 1",
            params![caso_id, signature_hash, pattern_type.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn insert_pattern(
    conn: &Connection,
    caso_id: i64,
    signature: &SignatureVector,
    result: &ObservationResult,
) -> Result<i64> {
    let now = Utc::now().to_rfc3339();
    let vector_json = serde_json::to_string(signature.features())?;
    let bbox_json = result.bbox.map(|b| serde_json::to_string(&b)).transpose()?;

    conn.execute(
        "INSERT INTO patterns (
            caso_id, pattern_type, signature_hash, signature_vector,
            suggested_bbox, suggested_engine, confidence, created_by_engine,
            deprecated, first_seen_page, last_seen_page, occurrence_count,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?6, 0, ?8, ?8, 1, ?9, ?9)",
        params![
            caso_id,
            result.pattern_type.as_str(),
            signature.hash(),
            vector_json,
            bbox_json,
            result.engine_used.as_str(),
            result.confidence,
            result.page_num,
            now,
        ],
    )?;

    let pattern_id = conn.last_insert_rowid();
    info!(
        "Created pattern {}: type={}, page={}, engine={}",
        pattern_id, result.pattern_type, result.page_num, result.engine_used
    );
    Ok(pattern_id)
}

/// Refresh a pattern from a converging observation. Caller has already
/// passed the quality gate.
fn refresh_pattern(conn: &Connection, pattern_id: i64, result: &ObservationResult) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let bbox_json = result.bbox.map(|b| serde_json::to_string(&b)).transpose()?;

    let updated = conn.execute(
        "UPDATE patterns SET
            confidence = ?2,
            suggested_bbox = COALESCE(?3, suggested_bbox),
            suggested_engine = ?4,
            created_by_engine = ?4,
            last_seen_page = ?5,
            occurrence_count = occurrence_count + 1,
            updated_at = ?6
         WHERE id = ?1",
        params![
            pattern_id,
            result.confidence,
            bbox_json,
            result.engine_used.as_str(),
            result.page_num,
            now,
        ],
    )?;
    if updated == 0 {
        return Err(PrecedenteError::PatternNotFound(pattern_id));
    }
    Ok(())
}

/// Append a divergence and, if the pattern has accumulated enough of them,
/// flip `deprecated` in the same transaction. Returns whether the pattern is
/// now deprecated. The flag is one-way: this is the only place that sets it
/// and nothing ever clears it.
fn record_divergence(
    conn: &Connection,
    pattern_id: i64,
    result: &ObservationResult,
    expected_confidence: f64,
    deprecation_threshold: u32,
) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO divergences (
            pattern_id, page_num, expected_confidence, actual_confidence,
            engine_used, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            pattern_id,
            result.page_num,
            expected_confidence,
            result.confidence,
            result.engine_used.as_str(),
            now,
        ],
    )?;

    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM divergences WHERE pattern_id = ?1",
        params![pattern_id],
        |row| row.get(0),
    )?;

    if count >= deprecation_threshold as i64 {
        conn.execute(
            "UPDATE patterns SET deprecated = 1, updated_at = ?2 WHERE id = ?1",
            params![pattern_id, now],
        )?;
        return Ok(true);
    }
    Ok(false)
}

fn load_pattern(conn: &Connection, pattern_id: i64) -> Result<ObservedPattern> {
    let pattern = conn
        .query_row(
            "SELECT id, caso_id, pattern_type, signature_hash, signature_vector,
                    suggested_bbox, suggested_engine, confidence, created_by_engine,
                    deprecated, first_seen_page, last_seen_page, occurrence_count,
                    created_at, updated_at
             FROM patterns WHERE id = ?1",
            params![pattern_id],
            |row| {
                Ok(ObservedPattern {
                    id: row.get(0)?,
                    caso_id: row.get(1)?,
                    pattern_type: parse_pattern_type(2, &row.get::<_, String>(2)?)?,
                    signature_hash: row.get(3)?,
                    signature_vector: parse_json(4, &row.get::<_, String>(4)?)?,
                    suggested_bbox: row
                        .get::<_, Option<String>>(5)?
                        .map(|s| parse_json::<BBox>(5, &s))
                        .transpose()?,
                    suggested_engine: row
                        .get::<_, Option<String>>(6)?
                        .map(|s| parse_engine(6, &s))
                        .transpose()?,
                    confidence: row.get(7)?,
                    created_by_engine: parse_engine(8, &row.get::<_, String>(8)?)?,
                    deprecated: row.get(9)?,
                    first_seen_page: row.get::<_, i64>(10)? as u32,
                    last_seen_page: row.get::<_, i64>(11)? as u32,
                    occurrence_count: row.get::<_, i64>(12)?.max(0) as u32,
                    created_at: parse_ts(13, &row.get::<_, String>(13)?)?,
                    updated_at: parse_ts(14, &row.get::<_, String>(14)?)?,
                })
            },
        )
        .optional()?;
    pattern.ok_or(PrecedenteError::PatternNotFound(pattern_id))
}

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_engine(idx: usize, s: &str) -> rusqlite::Result<EngineType> {
    EngineType::from_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_pattern_type(idx: usize, s: &str) -> rusqlite::Result<PatternType> {
    PatternType::from_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, s: &str) -> rusqlite::Result<T> {
    serde_json::from_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
