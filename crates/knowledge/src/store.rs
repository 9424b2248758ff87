//! SQLite persistence for index artifacts.
//!
//! One file per artifact. Tables:
//! - `meta(key, value)`: format version, metric, vectorizer state (JSON),
//!   dimensions, build time
//! - `sources`: one row per document with its content hash, in build order
//! - `chunks`: one row per chunk keyed by position, vector as a
//!   little-endian f32 blob
//!
//! Saving writes a sibling temporary file and renames it over the target,
//! so a reader opens either the previous artifact or the new one.

use crate::artifact::IndexArtifact;
use crate::index::{FlatIndex, SimilarityMetric};
use crate::types::{Chunk, SourceRecord};
use crate::vectorizer::VectorizerState;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use vaultqa_core::{AppError, AppResult};

/// Bumped whenever the schema or encoding changes.
pub const FORMAT_VERSION: u32 = 1;

const SCHEMA: &str = r#"
    CREATE TABLE meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE sources (
        source TEXT PRIMARY KEY,
        content_hash TEXT NOT NULL,
        byte_count INTEGER NOT NULL,
        chunk_count INTEGER NOT NULL
    );

    CREATE TABLE chunks (
        position INTEGER PRIMARY KEY,
        source TEXT NOT NULL,
        chunk_id INTEGER NOT NULL,
        text TEXT NOT NULL,
        vector BLOB NOT NULL
    );

    CREATE INDEX idx_chunks_source ON chunks(source);
"#;

/// Persist `artifact` at `path`, replacing any previous artifact.
pub fn save_artifact(path: &Path, artifact: &IndexArtifact) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path_for(path);
    if temp_path.exists() {
        fs::remove_file(&temp_path)?;
    }

    if let Err(e) = write_database(&temp_path, artifact) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path)?;

    tracing::info!(
        "Saved index artifact to {:?} ({} chunks, dim={})",
        path,
        artifact.len(),
        artifact.index().dimensions()
    );
    Ok(())
}

/// Load the artifact stored at `path`.
///
/// Fails with `IndexNotReady` when no artifact exists, `DimensionMismatch`
/// when stored vectors disagree with the recorded width, and `Storage` for
/// anything else that does not add up.
pub fn load_artifact(path: &Path) -> AppResult<IndexArtifact> {
    if !path.exists() {
        return Err(AppError::IndexNotReady);
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| storage_error("open index", e))?;

    let meta = read_meta(&conn)?;

    let version = meta_value(&meta, "format_version")?;
    if version != FORMAT_VERSION.to_string() {
        return Err(AppError::Storage(format!(
            "Unsupported index format version {} (expected {})",
            version, FORMAT_VERSION
        )));
    }

    let metric: SimilarityMetric = meta_value(&meta, "metric")?.parse()?;
    let vectorizer: VectorizerState = serde_json::from_str(meta_value(&meta, "vectorizer")?)?;
    let dimensions: usize = meta_value(&meta, "dimensions")?
        .parse()
        .map_err(|e| AppError::Storage(format!("Invalid dimensions in index meta: {}", e)))?;
    let built_at = DateTime::parse_from_rfc3339(meta_value(&meta, "built_at")?)
        .map_err(|e| AppError::Storage(format!("Invalid built_at in index meta: {}", e)))?
        .with_timezone(&Utc);

    if dimensions != vectorizer.dimensions() {
        return Err(AppError::DimensionMismatch {
            expected: vectorizer.dimensions(),
            actual: dimensions,
        });
    }

    let sources = read_sources(&conn)?;
    let (chunks, vectors) = read_chunks(&conn, dimensions)?;
    let index = FlatIndex::with_dimensions(dimensions, vectors, metric)?;

    tracing::debug!(
        "Loaded index artifact from {:?}: {} chunks, {} sources, dim={}",
        path,
        chunks.len(),
        sources.len(),
        dimensions
    );

    IndexArtifact::new(vectorizer, index, chunks, sources, built_at)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index.sqlite".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_database(path: &Path, artifact: &IndexArtifact) -> AppResult<()> {
    let mut conn = Connection::open(path).map_err(|e| storage_error("create index", e))?;
    conn.execute_batch(SCHEMA)
        .map_err(|e| storage_error("create tables", e))?;

    let tx = conn
        .transaction()
        .map_err(|e| storage_error("begin transaction", e))?;

    {
        let vectorizer_json = serde_json::to_string(artifact.vectorizer())?;
        let meta = [
            ("format_version", FORMAT_VERSION.to_string()),
            ("metric", artifact.index().metric().as_str().to_string()),
            ("vectorizer", vectorizer_json),
            ("dimensions", artifact.index().dimensions().to_string()),
            ("built_at", artifact.built_at().to_rfc3339()),
        ];

        let mut insert_meta = tx
            .prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")
            .map_err(|e| storage_error("prepare meta insert", e))?;
        for (key, value) in &meta {
            insert_meta
                .execute(params![key, value])
                .map_err(|e| storage_error("insert meta", e))?;
        }

        let mut insert_source = tx
            .prepare(
                "INSERT INTO sources (source, content_hash, byte_count, chunk_count)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| storage_error("prepare source insert", e))?;
        for source in artifact.sources() {
            insert_source
                .execute(params![
                    source.source,
                    source.content_hash,
                    source.byte_count as i64,
                    source.chunk_count as i64,
                ])
                .map_err(|e| storage_error("insert source", e))?;
        }

        let mut insert_chunk = tx
            .prepare(
                "INSERT INTO chunks (position, source, chunk_id, text, vector)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(|e| storage_error("prepare chunk insert", e))?;
        for (position, (chunk, vector)) in artifact
            .chunks()
            .iter()
            .zip(artifact.index().vectors())
            .enumerate()
        {
            insert_chunk
                .execute(params![
                    position as i64,
                    chunk.source,
                    chunk.chunk_id as i64,
                    chunk.text,
                    vector_to_bytes(vector),
                ])
                .map_err(|e| storage_error("insert chunk", e))?;
        }
    }

    tx.commit().map_err(|e| storage_error("commit index", e))?;
    Ok(())
}

fn read_meta(conn: &Connection) -> AppResult<HashMap<String, String>> {
    let mut stmt = conn
        .prepare("SELECT key, value FROM meta")
        .map_err(|e| storage_error("read meta", e))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| storage_error("read meta", e))?;
    rows.collect::<Result<_, _>>()
        .map_err(|e| storage_error("read meta", e))
}

fn meta_value<'a>(meta: &'a HashMap<String, String>, key: &str) -> AppResult<&'a str> {
    meta.get(key)
        .map(String::as_str)
        .ok_or_else(|| AppError::Storage(format!("Index meta is missing '{}'", key)))
}

fn read_sources(conn: &Connection) -> AppResult<Vec<SourceRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT source, content_hash, byte_count, chunk_count FROM sources ORDER BY rowid",
        )
        .map_err(|e| storage_error("read sources", e))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SourceRecord {
                source: row.get(0)?,
                content_hash: row.get(1)?,
                byte_count: row.get::<_, i64>(2)? as u64,
                chunk_count: row.get::<_, i64>(3)? as u32,
            })
        })
        .map_err(|e| storage_error("read sources", e))?;
    rows.collect::<Result<_, _>>()
        .map_err(|e| storage_error("read sources", e))
}

type ChunkRow = (i64, String, i64, String, Vec<u8>);

fn read_chunks(conn: &Connection, dimensions: usize) -> AppResult<(Vec<Chunk>, Vec<Vec<f32>>)> {
    let mut stmt = conn
        .prepare("SELECT position, source, chunk_id, text, vector FROM chunks ORDER BY position")
        .map_err(|e| storage_error("read chunks", e))?;
    let rows = stmt
        .query_map([], |row| -> rusqlite::Result<ChunkRow> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })
        .map_err(|e| storage_error("read chunks", e))?;

    let mut chunks = Vec::new();
    let mut vectors = Vec::new();

    for (expected, row) in rows.enumerate() {
        let (position, source, chunk_id, text, blob) =
            row.map_err(|e| storage_error("read chunks", e))?;

        if position != expected as i64 {
            return Err(AppError::Storage(format!(
                "Chunk positions are not contiguous: expected {}, found {}",
                expected, position
            )));
        }

        let vector = bytes_to_vector(&blob)?;
        if vector.len() != dimensions {
            return Err(AppError::DimensionMismatch {
                expected: dimensions,
                actual: vector.len(),
            });
        }

        let chunk_id = u32::try_from(chunk_id).map_err(|_| {
            AppError::Storage(format!("Invalid chunk_id {} at position {}", chunk_id, position))
        })?;

        chunks.push(Chunk {
            source,
            chunk_id,
            text,
        });
        vectors.push(vector);
    }

    Ok((chunks, vectors))
}

fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn bytes_to_vector(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Storage(format!(
            "Invalid vector blob length {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn storage_error(action: &str, e: rusqlite::Error) -> AppError {
    AppError::Storage(format!("Failed to {}: {}", action, e))
}
