//! High-level pipeline API: row dumps to exported collections.
//!
//! Entities are processed one at a time, in [`Entity::ALL`] order:
//!
//! 1. Load the rows from the [`RowSource`]
//! 2. Assemble documents (tag dates, dedupe aggregates, fold)
//! 3. Validate them against the embedded schema (optional)
//! 4. Hand them to the [`DocumentSink`]
//!
//! The first failure stops the run. Collections written before it stay
//! written; the failing collection is never written.
//!
//! # Example
//!
//! ```rust,ignore
//! use disco_migrate::{run_export, DirectorySource, ExportOptions, JsonFileExporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = run_export(
//!         &DirectorySource::new("rows"),
//!         &JsonFileExporter::new("data"),
//!         &ExportOptions::default(),
//!     ).await?;
//!
//!     println!("Exported {} documents", report.total_documents());
//!     Ok(())
//! }
//! ```

use serde_json::Value;
use std::path::PathBuf;
use tracing::{info, warn};

use super::assembler::assemble;
use super::row::Row;
use crate::error::{MigrateError, MigrateResult, SchemaError};
use crate::export::DocumentSink;
use crate::models::Entity;
use crate::source::RowSource;
use crate::validation::check_documents;

/// Options for an export run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Entities to export, in order
    pub entities: Vec<Entity>,

    /// Schema-check documents before writing them
    pub validate: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            entities: Entity::ALL.to_vec(),
            validate: true,
        }
    }
}

/// Outcome of one exported entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReport {
    pub entity: Entity,
    pub rows: usize,
    pub documents: usize,
    pub path: PathBuf,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub exported: Vec<EntityReport>,
}

impl RunReport {
    pub fn total_documents(&self) -> usize {
        self.exported.iter().map(|r| r.documents).sum()
    }
}

/// Export every requested entity from `source` into `sink`.
pub async fn run_export<S, K>(source: &S, sink: &K, options: &ExportOptions) -> MigrateResult<RunReport>
where
    S: RowSource,
    K: DocumentSink,
{
    let mut report = RunReport::default();

    for &entity in &options.entities {
        match export_entity(source, sink, entity, options.validate).await {
            Ok(entry) => report.exported.push(entry),
            Err(err) => {
                warn!(
                    %entity,
                    exported = report.exported.len(),
                    error = %err,
                    "export aborted"
                );
                return Err(err);
            }
        }
    }

    info!(
        collections = report.exported.len(),
        documents = report.total_documents(),
        "export finished"
    );
    Ok(report)
}

async fn export_entity<S, K>(source: &S, sink: &K, entity: Entity, validate: bool) -> MigrateResult<EntityReport>
where
    S: RowSource,
    K: DocumentSink,
{
    let rows = source.load(entity)?;
    let documents = assemble(entity, &rows)?;
    info!(%entity, rows = rows.len(), documents = documents.len(), "assembled");

    if validate {
        check_documents(&documents)?;
    } else {
        info!(%entity, "schema validation skipped");
    }

    let summary = sink.write(&documents).await?;
    Ok(EntityReport {
        entity,
        rows: rows.len(),
        documents: summary.documents,
        path: summary.path,
    })
}

/// Assemble one entity and return its documents as JSON values.
pub fn fold_entity(entity: Entity, rows: &[Row]) -> MigrateResult<Vec<Value>> {
    let documents = assemble(entity, rows)?;
    documents
        .to_values()
        .map_err(|e| MigrateError::Schema(SchemaError::Serialize(e)))
}
