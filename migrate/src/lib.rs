//! # Disco Migrate - relational rows to document collections
//!
//! Disco Migrate folds the flat result sets of a record-collection database
//! (releases, users with wishlists, inventory items with reviews) into the
//! nested documents of a document store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Row dumps  │────▶│   Source    │────▶│  Assembler  │────▶│  JSON files │
//! │ (JSON/CSV)  │     │ (auto-enc)  │     │ (tag+fold)  │     │ (validated) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use disco_migrate::{run_export, DirectorySource, ExportOptions, JsonFileExporter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let report = run_export(
//!         &DirectorySource::new("rows"),
//!         &JsonFileExporter::new("data"),
//!         &ExportOptions::default(),
//!     ).await.unwrap();
//!     println!("Exported {} documents", report.total_documents());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Documents, entities and tagged dates
//! - [`config`] - Environment configuration
//! - [`parser`] - CSV parsing with auto-detection
//! - [`source`] - Row dumps on disk or in memory
//! - [`transform`] - Tagging, dedupe, grouping, assembly and pipeline
//! - [`validation`] - Collection schema validation
//! - [`export`] - Collection files

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Input
pub mod parser;
pub mod source;

// Transformation
pub mod transform;

// Output
pub mod export;
pub mod validation;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AssemblyError, ConfigError, DataIntegrityError, ExportError, MigrateError, MigrateResult,
    SchemaError, SourceError, ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    DocumentSet, Documents, Entity, InventoryDocument, ReleaseDocument, ReviewDocument,
    TaggedDate, UserDocument, WishlistDocument,
};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::MigrateConfig;

// =============================================================================
// Re-exports - Sources
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv,
    parse_csv_file_auto, parse_pg_array, ParseResult,
};
pub use source::{load_rows_file, rows_from_json, DirectorySource, RowSet, RowSource};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::date::{parse_instant, tag as tag_date};
pub use transform::{
    assemble, assemble_all, assemble_inventory, assemble_releases, assemble_users, dedupe,
    fold_rows, GroupedDocument, Row, RowGrouper,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{check_documents, is_valid, schema_for, validate, validate_document, validate_values};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{DocumentSink, ExportSummary, JsonFileExporter};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{fold_entity, run_export, EntityReport, ExportOptions, RunReport};
