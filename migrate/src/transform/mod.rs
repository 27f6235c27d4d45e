//! Transformation module.
//!
//! This module turns flat join rows into nested documents:
//! - Date: tagging of date columns
//! - Dedupe: aggregate arrays without nulls or repeats
//! - Row: lenient column accessors
//! - Grouper: rows to documents by group key
//! - Assembler: the release, user and inventory folds
//! - Pipeline: source to sink, entity by entity

pub mod assembler;
pub mod date;
pub mod dedupe;
pub mod grouper;
pub mod pipeline;
pub mod row;

pub use assembler::{assemble, assemble_all, assemble_inventory, assemble_releases, assemble_users};
pub use dedupe::{dedupe, dedupe_ids, dedupe_names};
pub use grouper::{fold_rows, FoldError, GroupedDocument, RowGrouper};
pub use pipeline::*;
pub use row::{Columns, Row};
