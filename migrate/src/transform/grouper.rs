//! Fold flat join rows into one document per group key.
//!
//! A one-to-many join repeats the parent columns once per child row. The
//! grouper keeps an append-only arena of documents plus a key index, so the
//! first row of a key opens the document and every later row for that key
//! is absorbed into it, wherever it appears in the input.
//!
//! ```text
//! Join rows (flat)                 →  Documents (nested)
//! ┌──────────────────────────┐       ┌──────────────────────────┐
//! │ user 7, wishlist A, [1,2]│       │ user 7                   │
//! │ user 9, wishlist -       │  →    │ wishlists: [A, B]        │
//! │ user 7, wishlist B, [3]  │       ├──────────────────────────┤
//! └──────────────────────────┘       │ user 9                   │
//!                                    │ wishlists: null          │
//!                                    └──────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use super::row::Row;
use crate::error::{AssemblyError, AssemblyResult, DataIntegrityError, ValidationError};
use crate::models::Entity;

/// Why a row could not be folded into its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldError {
    /// A field of the row is unusable.
    Invalid(ValidationError),
    /// The row repeats the key but contradicts the document.
    Conflict(String),
}

impl From<ValidationError> for FoldError {
    fn from(err: ValidationError) -> Self {
        FoldError::Invalid(err)
    }
}

impl FoldError {
    fn into_assembly(self, entity: Entity, key: String) -> AssemblyError {
        match self {
            FoldError::Invalid(source) => AssemblyError::Validation { entity, key, source },
            FoldError::Conflict(detail) => {
                DataIntegrityError::DuplicateKey { entity, key, detail }.into()
            }
        }
    }
}

/// A document built from one or more rows sharing a key.
pub trait GroupedDocument: Sized {
    /// Entity reported in errors.
    const ENTITY: Entity;

    type Key: Eq + Hash + Clone + fmt::Display;

    /// Key of the document a row belongs to.
    fn group_key(row: &Row) -> Result<Self::Key, ValidationError>;

    /// Build the document from the first row seen for its key.
    fn open(key: &Self::Key, row: &Row) -> Result<Self, FoldError>;

    /// Merge a later row with the same key.
    fn absorb(&mut self, row: &Row) -> Result<(), FoldError>;
}

/// Accumulator of documents in first-seen key order.
pub struct RowGrouper<D: GroupedDocument> {
    index: HashMap<D::Key, usize>,
    documents: Vec<D>,
    rows: usize,
}

impl<D: GroupedDocument> RowGrouper<D> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            documents: Vec::new(),
            rows: 0,
        }
    }

    /// Fold one row into the accumulator.
    pub fn push(&mut self, row: &Row) -> AssemblyResult<()> {
        let key = D::group_key(row).map_err(|source| AssemblyError::Validation {
            entity: D::ENTITY,
            key: unknown_key(row),
            source,
        })?;
        self.rows += 1;

        match self.index.get(&key) {
            Some(&pos) => self.documents[pos]
                .absorb(row)
                .map_err(|e| e.into_assembly(D::ENTITY, key.to_string())),
            None => {
                let document =
                    D::open(&key, row).map_err(|e| e.into_assembly(D::ENTITY, key.to_string()))?;
                self.index.insert(key, self.documents.len());
                self.documents.push(document);
                Ok(())
            }
        }
    }

    /// Documents folded so far.
    pub fn documents(&self) -> &[D] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of rows folded so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(self) -> Vec<D> {
        self.documents
    }
}

impl<D: GroupedDocument> Default for RowGrouper<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold a whole row sequence. Fails on the first bad row.
pub fn fold_rows<D: GroupedDocument>(rows: &[Row]) -> AssemblyResult<Vec<D>> {
    let mut grouper = RowGrouper::<D>::new();
    for row in rows {
        grouper.push(row)?;
    }
    Ok(grouper.finish())
}

fn unknown_key(row: &Row) -> String {
    row.get(&["_id", "id"])
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<none>".to_string())
}
