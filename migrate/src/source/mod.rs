//! Row sources.
//!
//! The relational side is queried elsewhere; this crate starts from the
//! exported result sets. A [`DirectorySource`] reads one dump per
//! collection from a directory:
//!
//! ```text
//! rows/
//! ├── discos.json     (or discos.csv)
//! ├── usuarios.json   (or usuarios.csv)
//! └── estoques.json   (or estoques.csv)
//! ```
//!
//! JSON dumps are arrays of row objects, as returned by the database driver.
//! CSV dumps go through [`crate::parser`].

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{SourceError, SourceResult};
use crate::models::Entity;
use crate::parser::parse_csv_file_auto;
use crate::transform::Row;

/// Anything that can hand over the rows of an entity.
pub trait RowSource {
    fn load(&self, entity: Entity) -> SourceResult<Vec<Row>>;
}

// =============================================================================
// Directory of dumps
// =============================================================================

/// Reads `<collection>.json` or `<collection>.csv` from a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Candidate files for an entity, in lookup order.
    pub fn candidates(&self, entity: Entity) -> [PathBuf; 2] {
        let stem = entity.collection();
        [
            self.dir.join(format!("{}.json", stem)),
            self.dir.join(format!("{}.csv", stem)),
        ]
    }
}

impl RowSource for DirectorySource {
    fn load(&self, entity: Entity) -> SourceResult<Vec<Row>> {
        let candidates = self.candidates(entity);
        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| SourceError::MissingInput {
                entity,
                dir: self.dir.display().to_string(),
                expected: candidates
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(" or "),
            })?;

        let rows = load_rows_file(path)?;
        info!(%entity, path = %path.display(), rows = rows.len(), "loaded rows");
        Ok(rows)
    }
}

/// Load a single dump, picking the format from the file extension.
pub fn load_rows_file(path: &Path) -> SourceResult<Vec<Row>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        let parsed = parse_csv_file_auto(path)?;
        debug!(
            encoding = %parsed.encoding,
            delimiter = %parsed.delimiter,
            columns = parsed.headers.len(),
            "parsed CSV dump"
        );
        return Ok(parsed.rows);
    }

    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    rows_from_json(&content)
}

/// Parse a JSON array of row objects.
pub fn rows_from_json(content: &str) -> SourceResult<Vec<Row>> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Array(items) = value else {
        return Err(SourceError::NotRows(format!(
            "top-level value is {}",
            json_kind(&value)
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let kind = json_kind(&item);
            Row::from_value(item)
                .ok_or_else(|| SourceError::NotRows(format!("element {} is {}", i, kind)))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// In-memory rows
// =============================================================================

/// The rows of all three entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub releases: Vec<Row>,
    pub users: Vec<Row>,
    pub inventory: Vec<Row>,
}

impl RowSet {
    /// Load every entity from `source`.
    pub fn load(source: &impl RowSource) -> SourceResult<Self> {
        Ok(Self {
            releases: source.load(Entity::Release)?,
            users: source.load(Entity::User)?,
            inventory: source.load(Entity::Inventory)?,
        })
    }

    pub fn rows(&self, entity: Entity) -> &[Row] {
        match entity {
            Entity::Release => &self.releases,
            Entity::User => &self.users,
            Entity::Inventory => &self.inventory,
        }
    }
}

impl RowSource for RowSet {
    fn load(&self, entity: Entity) -> SourceResult<Vec<Row>> {
        Ok(self.rows(entity).to_vec())
    }
}
