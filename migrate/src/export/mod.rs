//! Persist assembled documents.
//!
//! [`JsonFileExporter`] writes one JSON array per collection
//! (`<dir>/discos.json`, ...). Each file is written to a `.tmp` sibling and
//! renamed into place, so an interrupted export never leaves a truncated
//! collection behind.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ExportError, ExportResult};
use crate::models::{Documents, Entity};

/// What a sink wrote for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub entity: Entity,
    pub path: PathBuf,
    pub documents: usize,
    pub bytes: usize,
}

/// Destination of assembled documents.
#[allow(async_fn_in_trait)]
pub trait DocumentSink {
    async fn write(&self, documents: &Documents) -> ExportResult<ExportSummary>;
}

/// Writes `<collection>.json` files into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileExporter {
    dir: PathBuf,
    pretty: bool,
}

impl JsonFileExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pretty: true,
        }
    }

    /// Pretty (2-space) or compact output.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, entity: Entity) -> PathBuf {
        self.dir.join(format!("{}.json", entity.collection()))
    }

    fn encode(&self, documents: &Documents) -> ExportResult<Vec<u8>> {
        let mut bytes = if self.pretty {
            serde_json::to_vec_pretty(documents)?
        } else {
            serde_json::to_vec(documents)?
        };
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl DocumentSink for JsonFileExporter {
    async fn write(&self, documents: &Documents) -> ExportResult<ExportSummary> {
        let entity = documents.entity();
        let bytes = self.encode(documents)?;
        let path = self.path_for(entity);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&path, e))?;

        info!(%entity, path = %path.display(), documents = documents.len(), "exported collection");

        Ok(ExportSummary {
            entity,
            path,
            documents: documents.len(),
            bytes: bytes.len(),
        })
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserDocument;
    use serde_json::Value;
    use tempfile::tempdir;

    fn users() -> Documents {
        Documents::Users(vec![UserDocument {
            id: 7,
            name: Some("Ana".into()),
            email: None,
            password_hash: None,
            wishlists: None,
            created_at: None,
            updated_at: None,
        }])
    }

    #[tokio::test]
    async fn test_writes_pretty_collection_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("data");
        let exporter = JsonFileExporter::new(&out);

        let summary = exporter.write(&users()).await.unwrap();
        assert_eq!(summary.entity, Entity::User);
        assert_eq!(summary.documents, 1);
        assert_eq!(summary.path, out.join("usuarios.json"));

        let content = std::fs::read_to_string(&summary.path).unwrap();
        assert!(content.contains("\n  {\n    \"_id\": 7"));
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed[0]["nome"], "Ana");
        assert!(parsed[0]["wishlists"].is_null());

        assert!(!out.join("usuarios.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_compact_output() {
        let dir = tempdir().unwrap();
        let exporter = JsonFileExporter::new(dir.path()).pretty(false);
        let summary = exporter.write(&Documents::Releases(vec![])).await.unwrap();

        let content = std::fs::read_to_string(summary.path).unwrap();
        assert_eq!(content, "[]\n");
        assert_eq!(summary.bytes, 3);
    }
}
