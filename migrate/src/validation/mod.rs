//! JSON Schema validation of assembled documents.
//!
//! Every collection has a Draft 7 schema embedded at compile time from the
//! `schemas/` directory:
//!
//! - `discos.schema.json`
//! - `usuarios.schema.json`
//! - `estoques.schema.json`
//!
//! The schemas pin the document-store contract: tagged dates in canonical
//! form, `wishlists` either `null` or a non-empty array, `avaliacao` either
//! `null` or a full review, and no duplicate names or ids in aggregates.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use disco_migrate::{validate_document, Entity};
//!
//! let user = json!({
//!     "_id": 7, "nome": "Ana", "email": null, "senha": null,
//!     "wishlists": null, "data_criacao": null, "data_atualizacao": null
//! });
//! assert!(validate_document(Entity::User, &user).is_ok());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::SchemaError;
use crate::models::{Documents, Entity};

static RELEASE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/discos.schema.json"))
        .expect("Invalid embedded schema")
});

static USER_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/usuarios.schema.json"))
        .expect("Invalid embedded schema")
});

static INVENTORY_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/estoques.schema.json"))
        .expect("Invalid embedded schema")
});

/// Embedded schema of a collection.
pub fn schema_for(entity: Entity) -> &'static Value {
    match entity {
        Entity::Release => &RELEASE_SCHEMA,
        Entity::User => &USER_SCHEMA,
        Entity::Inventory => &INVENTORY_SCHEMA,
    }
}

/// Validate a JSON value against a JSON Schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every error otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick check, true/false only.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate one document against its collection schema.
pub fn validate_document(entity: Entity, document: &Value) -> Result<(), Vec<String>> {
    validate(schema_for(entity), document)
}

/// Validate a list of documents, returning `(index, errors)` per failure.
pub fn validate_values(entity: Entity, documents: &[Value]) -> Result<(), Vec<(usize, Vec<String>)>> {
    let validator = match jsonschema::draft7::new(schema_for(entity)) {
        Ok(v) => v,
        Err(e) => return Err(vec![(0, vec![format!("Invalid schema: {}", e)])]),
    };

    let failures: Vec<(usize, Vec<String>)> = documents
        .iter()
        .enumerate()
        .filter_map(|(i, doc)| {
            let errors: Vec<String> = validator.iter_errors(doc).map(|e| e.to_string()).collect();
            (!errors.is_empty()).then_some((i, errors))
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}

/// Validate assembled documents before they are exported.
pub fn check_documents(documents: &Documents) -> Result<(), SchemaError> {
    let entity = documents.entity();
    let values = documents.to_values()?;

    validate_values(entity, &values).map_err(|failures| {
        let first = failures
            .first()
            .map(|(i, errors)| format!("document {}: {}", i, errors.join(", ")))
            .unwrap_or_default();
        SchemaError::Invalid {
            entity,
            count: failures.len(),
            first,
        }
    })
}
