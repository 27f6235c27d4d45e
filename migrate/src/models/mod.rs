//! Domain models for the migration pipeline.
//!
//! This module contains the document shapes written to the document store:
//!
//! - [`Entity`] - The three exported collections
//! - [`TaggedDate`] - `{ "$date": ... }` wrapper for instants
//! - [`ReleaseDocument`] - A release with its artist and genre names
//! - [`UserDocument`] / [`WishlistDocument`] - A user and their wishlists
//! - [`InventoryDocument`] / [`ReviewDocument`] - An inventory item and its review
//! - [`Documents`] / [`DocumentSet`] - Assembled output, per entity or all three
//!
//! Rust field names are English; the serialized keys are the ones the
//! document store already uses (`_id`, `titulo`, `data_criacao`, ...).

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

// =============================================================================
// Entity
// =============================================================================

/// One of the three exported collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    /// Releases (`discos`).
    #[serde(rename = "discos")]
    Release,
    /// Users with their wishlists (`usuarios`).
    #[serde(rename = "usuarios")]
    User,
    /// Inventory items with their review (`estoques`).
    #[serde(rename = "estoques")]
    Inventory,
}

impl Entity {
    /// Export order of a full run.
    pub const ALL: [Entity; 3] = [Entity::Release, Entity::User, Entity::Inventory];

    /// Collection name, also the stem of input and output files.
    pub fn collection(&self) -> &'static str {
        match self {
            Entity::Release => "discos",
            Entity::User => "usuarios",
            Entity::Inventory => "estoques",
        }
    }

    /// Parse a collection name or its English alias.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "discos" | "disco" | "releases" | "release" => Some(Entity::Release),
            "usuarios" | "usuario" | "users" | "user" => Some(Entity::User),
            "estoques" | "estoque" | "inventory" | "inventories" => Some(Entity::Inventory),
            _ => None,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

impl FromStr for Entity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entity::from_name(s).ok_or_else(|| ConfigError::UnknownEntity(s.to_string()))
    }
}

// =============================================================================
// Tagged Date
// =============================================================================

/// An instant marked as a date for type-aware consumers.
///
/// Serializes as `{ "$date": "2024-03-01T12:00:00.123Z" }`. The instant is
/// held at millisecond precision; finer digits are truncated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaggedDate(DateTime<Utc>);

impl TaggedDate {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(instant.trunc_subsecs(3))
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    /// Canonical ISO-8601 form (UTC, milliseconds, `Z` suffix).
    pub fn to_iso(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl fmt::Display for TaggedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}

impl Serialize for TaggedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("$date", &self.to_iso())?;
        map.end()
    }
}

// =============================================================================
// Release
// =============================================================================

/// A release (`discos` collection), one per release id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(rename = "titulo")]
    pub title: Option<String>,
    #[serde(rename = "codigo")]
    pub code: Option<String>,
    #[serde(rename = "ano_lancamento")]
    pub release_year: Option<i64>,
    #[serde(rename = "imagem_capa")]
    pub cover_image: Option<String>,
    #[serde(rename = "artistas")]
    pub artists: Vec<String>,
    #[serde(rename = "generos")]
    pub genres: Vec<String>,
    #[serde(rename = "data_criacao")]
    pub created_at: Option<TaggedDate>,
    #[serde(rename = "data_atualizacao")]
    pub updated_at: Option<TaggedDate>,
}

// =============================================================================
// User
// =============================================================================

/// A user (`usuarios` collection) with their wishlists folded in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "senha")]
    pub password_hash: Option<String>,
    /// `None` when no row for this user carried a wishlist.
    pub wishlists: Option<Vec<WishlistDocument>>,
    #[serde(rename = "data_criacao")]
    pub created_at: Option<TaggedDate>,
    #[serde(rename = "data_atualizacao")]
    pub updated_at: Option<TaggedDate>,
}

impl UserDocument {
    /// Wishlist with the given name, if already collected.
    pub fn wishlist_mut(&mut self, name: &str) -> Option<&mut WishlistDocument> {
        self.wishlists
            .as_mut()
            .and_then(|lists| lists.iter_mut().find(|w| w.name == name))
    }
}

/// A named wishlist embedded in a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WishlistDocument {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "discos_id")]
    pub item_ids: Vec<i64>,
    #[serde(rename = "data_criacao")]
    pub created_at: Option<TaggedDate>,
    #[serde(rename = "data_atualizacao")]
    pub updated_at: Option<TaggedDate>,
}

// =============================================================================
// Inventory
// =============================================================================

/// An inventory item (`estoques` collection), one per inventory row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(rename = "id_usuario")]
    pub user_id: Option<i64>,
    #[serde(rename = "id_disco")]
    pub release_id: Option<i64>,
    #[serde(rename = "tipo")]
    pub kind: Option<String>,
    #[serde(rename = "disponivel_troca")]
    pub trade_available: Option<bool>,
    #[serde(rename = "condicao")]
    pub condition: Option<String>,
    /// Present only when the review row has a rating.
    #[serde(rename = "avaliacao")]
    pub review: Option<ReviewDocument>,
    #[serde(rename = "data_criacao")]
    pub created_at: Option<TaggedDate>,
    #[serde(rename = "data_atualizacao")]
    pub updated_at: Option<TaggedDate>,
}

/// Review attached to an inventory item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewDocument {
    /// Integer or decimal, as stored upstream.
    #[serde(rename = "nota")]
    pub rating: Number,
    #[serde(rename = "comentario")]
    pub comment: Option<String>,
    #[serde(rename = "data_criacao")]
    pub created_at: Option<TaggedDate>,
    #[serde(rename = "data_atualizacao")]
    pub updated_at: Option<TaggedDate>,
}

// =============================================================================
// Assembled output
// =============================================================================

/// The assembled documents of a single entity.
///
/// Serializes as the bare document array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Documents {
    Releases(Vec<ReleaseDocument>),
    Users(Vec<UserDocument>),
    Inventory(Vec<InventoryDocument>),
}

impl Documents {
    pub fn entity(&self) -> Entity {
        match self {
            Documents::Releases(_) => Entity::Release,
            Documents::Users(_) => Entity::User,
            Documents::Inventory(_) => Entity::Inventory,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Documents::Releases(d) => d.len(),
            Documents::Users(d) => d.len(),
            Documents::Inventory(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Each document as a JSON value, in order.
    pub fn to_values(&self) -> serde_json::Result<Vec<Value>> {
        match self {
            Documents::Releases(d) => d.iter().map(serde_json::to_value).collect(),
            Documents::Users(d) => d.iter().map(serde_json::to_value).collect(),
            Documents::Inventory(d) => d.iter().map(serde_json::to_value).collect(),
        }
    }
}

/// All three collections of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentSet {
    pub releases: Vec<ReleaseDocument>,
    pub users: Vec<UserDocument>,
    pub inventory: Vec<InventoryDocument>,
}

impl DocumentSet {
    /// Split into per-entity lists in export order.
    pub fn into_documents(self) -> [Documents; 3] {
        [
            Documents::Releases(self.releases),
            Documents::Users(self.users),
            Documents::Inventory(self.inventory),
        ]
    }
}

// =============================================================================
// Tests
// =============================================================================
