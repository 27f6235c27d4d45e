//! Entity pipelines: rows in, documents out.
//!
//! Every entity goes through [`fold_rows`] keyed by its primary key:
//!
//! - **Releases** arrive pre-aggregated (one row per release). Repeated ids
//!   are tolerated when their scalar columns agree; their artist and genre
//!   aggregates are unioned.
//! - **Users** fan out once per wishlist (or once per wishlist item). Parent
//!   columns keep their first-seen values and wishlist rows are collected.
//! - **Inventory** items map one row to one document. An identical repeated
//!   row collapses; any other repeat is a data integrity error.

use tracing::debug;

use super::dedupe::{dedupe_ids, dedupe_names, extend_unique};
use super::grouper::{fold_rows, FoldError, GroupedDocument};
use super::row::{Columns, Row};
use crate::error::{AssemblyResult, ValidationError};
use crate::models::{
    DocumentSet, Documents, Entity, InventoryDocument, ReleaseDocument, ReviewDocument,
    UserDocument, WishlistDocument,
};
use crate::source::RowSet;

// =============================================================================
// Column names (query alias first)
// =============================================================================

const ID: Columns = &["_id", "id"];
const CREATED_AT: Columns = &["data_criacao", "created_at"];
const UPDATED_AT: Columns = &["data_atualizacao", "updated_at"];

const TITLE: Columns = &["titulo", "title"];
const CODE: Columns = &["codigo", "code"];
const RELEASE_YEAR: Columns = &["ano_lancamento", "release_year"];
const COVER_IMAGE: Columns = &["imagem_capa", "cover_image"];
const ARTISTS: Columns = &["artistas", "artist_names", "artista", "artist"];
const GENRES: Columns = &["generos", "genre_names", "genero", "genre"];

const NAME: Columns = &["nome", "name"];
const EMAIL: Columns = &["email"];
const PASSWORD: Columns = &["senha", "password_hash"];
const WISHLIST_NAME: Columns = &["wishlist_nome", "wishlist_name"];
const WISHLIST_ITEMS: Columns = &["wishlist_discos_id", "wishlist_item_ids", "wishlist_disco_id"];
const WISHLIST_CREATED_AT: Columns = &["wishlist_data_criacao", "wishlist_created_at"];
const WISHLIST_UPDATED_AT: Columns = &["wishlist_data_atualizacao", "wishlist_updated_at"];

const USER_ID: Columns = &["id_usuario", "user_id"];
const RELEASE_ID: Columns = &["id_disco", "release_id"];
const KIND: Columns = &["tipo", "type"];
const TRADE_AVAILABLE: Columns = &["disponivel_troca", "trade_available"];
const CONDITION: Columns = &["condicao", "condition"];
const RATING: Columns = &["nota", "rating"];
const COMMENT: Columns = &["comentario", "comment"];
const REVIEW_CREATED_AT: Columns = &["avaliacao_data_criacao", "review_created_at"];
const REVIEW_UPDATED_AT: Columns = &["avaliacao_data_atualizacao", "review_updated_at"];

// =============================================================================
// Release
// =============================================================================

impl ReleaseDocument {
    /// First scalar column that differs from `other`, by document key.
    fn conflicting_field(&self, other: &Self) -> Option<&'static str> {
        if self.title != other.title {
            Some("titulo")
        } else if self.code != other.code {
            Some("codigo")
        } else if self.release_year != other.release_year {
            Some("ano_lancamento")
        } else if self.cover_image != other.cover_image {
            Some("imagem_capa")
        } else if self.created_at != other.created_at {
            Some("data_criacao")
        } else if self.updated_at != other.updated_at {
            Some("data_atualizacao")
        } else {
            None
        }
    }
}

impl GroupedDocument for ReleaseDocument {
    const ENTITY: Entity = Entity::Release;
    type Key = i64;

    fn group_key(row: &Row) -> Result<i64, ValidationError> {
        row.require_int(ID)
    }

    fn open(key: &i64, row: &Row) -> Result<Self, FoldError> {
        Ok(Self {
            id: *key,
            title: row.text(TITLE)?,
            code: row.text(CODE)?,
            release_year: row.int(RELEASE_YEAR)?,
            cover_image: row.text(COVER_IMAGE)?,
            artists: dedupe_names(ARTISTS[0], &row.list(ARTISTS))?,
            genres: dedupe_names(GENRES[0], &row.list(GENRES))?,
            created_at: row.date(CREATED_AT)?,
            updated_at: row.date(UPDATED_AT)?,
        })
    }

    fn absorb(&mut self, row: &Row) -> Result<(), FoldError> {
        let repeat = Self::open(&self.id, row)?;
        if let Some(field) = self.conflicting_field(&repeat) {
            return Err(FoldError::Conflict(format!(
                "rows disagree on field '{}'",
                field
            )));
        }
        extend_unique(&mut self.artists, repeat.artists);
        extend_unique(&mut self.genres, repeat.genres);
        Ok(())
    }
}

// =============================================================================
// User
// =============================================================================

impl UserDocument {
    /// Collect the wishlist carried by `row`, if any.
    ///
    /// A wishlist name seen again for the same user merges into the
    /// existing sub-document instead of adding a second one. The repeat
    /// must carry the same wishlist dates.
    fn absorb_wishlist(&mut self, row: &Row) -> Result<(), FoldError> {
        let Some(name) = row.text(WISHLIST_NAME)? else {
            return Ok(());
        };
        let item_ids = dedupe_ids(WISHLIST_ITEMS[0], &row.list(WISHLIST_ITEMS))?;
        let created_at = row.date(WISHLIST_CREATED_AT)?;
        let updated_at = row.date(WISHLIST_UPDATED_AT)?;

        if let Some(existing) = self.wishlist_mut(&name) {
            if existing.created_at != created_at || existing.updated_at != updated_at {
                return Err(FoldError::Conflict(format!(
                    "rows disagree on the dates of wishlist '{}'",
                    name
                )));
            }
            extend_unique(&mut existing.item_ids, item_ids);
            return Ok(());
        }

        let wishlist = WishlistDocument {
            name,
            item_ids,
            created_at,
            updated_at,
        };
        self.wishlists.get_or_insert_with(Vec::new).push(wishlist);
        Ok(())
    }
}

impl GroupedDocument for UserDocument {
    const ENTITY: Entity = Entity::User;
    type Key = i64;

    fn group_key(row: &Row) -> Result<i64, ValidationError> {
        row.require_int(ID)
    }

    fn open(key: &i64, row: &Row) -> Result<Self, FoldError> {
        let mut user = Self {
            id: *key,
            name: row.text(NAME)?,
            email: row.text(EMAIL)?,
            password_hash: row.text(PASSWORD)?,
            wishlists: None,
            created_at: row.date(CREATED_AT)?,
            updated_at: row.date(UPDATED_AT)?,
        };
        user.absorb_wishlist(row)?;
        Ok(user)
    }

    fn absorb(&mut self, row: &Row) -> Result<(), FoldError> {
        self.absorb_wishlist(row)
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Review carried by an inventory row.
///
/// Presence is decided by the rating being non-null, so a zero rating
/// still yields a review.
fn review(row: &Row) -> Result<Option<ReviewDocument>, ValidationError> {
    let Some(rating) = row.number(RATING)? else {
        return Ok(None);
    };
    Ok(Some(ReviewDocument {
        rating,
        comment: row.text(COMMENT)?,
        created_at: row.date(REVIEW_CREATED_AT)?,
        updated_at: row.date(REVIEW_UPDATED_AT)?,
    }))
}

impl GroupedDocument for InventoryDocument {
    const ENTITY: Entity = Entity::Inventory;
    type Key = i64;

    fn group_key(row: &Row) -> Result<i64, ValidationError> {
        row.require_int(ID)
    }

    fn open(key: &i64, row: &Row) -> Result<Self, FoldError> {
        Ok(Self {
            id: *key,
            user_id: row.int(USER_ID)?,
            release_id: row.int(RELEASE_ID)?,
            kind: row.text(KIND)?,
            trade_available: row.boolean(TRADE_AVAILABLE)?,
            condition: row.text(CONDITION)?,
            review: review(row)?,
            created_at: row.date(CREATED_AT)?,
            updated_at: row.date(UPDATED_AT)?,
        })
    }

    fn absorb(&mut self, row: &Row) -> Result<(), FoldError> {
        let repeat = Self::open(&self.id, row)?;
        if repeat == *self {
            return Ok(());
        }
        let detail = if repeat.review != self.review {
            "rows carry different reviews".to_string()
        } else {
            "rows disagree on inventory columns".to_string()
        };
        Err(FoldError::Conflict(detail))
    }
}

// =============================================================================
// Entry points
// =============================================================================

pub fn assemble_releases(rows: &[Row]) -> AssemblyResult<Vec<ReleaseDocument>> {
    let docs = fold_rows::<ReleaseDocument>(rows)?;
    debug!(rows = rows.len(), documents = docs.len(), "assembled releases");
    Ok(docs)
}

pub fn assemble_users(rows: &[Row]) -> AssemblyResult<Vec<UserDocument>> {
    let docs = fold_rows::<UserDocument>(rows)?;
    debug!(
        rows = rows.len(),
        documents = docs.len(),
        with_wishlists = docs.iter().filter(|u| u.wishlists.is_some()).count(),
        "assembled users"
    );
    Ok(docs)
}

pub fn assemble_inventory(rows: &[Row]) -> AssemblyResult<Vec<InventoryDocument>> {
    let docs = fold_rows::<InventoryDocument>(rows)?;
    debug!(
        rows = rows.len(),
        documents = docs.len(),
        reviewed = docs.iter().filter(|i| i.review.is_some()).count(),
        "assembled inventory"
    );
    Ok(docs)
}

/// Run the pipeline of a single entity.
pub fn assemble(entity: Entity, rows: &[Row]) -> AssemblyResult<Documents> {
    Ok(match entity {
        Entity::Release => Documents::Releases(assemble_releases(rows)?),
        Entity::User => Documents::Users(assemble_users(rows)?),
        Entity::Inventory => Documents::Inventory(assemble_inventory(rows)?),
    })
}

/// Run all three pipelines. The first failing entity aborts.
pub fn assemble_all(rows: &RowSet) -> AssemblyResult<DocumentSet> {
    Ok(DocumentSet {
        releases: assemble_releases(&rows.releases)?,
        users: assemble_users(&rows.users)?,
        inventory: assemble_inventory(&rows.inventory)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AssemblyError, DataIntegrityError};
    use serde_json::{json, Value};

    fn rows(values: Vec<Value>) -> Vec<Row> {
        values.into_iter().filter_map(Row::from_value).collect()
    }

    fn release_row(id: i64, genre: &str) -> Value {
        json!({
            "_id": id,
            "titulo": "Kind of Blue",
            "codigo": "CL1355",
            "ano_lancamento": 1959,
            "imagem_capa": null,
            "data_criacao": "2024-01-10 08:00:00+00",
            "data_atualizacao": null,
            "artistas": ["Miles Davis"],
            "generos": genre
        })
    }

    #[test]
    fn test_release_genre_fan_out_is_deduplicated() {
        let input = rows(vec![
            release_row(1, "Rock"),
            release_row(1, "Rock"),
            release_row(1, "Jazz"),
        ]);
        let docs = assemble_releases(&input).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].genres, vec!["Rock", "Jazz"]);
        assert_eq!(docs[0].artists, vec!["Miles Davis"]);
    }

    #[test]
    fn test_release_aggregates_strip_nulls() {
        let input = rows(vec![json!({
            "_id": 2,
            "titulo": "Untitled",
            "artistas": [null],
            "generos": ["Samba", null, "Samba", "MPB"],
            "data_criacao": "2024-01-10T08:00:00Z"
        })]);
        let docs = assemble_releases(&input).unwrap();
        assert!(docs[0].artists.is_empty());
        assert_eq!(docs[0].genres, vec!["Samba", "MPB"]);
        assert_eq!(
            docs[0].created_at.map(|d| d.to_iso()).as_deref(),
            Some("2024-01-10T08:00:00.000Z")
        );
        assert_eq!(docs[0].updated_at, None);
    }

    #[test]
    fn test_release_conflicting_duplicate_fails_fast() {
        let mut other = release_row(1, "Jazz");
        other["titulo"] = json!("Sketches of Spain");
        let input = rows(vec![release_row(1, "Jazz"), other]);

        let err = assemble_releases(&input).unwrap_err();
        match err {
            AssemblyError::Integrity(DataIntegrityError::DuplicateKey {
                entity,
                key,
                detail,
            }) => {
                assert_eq!(entity, Entity::Release);
                assert_eq!(key, "1");
                assert!(detail.contains("titulo"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_user_without_wishlist_has_null_wishlists() {
        let input = rows(vec![json!({
            "_id": 7,
            "nome": "Ana",
            "email": "ana@example.com",
            "senha": "$2b$10$hash",
            "data_criacao": "2024-02-01 10:00:00+00",
            "data_atualizacao": null,
            "wishlist_nome": null,
            "wishlist_data_criacao": null,
            "wishlist_data_atualizacao": null,
            "wishlist_discos_id": [null]
        })]);
        let docs = assemble_users(&input).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, 7);
        assert_eq!(docs[0].wishlists, None);

        let value = serde_json::to_value(&docs[0]).unwrap();
        assert!(value["wishlists"].is_null());
    }

    #[test]
    fn test_user_wishlists_are_collected() {
        let input = rows(vec![
            json!({ "_id": 7, "nome": "Ana", "wishlist_nome": "A",
                    "wishlist_data_criacao": "2024-02-02", "wishlist_discos_id": [1, 2] }),
            json!({ "_id": 7, "nome": "Ana", "wishlist_nome": "B",
                    "wishlist_data_criacao": "2024-02-03", "wishlist_discos_id": [3] }),
        ]);
        let docs = assemble_users(&input).unwrap();
        assert_eq!(docs.len(), 1);

        let value = serde_json::to_value(&docs[0]).unwrap();
        assert_eq!(value["_id"], 7);
        assert_eq!(value["wishlists"][0]["nome"], "A");
        assert_eq!(value["wishlists"][0]["discos_id"], json!([1, 2]));
        assert_eq!(value["wishlists"][1]["nome"], "B");
        assert_eq!(value["wishlists"][1]["discos_id"], json!([3]));
        assert_eq!(
            value["wishlists"][0]["data_criacao"],
            json!({ "$date": "2024-02-02T00:00:00.000Z" })
        );
    }

    #[test]
    fn test_user_item_rows_merge_into_one_wishlist() {
        let input = rows(vec![
            json!({ "_id": 3, "wishlist_nome": "Vinis", "wishlist_discos_id": "10" }),
            json!({ "_id": 4 }),
            json!({ "_id": 3, "wishlist_nome": "Vinis", "wishlist_discos_id": "11" }),
            json!({ "_id": 3, "wishlist_nome": "Vinis", "wishlist_discos_id": "10" }),
        ]);
        let docs = assemble_users(&input).unwrap();
        assert_eq!(docs.len(), 2);

        let wishlists = docs[0].wishlists.as_ref().unwrap();
        assert_eq!(wishlists.len(), 1);
        assert_eq!(wishlists[0].item_ids, vec![10, 11]);
        assert_eq!(docs[1].wishlists, None);
    }

    #[test]
    fn test_repeated_wishlist_with_other_dates_is_a_conflict() {
        let input = rows(vec![
            json!({ "_id": 3, "wishlist_nome": "Vinis", "wishlist_data_criacao": "2024-02-02",
                    "wishlist_discos_id": [10] }),
            json!({ "_id": 3, "wishlist_nome": "Vinis", "wishlist_data_criacao": "2024-02-09",
                    "wishlist_discos_id": [11] }),
        ]);
        let err = assemble_users(&input).unwrap_err();
        match err {
            AssemblyError::Integrity(DataIntegrityError::DuplicateKey { entity, key, detail }) => {
                assert_eq!(entity, Entity::User);
                assert_eq!(key, "3");
                assert!(detail.contains("Vinis"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_user_parent_fields_keep_first_seen_values() {
        let input = rows(vec![
            json!({ "_id": 5, "nome": "Bia", "wishlist_nome": "A" }),
            json!({ "_id": 5, "nome": "Beatriz", "wishlist_nome": "B" }),
        ]);
        let docs = assemble_users(&input).unwrap();
        assert_eq!(docs[0].name.as_deref(), Some("Bia"));
    }

    #[test]
    fn test_wishlists_null_iff_no_wishlist_rows() {
        let input = rows(vec![
            json!({ "_id": 1, "wishlist_nome": null }),
            json!({ "_id": 2, "wishlist_nome": "X", "wishlist_discos_id": [] }),
            json!({ "_id": 1, "wishlist_nome": null }),
            json!({ "_id": 3 }),
            json!({ "_id": 3, "wishlist_nome": "Y" }),
        ]);
        let docs = assemble_users(&input).unwrap();
        let by_id: Vec<(i64, bool)> = docs.iter().map(|u| (u.id, u.wishlists.is_some())).collect();
        assert_eq!(by_id, vec![(1, false), (2, true), (3, true)]);
        assert_eq!(docs[1].wishlists.as_ref().unwrap()[0].item_ids, Vec::<i64>::new());
    }

    #[test]
    fn test_user_non_numeric_item_id_fails() {
        let input = rows(vec![json!({
            "_id": 9, "wishlist_nome": "A", "wishlist_discos_id": ["1", "dois"]
        })]);
        let err = assemble_users(&input).unwrap_err();
        assert_eq!(err.key(), "9");
        assert!(matches!(
            err,
            AssemblyError::Validation {
                source: ValidationError::NonNumeric { .. },
                ..
            }
        ));
    }

    fn inventory_row(id: i64, rating: Value) -> Value {
        json!({
            "_id": id,
            "id_usuario": 7,
            "id_disco": 1,
            "tipo": "LP",
            "disponivel_troca": true,
            "condicao": "VG+",
            "data_criacao": "2024-03-01 12:00:00+00",
            "data_atualizacao": null,
            "nota": rating,
            "comentario": "Great pressing",
            "avaliacao_data_criacao": "2024-03-02 12:00:00+00",
            "avaliacao_data_atualizacao": null
        })
    }

    #[test]
    fn test_inventory_review_presence_follows_rating() {
        let input = rows(vec![
            inventory_row(1, Value::Null),
            inventory_row(2, json!(5)),
        ]);
        let docs = assemble_inventory(&input).unwrap();
        assert_eq!(docs[0].review, None);

        let review = docs[1].review.as_ref().unwrap();
        assert_eq!(review.rating, serde_json::Number::from(5));
        assert_eq!(review.comment.as_deref(), Some("Great pressing"));

        let value = serde_json::to_value(&docs[1]).unwrap();
        assert_eq!(value["avaliacao"]["nota"], 5);
        assert_eq!(
            value["avaliacao"]["data_criacao"],
            json!({ "$date": "2024-03-02T12:00:00.000Z" })
        );
        assert!(value["avaliacao"]["data_atualizacao"].is_null());
    }

    #[test]
    fn test_inventory_zero_rating_keeps_review() {
        // Zero is a valid rating; only a null rating drops the review.
        let docs = assemble_inventory(&rows(vec![inventory_row(3, json!(0))])).unwrap();
        let review = docs[0].review.as_ref().unwrap();
        assert_eq!(review.rating, serde_json::Number::from(0));
    }

    #[test]
    fn test_inventory_duplicates() {
        let same = rows(vec![inventory_row(4, json!(4)), inventory_row(4, json!(4))]);
        assert_eq!(assemble_inventory(&same).unwrap().len(), 1);

        let differing = rows(vec![inventory_row(4, json!(4)), inventory_row(4, json!(2))]);
        let err = assemble_inventory(&differing).unwrap_err();
        assert!(matches!(err, AssemblyError::Integrity(_)));
        assert_eq!(err.entity(), Entity::Inventory);
        assert_eq!(err.key(), "4");
    }

    #[test]
    fn test_inventory_csv_style_text_values() {
        let input = rows(vec![json!({
            "_id": "8", "id_usuario": "7", "id_disco": "2", "tipo": "CD",
            "disponivel_troca": "f", "condicao": "M", "nota": "4.5",
            "data_criacao": "2024-03-01 12:00:00"
        })]);
        let doc = &assemble_inventory(&input).unwrap()[0];
        assert_eq!(doc.id, 8);
        assert_eq!(doc.user_id, Some(7));
        assert_eq!(doc.trade_available, Some(false));
        assert_eq!(
            doc.review.as_ref().map(|r| r.rating.clone()),
            serde_json::Number::from_f64(4.5)
        );
    }

    #[test]
    fn test_assemble_dispatches_by_entity() {
        let docs = assemble(Entity::User, &rows(vec![json!({ "_id": 1 })])).unwrap();
        assert_eq!(docs.entity(), Entity::User);
        assert_eq!(docs.len(), 1);
    }
}
