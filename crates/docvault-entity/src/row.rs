//! Shared row-decoding helpers.

use sqlx::Row;
use sqlx::postgres::PgRow;

use docvault_core::types::{ParentKind, ParentRef};

/// Decode the `(parent_kind, parent_id)` pair into a tagged reference.
pub(crate) fn decode_parent(row: &PgRow) -> Result<ParentRef, sqlx::Error> {
    let kind: String = row.try_get("parent_kind")?;
    let kind = kind
        .parse::<ParentKind>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "parent_kind".to_string(),
            source: Box::new(e),
        })?;
    Ok(ParentRef::from_parts(kind, row.try_get("parent_id")?))
}
