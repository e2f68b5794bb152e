//! Accessors for each table. Every module follows the same shape: `create`,
//! `find`, `update` (where the entity has mutable fields), `delete`, `list`
//! and `count`, all taking a borrowed `SqliteConnection`.

pub mod ingredients;
pub mod pantry;
pub mod recipe_ingredients;
pub mod recipe_tags;
pub mod recipes;
pub mod reviews;
pub mod search_history;
pub mod tags;
pub mod users;

use crate::error::{StoreError, StoreResult};

/// A window over a listing. Results are always in insertion order, so
/// advancing `offset` by `limit` walks the whole table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: i64,
}

impl Page {
    pub fn first(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: 0,
        }
    }

    pub fn next(self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + self.limit.unwrap_or(0),
        }
    }

    /// SQLite reads a negative LIMIT as "no limit".
    pub(crate) fn sql_limit(&self) -> i64 {
        self.limit.unwrap_or(-1)
    }
}

pub(crate) fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Turns an `Option` from `.optional()` into `NotFound` for `entity`.
pub(crate) fn found<T>(entity: &'static str, id: i32, row: Option<T>) -> StoreResult<T> {
    row.ok_or(StoreError::NotFound { entity, id })
}

/// Fails with `NotFound` unless `table` has a row with primary key `id`.
macro_rules! ensure_exists {
    ($conn:expr, $table:ident, $entity:expr, $id:expr) => {{
        let id: i32 = $id;
        let present: bool = diesel::select(diesel::dsl::exists(
            $crate::schema::$table::table.find(id),
        ))
        .get_result($conn)?;
        if !present {
            return Err($crate::error::StoreError::NotFound {
                entity: $entity,
                id,
            });
        }
    }};
}

pub(crate) use ensure_exists;
