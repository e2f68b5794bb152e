//! Search history is append-only: entries are recorded and read, never
//! edited. They disappear with their user or by explicit deletion.

use chrono::Utc;
use diesel::prelude::*;
use log::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{NewSearch, SearchEntry};
use crate::query::{ensure_exists, found, Page};
use crate::schema::search_history;
use crate::validate::{self, LONG_TEXT};

const ENTITY: &str = "search entry";

#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub user_id: Option<i32>,
    pub page: Page,
}

pub fn create(conn: &mut SqliteConnection, new: &NewSearch) -> StoreResult<SearchEntry> {
    let search_query = validate::required("search_query", &new.search_query, LONG_TEXT)?;

    conn.transaction::<_, StoreError, _>(|conn| {
        ensure_exists!(conn, users, "user", new.user_id);
        let entry = diesel::insert_into(search_history::table)
            .values((
                search_history::user_id.eq(new.user_id),
                search_history::search_query.eq(&search_query),
                search_history::searched_on.eq(Utc::now().naive_utc()),
            ))
            .returning(SearchEntry::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        debug!("user {} searched for {:?}", entry.user_id, entry.search_query);
        Ok(entry)
    })
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> StoreResult<SearchEntry> {
    debug!("loading search entry {id}");
    let entry = search_history::table
        .find(id)
        .select(SearchEntry::as_select())
        .first(conn)
        .optional()?;
    found(ENTITY, id, entry)
}

pub fn delete(conn: &mut SqliteConnection, id: i32) -> StoreResult<()> {
    let removed = diesel::delete(search_history::table.find(id)).execute(conn)?;
    if removed == 0 {
        return Err(StoreError::NotFound { entity: ENTITY, id });
    }
    info!("deleted search entry {id}");
    Ok(())
}

pub fn list(conn: &mut SqliteConnection, filter: &SearchFilter) -> StoreResult<Vec<SearchEntry>> {
    let mut query = search_history::table
        .order(search_history::id.asc())
        .select(SearchEntry::as_select())
        .into_boxed();
    if let Some(user_id) = filter.user_id {
        query = query.filter(search_history::user_id.eq(user_id));
    }
    Ok(query
        .limit(filter.page.sql_limit())
        .offset(filter.page.offset)
        .load(conn)?)
}

pub fn count(conn: &mut SqliteConnection) -> StoreResult<i64> {
    Ok(search_history::table.count().get_result(conn)?)
}
