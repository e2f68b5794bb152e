use diesel::prelude::*;
use log::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{NewRecipeTag, RecipeTag};
use crate::query::{ensure_exists, found, Page};
use crate::schema::recipe_tags;

const ENTITY: &str = "recipe tag";

#[derive(Debug, Clone, Default)]
pub struct RecipeTagFilter {
    pub recipe_id: Option<i32>,
    pub tag_id: Option<i32>,
    pub page: Page,
}

pub fn create(conn: &mut SqliteConnection, new: &NewRecipeTag) -> StoreResult<RecipeTag> {
    conn.transaction::<_, StoreError, _>(|conn| {
        ensure_exists!(conn, recipes, "recipe", new.recipe_id);
        ensure_exists!(conn, tags, "tag", new.tag_id);
        let tagging = diesel::insert_into(recipe_tags::table)
            .values((
                recipe_tags::recipe_id.eq(new.recipe_id),
                recipe_tags::tag_id.eq(new.tag_id),
            ))
            .returning(RecipeTag::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!("tagged recipe {} with tag {}", tagging.recipe_id, tagging.tag_id);
        Ok(tagging)
    })
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> StoreResult<RecipeTag> {
    debug!("loading recipe tag {id}");
    let tagging = recipe_tags::table
        .find(id)
        .select(RecipeTag::as_select())
        .first(conn)
        .optional()?;
    found(ENTITY, id, tagging)
}

pub fn delete(conn: &mut SqliteConnection, id: i32) -> StoreResult<()> {
    let removed = diesel::delete(recipe_tags::table.find(id)).execute(conn)?;
    if removed == 0 {
        return Err(StoreError::NotFound { entity: ENTITY, id });
    }
    info!("deleted recipe tag {id}");
    Ok(())
}

pub fn list(conn: &mut SqliteConnection, filter: &RecipeTagFilter) -> StoreResult<Vec<RecipeTag>> {
    let mut query = recipe_tags::table
        .order(recipe_tags::id.asc())
        .select(RecipeTag::as_select())
        .into_boxed();
    if let Some(recipe_id) = filter.recipe_id {
        query = query.filter(recipe_tags::recipe_id.eq(recipe_id));
    }
    if let Some(tag_id) = filter.tag_id {
        query = query.filter(recipe_tags::tag_id.eq(tag_id));
    }
    Ok(query
        .limit(filter.page.sql_limit())
        .offset(filter.page.offset)
        .load(conn)?)
}

pub fn count(conn: &mut SqliteConnection) -> StoreResult<i64> {
    Ok(recipe_tags::table.count().get_result(conn)?)
}
