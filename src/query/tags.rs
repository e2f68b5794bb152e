use diesel::prelude::*;
use log::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{NewTag, Recipe, Tag, TagChanges};
use crate::query::{found, like_pattern, Page};
use crate::schema::{recipe_tags, recipes, tags};
use crate::validate::{self, SHORT_TEXT};

const ENTITY: &str = "tag";

#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub name_contains: Option<String>,
    pub page: Page,
}

pub fn create(conn: &mut SqliteConnection, new: &NewTag) -> StoreResult<Tag> {
    let tag_name = validate::required("tag_name", &new.tag_name, SHORT_TEXT)?;

    let tag = diesel::insert_into(tags::table)
        .values(tags::tag_name.eq(&tag_name))
        .returning(Tag::as_returning())
        .get_result(conn)
        .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
    info!("created tag {} ({})", tag.id, tag.tag_name);
    Ok(tag)
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> StoreResult<Tag> {
    debug!("loading tag {id}");
    let tag = tags::table
        .find(id)
        .select(Tag::as_select())
        .first(conn)
        .optional()?;
    found(ENTITY, id, tag)
}

pub fn find_by_name(conn: &mut SqliteConnection, name: &str) -> StoreResult<Option<Tag>> {
    Ok(tags::table
        .filter(tags::tag_name.eq(name.trim()))
        .select(Tag::as_select())
        .first(conn)
        .optional()?)
}

pub fn update(conn: &mut SqliteConnection, id: i32, changes: &TagChanges) -> StoreResult<Tag> {
    let changes = TagChanges {
        tag_name: changes
            .tag_name
            .as_deref()
            .map(|v| validate::required("tag_name", v, SHORT_TEXT))
            .transpose()?,
    };

    conn.transaction::<_, StoreError, _>(|conn| {
        let current = find(conn, id)?;
        if changes.is_empty() {
            return Ok(current);
        }
        let tag = diesel::update(tags::table.find(id))
            .set(&changes)
            .returning(Tag::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!("renamed tag {id} to {}", tag.tag_name);
        Ok(tag)
    })
}

/// Untags every recipe that carried the tag.
pub fn delete(conn: &mut SqliteConnection, id: i32) -> StoreResult<()> {
    let removed = diesel::delete(tags::table.find(id)).execute(conn)?;
    if removed == 0 {
        return Err(StoreError::NotFound { entity: ENTITY, id });
    }
    info!("deleted tag {id}");
    Ok(())
}

pub fn list(conn: &mut SqliteConnection, filter: &TagFilter) -> StoreResult<Vec<Tag>> {
    let mut query = tags::table
        .order(tags::id.asc())
        .select(Tag::as_select())
        .into_boxed();
    if let Some(name) = &filter.name_contains {
        query = query.filter(tags::tag_name.like(like_pattern(name)).escape('\\'));
    }
    Ok(query
        .limit(filter.page.sql_limit())
        .offset(filter.page.offset)
        .load(conn)?)
}

pub fn count(conn: &mut SqliteConnection) -> StoreResult<i64> {
    Ok(tags::table.count().get_result(conn)?)
}

pub fn recipes_tagged(conn: &mut SqliteConnection, id: i32) -> StoreResult<Vec<Recipe>> {
    find(conn, id)?;
    Ok(recipe_tags::table
        .inner_join(recipes::table)
        .filter(recipe_tags::tag_id.eq(id))
        .order(recipes::id.asc())
        .select(Recipe::as_select())
        .load(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecipeTag;
    use crate::query::{fixtures, recipe_tags as tagging};

    #[test]
    fn tag_names_are_unique() {
        let mut conn = fixtures::conn();
        fixtures::tag(&mut conn, "vegan");
        let err = create(
            &mut conn,
            &NewTag {
                tag_name: " vegan ".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn rename_onto_existing_name_conflicts() {
        let mut conn = fixtures::conn();
        fixtures::tag(&mut conn, "spicy");
        let sweet = fixtures::tag(&mut conn, "sweet");

        let err = update(
            &mut conn,
            sweet.id,
            &TagChanges {
                tag_name: Some("spicy".to_string()),
            },
        )
        .unwrap_err();
        assert!(err.is_conflict());

        let renamed = update(
            &mut conn,
            sweet.id,
            &TagChanges {
                tag_name: Some("dessert".to_string()),
            },
        )
        .unwrap();
        assert_eq!(renamed.tag_name, "dessert");
        assert_eq!(find_by_name(&mut conn, "dessert").unwrap(), Some(renamed));
    }

    #[test]
    fn deleting_a_tag_untags_recipes() {
        let mut conn = fixtures::conn();
        let cook = fixtures::user(&mut conn, "a@x.com");
        let bread = fixtures::recipe(&mut conn, &cook, "Bread");
        let veg = fixtures::tag(&mut conn, "veg");
        tagging::create(
            &mut conn,
            &NewRecipeTag {
                recipe_id: bread.id,
                tag_id: veg.id,
            },
        )
        .unwrap();
        assert_eq!(recipes_tagged(&mut conn, veg.id).unwrap(), vec![bread]);

        delete(&mut conn, veg.id).unwrap();
        assert_eq!(tagging::count(&mut conn).unwrap(), 0);
        assert!(delete(&mut conn, veg.id).unwrap_err().is_not_found());
    }
}
