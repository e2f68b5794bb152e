use diesel::prelude::*;
use log::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{
    ApprovalStatus, Ingredient, NewRecipe, Recipe, RecipeChanges, RecipeIngredient, Tag,
};
use crate::query::{ensure_exists, found, Page};
use crate::schema::{ingredients, recipe_ingredients, recipe_tags, recipes, tags};
use crate::validate::{self, LONG_TEXT, SHORT_TEXT};

const ENTITY: &str = "recipe";

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub uploader_id: Option<i32>,
    pub approval_status: Option<ApprovalStatus>,
    pub cuisine: Option<String>,
    pub tag_id: Option<i32>,
    pub ingredient_id: Option<i32>,
    pub page: Page,
}

pub fn create(conn: &mut SqliteConnection, new: &NewRecipe) -> StoreResult<Recipe> {
    let title = validate::required("title", &new.title, LONG_TEXT)?;
    let instructions = validate::required_unbounded("instructions", &new.instructions)?;
    let cuisine = validate::optional("cuisine", new.cuisine.as_deref(), Some(SHORT_TEXT))?;
    let prep_time_mins = validate::non_negative("prep_time_mins", new.prep_time_mins)?;
    let calories = validate::non_negative("calories", new.calories)?;
    let approval_status = new.approval_status.unwrap_or_default();

    conn.transaction::<_, StoreError, _>(|conn| {
        ensure_exists!(conn, users, "user", new.uploader_id);
        let recipe = diesel::insert_into(recipes::table)
            .values((
                recipes::uploader_id.eq(new.uploader_id),
                recipes::title.eq(&title),
                recipes::instructions.eq(&instructions),
                recipes::cuisine.eq(&cuisine),
                recipes::prep_time_mins.eq(prep_time_mins),
                recipes::calories.eq(calories),
                recipes::approval_status.eq(approval_status),
            ))
            .returning(Recipe::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!(
            "created recipe {} ({}) for user {} as {}",
            recipe.id, recipe.title, recipe.uploader_id, recipe.approval_status
        );
        Ok(recipe)
    })
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> StoreResult<Recipe> {
    debug!("loading recipe {id}");
    let recipe = recipes::table
        .find(id)
        .select(Recipe::as_select())
        .first(conn)
        .optional()?;
    found(ENTITY, id, recipe)
}

pub fn update(conn: &mut SqliteConnection, id: i32, changes: &RecipeChanges) -> StoreResult<Recipe> {
    let changes = RecipeChanges {
        title: changes
            .title
            .as_deref()
            .map(|v| validate::required("title", v, LONG_TEXT))
            .transpose()?,
        instructions: changes
            .instructions
            .as_deref()
            .map(|v| validate::required_unbounded("instructions", v))
            .transpose()?,
        cuisine: changes
            .cuisine
            .as_ref()
            .map(|v| validate::optional("cuisine", v.as_deref(), Some(SHORT_TEXT)))
            .transpose()?,
        prep_time_mins: changes
            .prep_time_mins
            .map(|v| validate::non_negative("prep_time_mins", v))
            .transpose()?,
        calories: changes
            .calories
            .map(|v| validate::non_negative("calories", v))
            .transpose()?,
        approval_status: changes.approval_status,
    };

    conn.transaction::<_, StoreError, _>(|conn| {
        let current = find(conn, id)?;
        if changes.is_empty() {
            return Ok(current);
        }
        let recipe = diesel::update(recipes::table.find(id))
            .set(&changes)
            .returning(Recipe::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!("updated recipe {id}");
        Ok(recipe)
    })
}

/// Records a moderation decision. Any status may follow any other.
pub fn set_approval_status(
    conn: &mut SqliteConnection,
    id: i32,
    status: ApprovalStatus,
) -> StoreResult<Recipe> {
    let recipe = diesel::update(recipes::table.find(id))
        .set(recipes::approval_status.eq(status))
        .returning(Recipe::as_returning())
        .get_result(conn)
        .optional()?;
    let recipe = found(ENTITY, id, recipe)?;
    info!("recipe {id} is now {status}");
    Ok(recipe)
}

/// Removes the recipe with its ingredient lines, tags and reviews.
pub fn delete(conn: &mut SqliteConnection, id: i32) -> StoreResult<()> {
    let removed = diesel::delete(recipes::table.find(id)).execute(conn)?;
    if removed == 0 {
        return Err(StoreError::NotFound { entity: ENTITY, id });
    }
    info!("deleted recipe {id}");
    Ok(())
}

pub fn list(conn: &mut SqliteConnection, filter: &RecipeFilter) -> StoreResult<Vec<Recipe>> {
    let mut query = recipes::table
        .order(recipes::id.asc())
        .select(Recipe::as_select())
        .into_boxed();
    if let Some(uploader_id) = filter.uploader_id {
        query = query.filter(recipes::uploader_id.eq(uploader_id));
    }
    if let Some(status) = filter.approval_status {
        query = query.filter(recipes::approval_status.eq(status));
    }
    if let Some(cuisine) = &filter.cuisine {
        query = query.filter(recipes::cuisine.eq(cuisine.trim().to_string()));
    }
    if let Some(tag_id) = filter.tag_id {
        query = query.filter(
            recipes::id.eq_any(
                recipe_tags::table
                    .filter(recipe_tags::tag_id.eq(tag_id))
                    .select(recipe_tags::recipe_id),
            ),
        );
    }
    if let Some(ingredient_id) = filter.ingredient_id {
        query = query.filter(
            recipes::id.eq_any(
                recipe_ingredients::table
                    .filter(recipe_ingredients::ingredient_id.eq(ingredient_id))
                    .select(recipe_ingredients::recipe_id),
            ),
        );
    }
    Ok(query
        .limit(filter.page.sql_limit())
        .offset(filter.page.offset)
        .load(conn)?)
}

pub fn count(conn: &mut SqliteConnection) -> StoreResult<i64> {
    Ok(recipes::table.count().get_result(conn)?)
}

/// The recipe's ingredient lines, each paired with its ingredient.
pub fn ingredients_of(
    conn: &mut SqliteConnection,
    id: i32,
) -> StoreResult<Vec<(RecipeIngredient, Ingredient)>> {
    find(conn, id)?;
    Ok(recipe_ingredients::table
        .inner_join(ingredients::table)
        .filter(recipe_ingredients::recipe_id.eq(id))
        .order(recipe_ingredients::id.asc())
        .select((RecipeIngredient::as_select(), Ingredient::as_select()))
        .load(conn)?)
}

pub fn tags_of(conn: &mut SqliteConnection, id: i32) -> StoreResult<Vec<Tag>> {
    find(conn, id)?;
    Ok(recipe_tags::table
        .inner_join(tags::table)
        .filter(recipe_tags::recipe_id.eq(id))
        .order(recipe_tags::id.asc())
        .select(Tag::as_select())
        .load(conn)?)
}
