use diesel::prelude::*;
use log::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{NewRecipeIngredient, RecipeIngredient, RecipeIngredientChanges};
use crate::query::{ensure_exists, found, Page};
use crate::schema::{ingredients, recipe_ingredients, recipes};
use crate::validate::{self, LONG_TEXT, UNIT_TEXT};

const ENTITY: &str = "recipe ingredient";

#[derive(Debug, Clone, Default)]
pub struct RecipeIngredientFilter {
    pub recipe_id: Option<i32>,
    pub ingredient_id: Option<i32>,
    pub page: Page,
}

/// Adds an ingredient line to a recipe. A recipe lists each ingredient at
/// most once; a second line for the same pair is a conflict.
pub fn create(
    conn: &mut SqliteConnection,
    new: &NewRecipeIngredient,
) -> StoreResult<RecipeIngredient> {
    let quantity_required = validate::positive_quantity("quantity_required", &new.quantity_required)?;
    let unit = validate::required("unit", &new.unit, UNIT_TEXT)?;
    let notes = validate::optional("notes", new.notes.as_deref(), Some(LONG_TEXT))?;

    conn.transaction::<_, StoreError, _>(|conn| {
        ensure_exists!(conn, recipes, "recipe", new.recipe_id);
        ensure_exists!(conn, ingredients, "ingredient", new.ingredient_id);
        let line = diesel::insert_into(recipe_ingredients::table)
            .values((
                recipe_ingredients::recipe_id.eq(new.recipe_id),
                recipe_ingredients::ingredient_id.eq(new.ingredient_id),
                recipe_ingredients::quantity_required.eq(quantity_required),
                recipe_ingredients::unit.eq(&unit),
                recipe_ingredients::notes.eq(&notes),
            ))
            .returning(RecipeIngredient::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!(
            "recipe {} now needs {} {} of ingredient {}",
            line.recipe_id, line.quantity_required, line.unit, line.ingredient_id
        );
        Ok(line)
    })
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> StoreResult<RecipeIngredient> {
    debug!("loading recipe ingredient {id}");
    let line = recipe_ingredients::table
        .find(id)
        .select(RecipeIngredient::as_select())
        .first(conn)
        .optional()?;
    found(ENTITY, id, line)
}

pub fn update(
    conn: &mut SqliteConnection,
    id: i32,
    changes: &RecipeIngredientChanges,
) -> StoreResult<RecipeIngredient> {
    let changes = RecipeIngredientChanges {
        quantity_required: changes
            .quantity_required
            .as_ref()
            .map(|q| validate::positive_quantity("quantity_required", q))
            .transpose()?,
        unit: changes
            .unit
            .as_deref()
            .map(|v| validate::required("unit", v, UNIT_TEXT))
            .transpose()?,
        notes: changes
            .notes
            .as_ref()
            .map(|v| validate::optional("notes", v.as_deref(), Some(LONG_TEXT)))
            .transpose()?,
    };

    conn.transaction::<_, StoreError, _>(|conn| {
        let current = find(conn, id)?;
        if changes.is_empty() {
            return Ok(current);
        }
        let line = diesel::update(recipe_ingredients::table.find(id))
            .set(&changes)
            .returning(RecipeIngredient::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!("updated recipe ingredient {id}");
        Ok(line)
    })
}

pub fn delete(conn: &mut SqliteConnection, id: i32) -> StoreResult<()> {
    let removed = diesel::delete(recipe_ingredients::table.find(id)).execute(conn)?;
    if removed == 0 {
        return Err(StoreError::NotFound { entity: ENTITY, id });
    }
    info!("deleted recipe ingredient {id}");
    Ok(())
}

pub fn list(
    conn: &mut SqliteConnection,
    filter: &RecipeIngredientFilter,
) -> StoreResult<Vec<RecipeIngredient>> {
    let mut query = recipe_ingredients::table
        .order(recipe_ingredients::id.asc())
        .select(RecipeIngredient::as_select())
        .into_boxed();
    if let Some(recipe_id) = filter.recipe_id {
        query = query.filter(recipe_ingredients::recipe_id.eq(recipe_id));
    }
    if let Some(ingredient_id) = filter.ingredient_id {
        query = query.filter(recipe_ingredients::ingredient_id.eq(ingredient_id));
    }
    Ok(query
        .limit(filter.page.sql_limit())
        .offset(filter.page.offset)
        .load(conn)?)
}

pub fn count(conn: &mut SqliteConnection) -> StoreResult<i64> {
    Ok(recipe_ingredients::table.count().get_result(conn)?)
}

/// `"<recipe title> - <ingredient name>"`.
pub fn label(conn: &mut SqliteConnection, id: i32) -> StoreResult<String> {
    let names: Option<(String, String)> = recipe_ingredients::table
        .inner_join(recipes::table)
        .inner_join(ingredients::table)
        .filter(recipe_ingredients::id.eq(id))
        .select((recipes::title, ingredients::name))
        .first(conn)
        .optional()?;
    let (title, name) = found(ENTITY, id, names)?;
    Ok(format!("{title} - {name}"))
}
