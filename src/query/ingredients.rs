use diesel::prelude::*;
use log::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{Ingredient, IngredientChanges, NewIngredient, Recipe};
use crate::query::{found, like_pattern, Page};
use crate::schema::{ingredients, recipe_ingredients, recipes};
use crate::validate::{self, LONG_TEXT, SHORT_TEXT};

const ENTITY: &str = "ingredient";

#[derive(Debug, Clone, Default)]
pub struct IngredientFilter {
    pub category: Option<String>,
    pub name_contains: Option<String>,
    pub page: Page,
}

pub fn create(conn: &mut SqliteConnection, new: &NewIngredient) -> StoreResult<Ingredient> {
    let name = validate::required("name", &new.name, LONG_TEXT)?;
    let category = validate::optional("category", new.category.as_deref(), Some(SHORT_TEXT))?;
    let purchase_link = validate::optional("purchase_link", new.purchase_link.as_deref(), None)?;
    let image_url = validate::optional("image_url", new.image_url.as_deref(), None)?;

    let ingredient = diesel::insert_into(ingredients::table)
        .values((
            ingredients::name.eq(&name),
            ingredients::category.eq(&category),
            ingredients::purchase_link.eq(&purchase_link),
            ingredients::image_url.eq(&image_url),
        ))
        .returning(Ingredient::as_returning())
        .get_result(conn)
        .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
    info!("created ingredient {} ({})", ingredient.id, ingredient.name);
    Ok(ingredient)
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> StoreResult<Ingredient> {
    debug!("loading ingredient {id}");
    let ingredient = ingredients::table
        .find(id)
        .select(Ingredient::as_select())
        .first(conn)
        .optional()?;
    found(ENTITY, id, ingredient)
}

pub fn update(
    conn: &mut SqliteConnection,
    id: i32,
    changes: &IngredientChanges,
) -> StoreResult<Ingredient> {
    let changes = IngredientChanges {
        name: changes
            .name
            .as_deref()
            .map(|v| validate::required("name", v, LONG_TEXT))
            .transpose()?,
        category: changes
            .category
            .as_ref()
            .map(|v| validate::optional("category", v.as_deref(), Some(SHORT_TEXT)))
            .transpose()?,
        purchase_link: changes
            .purchase_link
            .as_ref()
            .map(|v| validate::optional("purchase_link", v.as_deref(), None))
            .transpose()?,
        image_url: changes
            .image_url
            .as_ref()
            .map(|v| validate::optional("image_url", v.as_deref(), None))
            .transpose()?,
    };

    conn.transaction::<_, StoreError, _>(|conn| {
        let current = find(conn, id)?;
        if changes.is_empty() {
            return Ok(current);
        }
        let ingredient = diesel::update(ingredients::table.find(id))
            .set(&changes)
            .returning(Ingredient::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!("updated ingredient {id}");
        Ok(ingredient)
    })
}

/// Also drops every recipe line and pantry entry that used the ingredient.
pub fn delete(conn: &mut SqliteConnection, id: i32) -> StoreResult<()> {
    let removed = diesel::delete(ingredients::table.find(id)).execute(conn)?;
    if removed == 0 {
        return Err(StoreError::NotFound { entity: ENTITY, id });
    }
    info!("deleted ingredient {id}");
    Ok(())
}

pub fn list(conn: &mut SqliteConnection, filter: &IngredientFilter) -> StoreResult<Vec<Ingredient>> {
    let mut query = ingredients::table
        .order(ingredients::id.asc())
        .select(Ingredient::as_select())
        .into_boxed();
    if let Some(category) = &filter.category {
        query = query.filter(ingredients::category.eq(category.trim().to_string()));
    }
    if let Some(name) = &filter.name_contains {
        query = query.filter(ingredients::name.like(like_pattern(name)).escape('\\'));
    }
    Ok(query
        .limit(filter.page.sql_limit())
        .offset(filter.page.offset)
        .load(conn)?)
}

pub fn count(conn: &mut SqliteConnection) -> StoreResult<i64> {
    Ok(ingredients::table.count().get_result(conn)?)
}

/// Recipes that list the ingredient, in recipe order.
pub fn recipes_using(conn: &mut SqliteConnection, id: i32) -> StoreResult<Vec<Recipe>> {
    find(conn, id)?;
    Ok(recipe_ingredients::table
        .inner_join(recipes::table)
        .filter(recipe_ingredients::ingredient_id.eq(id))
        .order(recipes::id.asc())
        .select(Recipe::as_select())
        .load(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecipeIngredient;
    use crate::query::{fixtures, recipe_ingredients as lines};

    #[test]
    fn blank_name_is_rejected() {
        let mut conn = fixtures::conn();
        let err = create(
            &mut conn,
            &NewIngredient {
                name: "   ".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn blank_optionals_are_stored_as_null() {
        let mut conn = fixtures::conn();
        let ingredient = create(
            &mut conn,
            &NewIngredient {
                name: " Flour ".to_string(),
                category: Some("".to_string()),
                purchase_link: Some("https://shop.example/flour".to_string()),
                image_url: None,
            },
        )
        .unwrap();
        assert_eq!(ingredient.name, "Flour");
        assert_eq!(ingredient.category, None);
        assert_eq!(
            ingredient.purchase_link.as_deref(),
            Some("https://shop.example/flour")
        );
    }

    #[test]
    fn update_can_clear_nullable_fields() {
        let mut conn = fixtures::conn();
        let ingredient = create(
            &mut conn,
            &NewIngredient {
                name: "Salt".to_string(),
                category: Some("Seasoning".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let updated = update(
            &mut conn,
            ingredient.id,
            &IngredientChanges {
                category: Some(None),
                image_url: Some(Some("https://img.example/salt.png".to_string())),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.name, "Salt");
        assert_eq!(updated.category, None);
        assert_eq!(updated.image_url.as_deref(), Some("https://img.example/salt.png"));
    }

    #[test]
    fn list_by_category_and_name() {
        let mut conn = fixtures::conn();
        let flour = create(
            &mut conn,
            &NewIngredient {
                name: "Wheat Flour".to_string(),
                category: Some("Baking".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        fixtures::ingredient(&mut conn, "Butter");

        let baking = list(
            &mut conn,
            &IngredientFilter {
                category: Some("Baking".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(baking, vec![flour.clone()]);

        let floury = list(
            &mut conn,
            &IngredientFilter {
                name_contains: Some("flour".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(floury, vec![flour]);
    }

    #[test]
    fn recipes_using_follows_recipe_lines() {
        let mut conn = fixtures::conn();
        let cook = fixtures::user(&mut conn, "a@x.com");
        let flour = fixtures::ingredient(&mut conn, "Flour");
        let bread = fixtures::recipe(&mut conn, &cook, "Bread");
        fixtures::recipe(&mut conn, &cook, "Salad");

        lines::create(
            &mut conn,
            &NewRecipeIngredient {
                recipe_id: bread.id,
                ingredient_id: flour.id,
                quantity_required: fixtures::qty("500"),
                unit: "g".to_string(),
                notes: None,
            },
        )
        .unwrap();

        assert_eq!(recipes_using(&mut conn, flour.id).unwrap(), vec![bread]);
        assert!(recipes_using(&mut conn, flour.id + 10)
            .unwrap_err()
            .is_not_found());
    }
}
