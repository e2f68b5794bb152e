use diesel::prelude::*;
use log::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{NewPantryItem, PantryItem, PantryItemChanges};
use crate::query::{ensure_exists, found, Page};
use crate::schema::user_pantry;
use crate::validate::{self, UNIT_TEXT};

const ENTITY: &str = "pantry item";

#[derive(Debug, Clone, Default)]
pub struct PantryFilter {
    pub user_id: Option<i32>,
    pub ingredient_id: Option<i32>,
    pub page: Page,
}

pub fn create(conn: &mut SqliteConnection, new: &NewPantryItem) -> StoreResult<PantryItem> {
    let quantity = validate::non_negative_quantity("quantity", &new.quantity)?;
    let unit = validate::required("unit", &new.unit, UNIT_TEXT)?;

    conn.transaction::<_, StoreError, _>(|conn| {
        ensure_exists!(conn, users, "user", new.user_id);
        ensure_exists!(conn, ingredients, "ingredient", new.ingredient_id);
        let item = diesel::insert_into(user_pantry::table)
            .values((
                user_pantry::user_id.eq(new.user_id),
                user_pantry::ingredient_id.eq(new.ingredient_id),
                user_pantry::quantity.eq(quantity),
                user_pantry::unit.eq(&unit),
            ))
            .returning(PantryItem::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!(
            "user {} stocked {} {} of ingredient {}",
            item.user_id, item.quantity, item.unit, item.ingredient_id
        );
        Ok(item)
    })
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> StoreResult<PantryItem> {
    debug!("loading pantry item {id}");
    let item = user_pantry::table
        .find(id)
        .select(PantryItem::as_select())
        .first(conn)
        .optional()?;
    found(ENTITY, id, item)
}

pub fn update(
    conn: &mut SqliteConnection,
    id: i32,
    changes: &PantryItemChanges,
) -> StoreResult<PantryItem> {
    let changes = PantryItemChanges {
        quantity: changes
            .quantity
            .as_ref()
            .map(|q| validate::non_negative_quantity("quantity", q))
            .transpose()?,
        unit: changes
            .unit
            .as_deref()
            .map(|v| validate::required("unit", v, UNIT_TEXT))
            .transpose()?,
    };

    conn.transaction::<_, StoreError, _>(|conn| {
        let current = find(conn, id)?;
        if changes.is_empty() {
            return Ok(current);
        }
        let item = diesel::update(user_pantry::table.find(id))
            .set(&changes)
            .returning(PantryItem::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!("updated pantry item {id}");
        Ok(item)
    })
}

pub fn delete(conn: &mut SqliteConnection, id: i32) -> StoreResult<()> {
    let removed = diesel::delete(user_pantry::table.find(id)).execute(conn)?;
    if removed == 0 {
        return Err(StoreError::NotFound { entity: ENTITY, id });
    }
    info!("deleted pantry item {id}");
    Ok(())
}

pub fn list(conn: &mut SqliteConnection, filter: &PantryFilter) -> StoreResult<Vec<PantryItem>> {
    let mut query = user_pantry::table
        .order(user_pantry::id.asc())
        .select(PantryItem::as_select())
        .into_boxed();
    if let Some(user_id) = filter.user_id {
        query = query.filter(user_pantry::user_id.eq(user_id));
    }
    if let Some(ingredient_id) = filter.ingredient_id {
        query = query.filter(user_pantry::ingredient_id.eq(ingredient_id));
    }
    Ok(query
        .limit(filter.page.sql_limit())
        .offset(filter.page.offset)
        .load(conn)?)
}

pub fn count(conn: &mut SqliteConnection) -> StoreResult<i64> {
    Ok(user_pantry::table.count().get_result(conn)?)
}
