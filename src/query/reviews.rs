use chrono::Utc;
use diesel::prelude::*;
use log::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{NewReview, Review, ReviewChanges};
use crate::query::{ensure_exists, found, Page};
use crate::schema::reviews;
use crate::validate;

const ENTITY: &str = "review";

#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub recipe_id: Option<i32>,
    pub user_id: Option<i32>,
    pub page: Page,
}

pub fn create(conn: &mut SqliteConnection, new: &NewReview) -> StoreResult<Review> {
    let rating = validate::rating(new.rating)?;
    let comment = validate::optional("comment", new.comment.as_deref(), None)?;

    conn.transaction::<_, StoreError, _>(|conn| {
        ensure_exists!(conn, recipes, "recipe", new.recipe_id);
        ensure_exists!(conn, users, "user", new.user_id);
        let review = diesel::insert_into(reviews::table)
            .values((
                reviews::recipe_id.eq(new.recipe_id),
                reviews::user_id.eq(new.user_id),
                reviews::rating.eq(rating),
                reviews::comment.eq(&comment),
                reviews::created_at.eq(Utc::now().naive_utc()),
            ))
            .returning(Review::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!(
            "user {} rated recipe {} {}/{}",
            review.user_id,
            review.recipe_id,
            review.rating,
            validate::RATING_MAX
        );
        Ok(review)
    })
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> StoreResult<Review> {
    debug!("loading review {id}");
    let review = reviews::table
        .find(id)
        .select(Review::as_select())
        .first(conn)
        .optional()?;
    found(ENTITY, id, review)
}

pub fn update(conn: &mut SqliteConnection, id: i32, changes: &ReviewChanges) -> StoreResult<Review> {
    let changes = ReviewChanges {
        rating: changes.rating.map(validate::rating).transpose()?,
        comment: changes
            .comment
            .as_ref()
            .map(|v| validate::optional("comment", v.as_deref(), None))
            .transpose()?,
    };

    conn.transaction::<_, StoreError, _>(|conn| {
        let current = find(conn, id)?;
        if changes.is_empty() {
            return Ok(current);
        }
        let review = diesel::update(reviews::table.find(id))
            .set(&changes)
            .returning(Review::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!("updated review {id}");
        Ok(review)
    })
}

pub fn delete(conn: &mut SqliteConnection, id: i32) -> StoreResult<()> {
    let removed = diesel::delete(reviews::table.find(id)).execute(conn)?;
    if removed == 0 {
        return Err(StoreError::NotFound { entity: ENTITY, id });
    }
    info!("deleted review {id}");
    Ok(())
}

pub fn list(conn: &mut SqliteConnection, filter: &ReviewFilter) -> StoreResult<Vec<Review>> {
    let mut query = reviews::table
        .order(reviews::id.asc())
        .select(Review::as_select())
        .into_boxed();
    if let Some(recipe_id) = filter.recipe_id {
        query = query.filter(reviews::recipe_id.eq(recipe_id));
    }
    if let Some(user_id) = filter.user_id {
        query = query.filter(reviews::user_id.eq(user_id));
    }
    Ok(query
        .limit(filter.page.sql_limit())
        .offset(filter.page.offset)
        .load(conn)?)
}

pub fn count(conn: &mut SqliteConnection) -> StoreResult<i64> {
    Ok(reviews::table.count().get_result(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures;

    #[test]
    fn rating_outside_range_is_rejected() {
        let mut conn = fixtures::conn();
        let cook = fixtures::user(&mut conn, "a@x.com");
        let bread = fixtures::recipe(&mut conn, &cook, "Bread");

        for rating in [0, 6] {
            let err = create(
                &mut conn,
                &NewReview {
                    recipe_id: bread.id,
                    user_id: cook.id,
                    rating,
                    comment: None,
                },
            )
            .unwrap_err();
            assert!(err.is_validation(), "rating {rating}: {err}");
        }
        assert_eq!(count(&mut conn).unwrap(), 0);
    }

    #[test]
    fn update_never_touches_creation_time() {
        let mut conn = fixtures::conn();
        let cook = fixtures::user(&mut conn, "a@x.com");
        let critic = fixtures::user(&mut conn, "c@x.com");
        let bread = fixtures::recipe(&mut conn, &cook, "Bread");
        let review = create(
            &mut conn,
            &NewReview {
                recipe_id: bread.id,
                user_id: critic.id,
                rating: 3,
                comment: Some("Dense".to_string()),
            },
        )
        .unwrap();

        let revised = update(
            &mut conn,
            review.id,
            &ReviewChanges {
                rating: Some(4),
                comment: Some(None),
            },
        )
        .unwrap();
        assert_eq!(revised.rating, 4);
        assert_eq!(revised.comment, None);
        assert_eq!(revised.created_at, review.created_at);

        assert!(update(
            &mut conn,
            review.id,
            &ReviewChanges {
                rating: Some(9),
                ..Default::default()
            }
        )
        .unwrap_err()
        .is_validation());
    }

    #[test]
    fn reviews_go_with_their_author() {
        let mut conn = fixtures::conn();
        let cook = fixtures::user(&mut conn, "a@x.com");
        let critic = fixtures::user(&mut conn, "c@x.com");
        let bread = fixtures::recipe(&mut conn, &cook, "Bread");
        let review = create(
            &mut conn,
            &NewReview {
                recipe_id: bread.id,
                user_id: critic.id,
                rating: 5,
                comment: None,
            },
        )
        .unwrap();

        let for_bread = list(
            &mut conn,
            &ReviewFilter {
                recipe_id: Some(bread.id),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(for_bread, vec![review.clone()]);

        crate::query::users::delete(&mut conn, critic.id).unwrap();
        assert!(find(&mut conn, review.id).unwrap_err().is_not_found());
        crate::query::recipes::find(&mut conn, bread.id).unwrap();
    }
}
