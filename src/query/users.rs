use chrono::Utc;
use diesel::prelude::*;
use log::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{NewUser, User, UserChanges};
use crate::query::{found, like_pattern, Page};
use crate::schema::users;
use crate::validate::{self, LONG_TEXT};

const ENTITY: &str = "user";

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub email: Option<String>,
    pub name_contains: Option<String>,
    pub page: Page,
}

pub fn create(conn: &mut SqliteConnection, new: &NewUser) -> StoreResult<User> {
    let email = validate::email(&new.email)?;
    let password_hash = validate::required("password_hash", &new.password_hash, LONG_TEXT)?;
    let full_name = validate::required("full_name", &new.full_name, LONG_TEXT)?;

    let user = diesel::insert_into(users::table)
        .values((
            users::email.eq(&email),
            users::password_hash.eq(&password_hash),
            users::full_name.eq(&full_name),
            users::created_at.eq(Utc::now().naive_utc()),
        ))
        .returning(User::as_returning())
        .get_result(conn)
        .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
    info!("created user {} <{}>", user.id, user.email);
    Ok(user)
}

pub fn find(conn: &mut SqliteConnection, id: i32) -> StoreResult<User> {
    debug!("loading user {id}");
    let user = users::table
        .find(id)
        .select(User::as_select())
        .first(conn)
        .optional()?;
    found(ENTITY, id, user)
}

pub fn update(conn: &mut SqliteConnection, id: i32, changes: &UserChanges) -> StoreResult<User> {
    let changes = UserChanges {
        email: changes.email.as_deref().map(validate::email).transpose()?,
        password_hash: changes
            .password_hash
            .as_deref()
            .map(|v| validate::required("password_hash", v, LONG_TEXT))
            .transpose()?,
        full_name: changes
            .full_name
            .as_deref()
            .map(|v| validate::required("full_name", v, LONG_TEXT))
            .transpose()?,
    };

    conn.transaction::<_, StoreError, _>(|conn| {
        let current = find(conn, id)?;
        if changes.is_empty() {
            return Ok(current);
        }
        let user = diesel::update(users::table.find(id))
            .set(&changes)
            .returning(User::as_returning())
            .get_result(conn)
            .map_err(|e| StoreError::from_diesel(ENTITY, e))?;
        info!("updated user {id}");
        Ok(user)
    })
}

/// Removes the user together with their recipes, pantry, reviews and search
/// history.
pub fn delete(conn: &mut SqliteConnection, id: i32) -> StoreResult<()> {
    let removed = diesel::delete(users::table.find(id)).execute(conn)?;
    if removed == 0 {
        return Err(StoreError::NotFound { entity: ENTITY, id });
    }
    info!("deleted user {id} and everything they own");
    Ok(())
}

pub fn list(conn: &mut SqliteConnection, filter: &UserFilter) -> StoreResult<Vec<User>> {
    let mut query = users::table
        .order(users::id.asc())
        .select(User::as_select())
        .into_boxed();
    if let Some(email) = &filter.email {
        query = query.filter(users::email.eq(email.trim().to_lowercase()));
    }
    if let Some(name) = &filter.name_contains {
        query = query.filter(users::full_name.like(like_pattern(name)).escape('\\'));
    }
    Ok(query
        .limit(filter.page.sql_limit())
        .offset(filter.page.offset)
        .load(conn)?)
}

pub fn count(conn: &mut SqliteConnection) -> StoreResult<i64> {
    Ok(users::table.count().get_result(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures;

    #[test]
    fn duplicate_email_conflicts_case_insensitively() {
        let mut conn = fixtures::conn();
        fixtures::user(&mut conn, "a@x.com");

        let err = create(
            &mut conn,
            &NewUser {
                email: "A@X.com".to_string(),
                password_hash: "h".to_string(),
                full_name: "Other".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.is_conflict(), "{err}");
    }

    #[test]
    fn rejects_invalid_email() {
        let mut conn = fixtures::conn();
        let err = create(
            &mut conn,
            &NewUser {
                email: "not-an-email".to_string(),
                password_hash: "h".to_string(),
                full_name: "Nobody".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(count(&mut conn).unwrap(), 0);
    }

    #[test]
    fn update_keeps_identity_and_creation_time() {
        let mut conn = fixtures::conn();
        let user = fixtures::user(&mut conn, "a@x.com");

        let updated = update(
            &mut conn,
            user.id,
            &UserChanges {
                full_name: Some("Renamed Cook".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.id, user.id);
        assert_eq!(updated.created_at, user.created_at);
        assert_eq!(updated.email, user.email);
        assert_eq!(updated.full_name, "Renamed Cook");
    }

    #[test]
    fn update_to_taken_email_conflicts() {
        let mut conn = fixtures::conn();
        fixtures::user(&mut conn, "a@x.com");
        let other = fixtures::user(&mut conn, "b@x.com");

        let err = update(
            &mut conn,
            other.id,
            &UserChanges {
                email: Some("a@x.com".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(find(&mut conn, other.id).unwrap().email, "b@x.com");
    }

    #[test]
    fn empty_update_returns_current_record() {
        let mut conn = fixtures::conn();
        let user = fixtures::user(&mut conn, "a@x.com");
        assert_eq!(update(&mut conn, user.id, &UserChanges::default()).unwrap(), user);
        assert!(update(&mut conn, user.id + 1, &UserChanges::default())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn missing_user_is_not_found() {
        let mut conn = fixtures::conn();
        assert!(find(&mut conn, 42).unwrap_err().is_not_found());
        assert!(delete(&mut conn, 42).unwrap_err().is_not_found());
    }

    #[test]
    fn list_filters_and_pages_in_insertion_order() {
        let mut conn = fixtures::conn();
        let a = fixtures::user(&mut conn, "a@x.com");
        let b = fixtures::user(&mut conn, "b@x.com");
        let c = fixtures::user(&mut conn, "c@x.com");

        let all = list(&mut conn, &UserFilter::default()).unwrap();
        assert_eq!(all.iter().map(|u| u.id).collect::<Vec<_>>(), vec![a.id, b.id, c.id]);

        let second_page = list(
            &mut conn,
            &UserFilter {
                page: Page::first(2).next(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(second_page, vec![c]);

        let by_email = list(
            &mut conn,
            &UserFilter {
                email: Some(" B@x.com ".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_email, vec![b]);
    }
}
