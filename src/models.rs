use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schema::{
    ingredients, recipe_ingredients, recipe_tags, recipes, reviews, search_history, tags,
    user_pantry, users,
};

/// Fixed-point decimal with two fractional digits and at most ten digits in
/// total. Stored as canonical text such as `2.50`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    pub const SCALE: u32 = 2;
    pub const MAX_DIGITS: u32 = 10;

    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        let normalized = value.normalize();
        if normalized.scale() > Self::SCALE {
            return Err(ValidationError::InvalidDecimal(value.to_string()));
        }
        let limit = Decimal::from(10_i64.pow(Self::MAX_DIGITS - Self::SCALE));
        if normalized.abs() >= limit {
            return Err(ValidationError::InvalidDecimal(value.to_string()));
        }
        let mut fixed = normalized;
        fixed.rescale(Self::SCALE);
        Ok(Quantity(fixed))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<Decimal>()
            .map_err(|_| ValidationError::InvalidDecimal(s.to_string()))?;
        Quantity::new(value)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ToSql<Text, Sqlite> for Quantity {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.0.to_string());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for Quantity {
    fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let text = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(text.parse::<Quantity>()?)
    }
}

/// Moderation state of a recipe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub const ALL: [ApprovalStatus; 3] = [
        ApprovalStatus::Pending,
        ApprovalStatus::Approved,
        ApprovalStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApprovalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql<Text, Sqlite> for ApprovalStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for ApprovalStatus {
    fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let text = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(text.parse::<ApprovalStatus>()?)
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Sqlite))]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub created_at: NaiveDateTime,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password_hash.is_none() && self.full_name.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = ingredients)]
#[diesel(check_for_backend(Sqlite))]
pub struct Ingredient {
    pub id: i32,
    pub name: String,
    pub category: Option<String>,
    pub purchase_link: Option<String>,
    pub image_url: Option<String>,
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub category: Option<String>,
    pub purchase_link: Option<String>,
    pub image_url: Option<String>,
}

/// `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = ingredients)]
pub struct IngredientChanges {
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub purchase_link: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
}

impl IngredientChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.purchase_link.is_none()
            && self.image_url.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = tags)]
#[diesel(check_for_backend(Sqlite))]
pub struct Tag {
    pub id: i32,
    pub tag_name: String,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag_name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTag {
    pub tag_name: String,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = tags)]
pub struct TagChanges {
    pub tag_name: Option<String>,
}

impl TagChanges {
    pub fn is_empty(&self) -> bool {
        self.tag_name.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = search_history)]
#[diesel(check_for_backend(Sqlite))]
pub struct SearchEntry {
    pub id: i32,
    pub user_id: i32,
    pub search_query: String,
    pub searched_on: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSearch {
    pub user_id: i32,
    pub search_query: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = recipes)]
#[diesel(check_for_backend(Sqlite))]
pub struct Recipe {
    pub id: i32,
    pub uploader_id: i32,
    pub title: String,
    pub instructions: String,
    pub cuisine: Option<String>,
    pub prep_time_mins: Option<i32>,
    pub calories: Option<i32>,
    pub approval_status: ApprovalStatus,
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Leaving `approval_status` unset creates the recipe as pending.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRecipe {
    pub uploader_id: i32,
    pub title: String,
    pub instructions: String,
    pub cuisine: Option<String>,
    pub prep_time_mins: Option<i32>,
    pub calories: Option<i32>,
    pub approval_status: Option<ApprovalStatus>,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = recipes)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub instructions: Option<String>,
    pub cuisine: Option<Option<String>>,
    pub prep_time_mins: Option<Option<i32>>,
    pub calories: Option<Option<i32>>,
    pub approval_status: Option<ApprovalStatus>,
}

impl RecipeChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.instructions.is_none()
            && self.cuisine.is_none()
            && self.prep_time_mins.is_none()
            && self.calories.is_none()
            && self.approval_status.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = recipe_ingredients)]
#[diesel(check_for_backend(Sqlite))]
pub struct RecipeIngredient {
    pub id: i32,
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub quantity_required: Quantity,
    pub unit: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipeIngredient {
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub quantity_required: Quantity,
    pub unit: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = recipe_ingredients)]
pub struct RecipeIngredientChanges {
    pub quantity_required: Option<Quantity>,
    pub unit: Option<String>,
    pub notes: Option<Option<String>>,
}

impl RecipeIngredientChanges {
    pub fn is_empty(&self) -> bool {
        self.quantity_required.is_none() && self.unit.is_none() && self.notes.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = recipe_tags)]
#[diesel(check_for_backend(Sqlite))]
pub struct RecipeTag {
    pub id: i32,
    pub recipe_id: i32,
    pub tag_id: i32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NewRecipeTag {
    pub recipe_id: i32,
    pub tag_id: i32,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = user_pantry)]
#[diesel(check_for_backend(Sqlite))]
pub struct PantryItem {
    pub id: i32,
    pub user_id: i32,
    pub ingredient_id: i32,
    pub quantity: Quantity,
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPantryItem {
    pub user_id: i32,
    pub ingredient_id: i32,
    pub quantity: Quantity,
    pub unit: String,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = user_pantry)]
pub struct PantryItemChanges {
    pub quantity: Option<Quantity>,
    pub unit: Option<String>,
}

impl PantryItemChanges {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.unit.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(Sqlite))]
pub struct Review {
    pub id: i32,
    pub recipe_id: i32,
    pub user_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewReview {
    pub recipe_id: i32,
    pub user_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = reviews)]
pub struct ReviewChanges {
    pub rating: Option<i32>,
    pub comment: Option<Option<String>>,
}

impl ReviewChanges {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.comment.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2.5", "2.50")]
    #[case("2.50", "2.50")]
    #[case("0", "0.00")]
    #[case(" 12 ", "12.00")]
    #[case("99999999.99", "99999999.99")]
    fn quantity_is_canonical_with_two_places(#[case] input: &str, #[case] expected: &str) {
        let quantity: Quantity = input.parse().unwrap();
        assert_eq!(quantity.to_string(), expected);
    }

    #[rstest]
    #[case("1.234")]
    #[case("100000000")]
    #[case("abc")]
    #[case("")]
    fn quantity_rejects_out_of_format_values(#[case] input: &str) {
        assert!(matches!(
            input.parse::<Quantity>(),
            Err(ValidationError::InvalidDecimal(_))
        ));
    }

    #[test]
    fn quantity_keeps_trailing_zero_precision_equal() {
        let a: Quantity = "2.5".parse().unwrap();
        let b: Quantity = "2.500".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(b.to_string(), "2.50");
    }

    #[test]
    fn quantity_serializes_as_string() {
        let quantity: Quantity = "2.5".parse().unwrap();
        assert_eq!(serde_json::to_string(&quantity).unwrap(), "\"2.50\"");
    }

    #[test]
    fn quantity_deserialization_keeps_the_format() {
        let quantity: Quantity = serde_json::from_str("\"2.5\"").unwrap();
        assert_eq!(quantity.to_string(), "2.50");
        assert!(serde_json::from_str::<Quantity>("\"1.234\"").is_err());

        let line = serde_json::from_str::<NewRecipeIngredient>(
            r#"{"recipe_id":1,"ingredient_id":1,"quantity_required":"1.234","unit":"kg","notes":null}"#,
        );
        assert!(line.is_err());
    }

    #[test]
    fn approval_status_defaults_to_pending() {
        assert_eq!(ApprovalStatus::default(), ApprovalStatus::Pending);
    }

    #[test]
    fn approval_status_parses_only_known_values() {
        for status in ApprovalStatus::ALL {
            assert_eq!(status.as_str().parse::<ApprovalStatus>().unwrap(), status);
        }
        assert_eq!(
            "Approved".parse::<ApprovalStatus>(),
            Err(ValidationError::UnknownStatus("Approved".to_string()))
        );
    }

    #[test]
    fn user_json_omits_password_hash() {
        let user = User {
            id: 1,
            email: "a@x.com".to_string(),
            password_hash: "secret".to_string(),
            full_name: "A".to_string(),
            created_at: chrono::Utc::now().naive_utc(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(user.to_string(), "a@x.com");
    }
}
