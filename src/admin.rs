//! Declared metadata for every entity, in the shape a generic CRUD console
//! needs: which table backs it, how to label a row, and which fields can be
//! edited.

use diesel::SqliteConnection;
use serde::Serialize;

use crate::error::StoreResult;
use crate::query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Identity,
    Text,
    LongText,
    Email,
    Url,
    Integer,
    Decimal,
    Timestamp,
    Choice,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMeta {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    pub unique: bool,
    pub editable: bool,
    pub max_length: Option<usize>,
    /// Entity name on the other end of a reference.
    pub references: Option<&'static str>,
}

impl FieldMeta {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            unique: false,
            editable: true,
            max_length: None,
            references: None,
        }
    }

    const fn id() -> Self {
        Self::new("id", FieldKind::Identity).fixed()
    }

    const fn text(name: &'static str, max_length: usize) -> Self {
        let mut field = Self::new(name, FieldKind::Text);
        field.max_length = Some(max_length);
        field
    }

    /// Owner or join references are set at creation only.
    const fn reference(name: &'static str, target: &'static str) -> Self {
        let mut field = Self::new(name, FieldKind::Reference).fixed();
        field.references = Some(target);
        field
    }

    const fn created(name: &'static str) -> Self {
        Self::new(name, FieldKind::Timestamp).fixed()
    }

    const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    const fn fixed(mut self) -> Self {
        self.editable = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityMeta {
    pub name: &'static str,
    pub table: &'static str,
    /// Field used to label a row, when a single field does.
    pub display_field: Option<&'static str>,
    pub fields: &'static [FieldMeta],
    pub unique_together: &'static [&'static str],
}

impl EntityMeta {
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn editable_fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.iter().filter(|f| f.editable)
    }
}

static REGISTRY: [EntityMeta; 9] = [
    EntityMeta {
        name: "user",
        table: "users",
        display_field: Some("email"),
        fields: &[
            FieldMeta::id(),
            FieldMeta::new("email", FieldKind::Email).unique(),
            FieldMeta::text("password_hash", 255),
            FieldMeta::text("full_name", 255),
            FieldMeta::created("created_at"),
        ],
        unique_together: &[],
    },
    EntityMeta {
        name: "ingredient",
        table: "ingredients",
        display_field: Some("name"),
        fields: &[
            FieldMeta::id(),
            FieldMeta::text("name", 255),
            FieldMeta::text("category", 100).nullable(),
            FieldMeta::new("purchase_link", FieldKind::Url).nullable(),
            FieldMeta::new("image_url", FieldKind::Url).nullable(),
        ],
        unique_together: &[],
    },
    EntityMeta {
        name: "tag",
        table: "tags",
        display_field: Some("tag_name"),
        fields: &[FieldMeta::id(), FieldMeta::text("tag_name", 100).unique()],
        unique_together: &[],
    },
    EntityMeta {
        name: "search entry",
        table: "search_history",
        display_field: Some("search_query"),
        fields: &[
            FieldMeta::id(),
            FieldMeta::reference("user_id", "user"),
            FieldMeta::text("search_query", 255).fixed(),
            FieldMeta::created("searched_on"),
        ],
        unique_together: &[],
    },
    EntityMeta {
        name: "recipe",
        table: "recipes",
        display_field: Some("title"),
        fields: &[
            FieldMeta::id(),
            FieldMeta::reference("uploader_id", "user"),
            FieldMeta::text("title", 255),
            FieldMeta::new("instructions", FieldKind::LongText),
            FieldMeta::text("cuisine", 100).nullable(),
            FieldMeta::new("prep_time_mins", FieldKind::Integer).nullable(),
            FieldMeta::new("calories", FieldKind::Integer).nullable(),
            FieldMeta::new("approval_status", FieldKind::Choice),
        ],
        unique_together: &[],
    },
    EntityMeta {
        name: "recipe ingredient",
        table: "recipe_ingredients",
        display_field: None,
        fields: &[
            FieldMeta::id(),
            FieldMeta::reference("recipe_id", "recipe"),
            FieldMeta::reference("ingredient_id", "ingredient"),
            FieldMeta::new("quantity_required", FieldKind::Decimal),
            FieldMeta::text("unit", 50),
            FieldMeta::text("notes", 255).nullable(),
        ],
        unique_together: &["recipe_id", "ingredient_id"],
    },
    EntityMeta {
        name: "recipe tag",
        table: "recipe_tags",
        display_field: None,
        fields: &[
            FieldMeta::id(),
            FieldMeta::reference("recipe_id", "recipe"),
            FieldMeta::reference("tag_id", "tag"),
        ],
        unique_together: &["recipe_id", "tag_id"],
    },
    EntityMeta {
        name: "pantry item",
        table: "user_pantry",
        display_field: None,
        fields: &[
            FieldMeta::id(),
            FieldMeta::reference("user_id", "user"),
            FieldMeta::reference("ingredient_id", "ingredient"),
            FieldMeta::new("quantity", FieldKind::Decimal),
            FieldMeta::text("unit", 50),
        ],
        unique_together: &[],
    },
    EntityMeta {
        name: "review",
        table: "reviews",
        display_field: None,
        fields: &[
            FieldMeta::id(),
            FieldMeta::reference("recipe_id", "recipe"),
            FieldMeta::reference("user_id", "user"),
            FieldMeta::new("rating", FieldKind::Integer),
            FieldMeta::new("comment", FieldKind::LongText).nullable(),
            FieldMeta::created("created_at"),
        ],
        unique_together: &[],
    },
];

pub fn registry() -> &'static [EntityMeta] {
    &REGISTRY
}

/// Finds an entity by its name or its table name.
pub fn lookup(name: &str) -> Option<&'static EntityMeta> {
    REGISTRY
        .iter()
        .find(|entity| entity.name == name || entity.table == name)
}

type Counter = fn(&mut SqliteConnection) -> StoreResult<i64>;

const COUNTERS: [(&str, Counter); 9] = [
    ("user", query::users::count),
    ("ingredient", query::ingredients::count),
    ("tag", query::tags::count),
    ("search entry", query::search_history::count),
    ("recipe", query::recipes::count),
    ("recipe ingredient", query::recipe_ingredients::count),
    ("recipe tag", query::recipe_tags::count),
    ("pantry item", query::pantry::count),
    ("review", query::reviews::count),
];

/// Current row count for every registered entity, in registry order.
pub fn row_counts(conn: &mut SqliteConnection) -> StoreResult<Vec<(&'static str, i64)>> {
    COUNTERS
        .iter()
        .map(|(name, count)| Ok((*name, count(conn)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fixtures;
    use diesel::prelude::*;
    use diesel::sql_types::{Integer, Text};

    #[derive(QueryableByName)]
    struct ColumnInfo {
        #[diesel(sql_type = Text)]
        name: String,
        #[diesel(sql_type = Integer)]
        notnull: i32,
    }

    #[test]
    fn registry_matches_live_schema() {
        let mut conn = fixtures::conn();
        for entity in registry() {
            let columns: Vec<ColumnInfo> =
                diesel::sql_query(format!("PRAGMA table_info({})", entity.table))
                    .load(&mut conn)
                    .unwrap();
            let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
            let declared: Vec<&str> = entity.fields.iter().map(|f| f.name).collect();
            assert_eq!(names, declared, "columns of {}", entity.table);

            for column in &columns {
                let field = entity.field(&column.name).unwrap();
                if field.kind != FieldKind::Identity {
                    assert_eq!(
                        field.nullable,
                        column.notnull == 0,
                        "nullability of {}.{}",
                        entity.table,
                        column.name
                    );
                }
            }
        }
    }

    #[test]
    fn identities_references_and_timestamps_are_not_editable() {
        for entity in registry() {
            for field in entity.fields {
                if matches!(
                    field.kind,
                    FieldKind::Identity | FieldKind::Timestamp | FieldKind::Reference
                ) {
                    assert!(!field.editable, "{}.{}", entity.table, field.name);
                }
            }
        }
        let review = lookup("reviews").unwrap();
        let editable: Vec<&str> = review.editable_fields().map(|f| f.name).collect();
        assert_eq!(editable, vec!["rating", "comment"]);
    }

    #[test]
    fn lookup_by_name_or_table() {
        assert_eq!(lookup("pantry item").unwrap().table, "user_pantry");
        assert_eq!(lookup("user_pantry").unwrap().name, "pantry item");
        assert!(lookup("meal_plans").is_none());
        assert!(lookup("users").unwrap().field("email").unwrap().unique);
    }

    #[test]
    fn every_entity_has_a_counter() {
        let counted: Vec<&str> = COUNTERS.iter().map(|(name, _)| *name).collect();
        let registered: Vec<&str> = registry().iter().map(|e| e.name).collect();
        assert_eq!(counted, registered);
    }

    #[test]
    fn row_counts_cover_every_entity() {
        let mut conn = fixtures::conn();
        let cook = fixtures::user(&mut conn, "a@x.com");
        fixtures::recipe(&mut conn, &cook, "Bread");

        let counts = row_counts(&mut conn).unwrap();
        assert_eq!(counts.len(), 9);
        assert!(counts.contains(&("user", 1)));
        assert!(counts.contains(&("recipe", 1)));
        assert!(counts.contains(&("review", 0)));
    }
}
