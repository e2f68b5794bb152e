use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// A field value the store refuses to persist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("{0:?} is not a valid email address")]
    InvalidEmail(String),

    #[error("{0:?} is not a valid approval status")]
    UnknownStatus(String),

    #[error("{0:?} is not a valid decimal quantity")]
    InvalidDecimal(String),

    #[error("constraint rejected by storage: {0}")]
    Constraint(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} conflicts with an existing record: {detail}")]
    Conflict { entity: &'static str, detail: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("database error: {0}")]
    Database(#[from] DieselError),

    #[error("connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    /// Classifies a failed write against `entity` by the constraint the
    /// storage engine reported.
    pub fn from_diesel(entity: &'static str, err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict {
                    entity,
                    detail: info.message().to_string(),
                }
            }
            DieselError::DatabaseError(
                DatabaseErrorKind::CheckViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::ForeignKeyViolation,
                info,
            ) => ValidationError::Constraint(info.message().to_string()).into(),
            other => StoreError::Database(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }
}
