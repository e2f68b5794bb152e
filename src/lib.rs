//! Storage layer for a recipe-sharing application: users, ingredients, tags,
//! recipes with their ingredient lines and tags, pantries, reviews and
//! search history, kept in SQLite through diesel.

pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod schema;
pub mod validate;

pub use error::{StoreError, StoreResult, ValidationError};
