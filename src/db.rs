use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

use crate::config::Config;
use crate::error::{StoreError, StoreResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

const POOL_CONNECTION_TIMEOUT_SECONDS: u64 = 30;

/// Per-connection PRAGMAs. SQLite leaves foreign keys off by default, and
/// every cascade in the schema depends on them.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions {
    pub busy_timeout_ms: u32,
}

impl ConnectionOptions {
    fn apply(&self, conn: &mut SqliteConnection) -> QueryResult<()> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        ))
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5000,
        }
    }
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        self.apply(conn).map_err(r2d2::Error::QueryError)
    }
}

pub fn create_pool(config: &Config) -> StoreResult<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(&config.database_url);
    let pool = r2d2::Pool::builder()
        .max_size(config.pool_max_size)
        .connection_timeout(Duration::from_secs(POOL_CONNECTION_TIMEOUT_SECONDS))
        .connection_customizer(Box::new(ConnectionOptions {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(manager)?;
    info!(
        "connection pool ready for {} (max {} connections)",
        config.database_url, config.pool_max_size
    );
    Ok(pool)
}

pub fn run_migrations(conn: &mut SqliteConnection) -> StoreResult<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Migration(e.to_string()))?;
    for version in &applied {
        info!("applied migration {version}");
    }
    Ok(())
}

/// Opens a single connection with the schema in place. `":memory:"` gives a
/// private throwaway database.
pub fn open(database_url: &str) -> StoreResult<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)?;
    ConnectionOptions::default().apply(&mut conn)?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::sql_types::Integer;

    #[derive(QueryableByName)]
    struct Flag {
        #[diesel(sql_type = Integer)]
        foreign_keys: i32,
    }

    #[test]
    fn open_enables_foreign_keys() {
        let mut conn = open(":memory:").unwrap();
        let flag: Flag = diesel::sql_query("PRAGMA foreign_keys")
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(flag.foreign_keys, 1);
    }

    #[test]
    fn migrations_are_idempotent() {
        let mut conn = open(":memory:").unwrap();
        run_migrations(&mut conn).unwrap();
        assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());
    }

    #[test]
    fn pool_hands_out_configured_connections() {
        let dir = std::env::temp_dir().join(format!("recipe-store-pool-{}.db", std::process::id()));
        let config = Config {
            database_url: dir.to_string_lossy().into_owned(),
            pool_max_size: 2,
            busy_timeout_ms: 1000,
        };
        let pool = create_pool(&config).unwrap();
        let mut conn = pool.get().unwrap();
        run_migrations(&mut conn).unwrap();
        let flag: Flag = diesel::sql_query("PRAGMA foreign_keys")
            .get_result(&mut *conn)
            .unwrap();
        assert_eq!(flag.foreign_keys, 1);
        drop(conn);
        drop(pool);
        let _ = std::fs::remove_file(dir);
    }
}
