use std::ops::DerefMut;

use log::{error, info};

use recipe_store::config::Config;
use recipe_store::{admin, db};

type AppError = Box<dyn std::error::Error + Send + Sync>;

fn main() {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Err(e) = run() {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let config = Config::from_env()?;
    let pool = db::create_pool(&config)?;

    let mut conn = pool.get()?;
    db::run_migrations(conn.deref_mut())?;

    for entity in admin::registry() {
        let editable: Vec<&str> = entity.editable_fields().map(|f| f.name).collect();
        info!(
            "registered {} (table {}, editable: {})",
            entity.name,
            entity.table,
            editable.join(", ")
        );
    }
    for (entity, rows) in admin::row_counts(conn.deref_mut())? {
        info!("{entity}: {rows} rows");
    }
    Ok(())
}
