use dotenvy::dotenv;
use jobportal::seed::seed_categories;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use std::env;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    // Initialise tracing (INFO level)
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load .env (if present) so DATABASE_URL from file is visible
    let _ = dotenv();

    let Ok(url) = env::var("DATABASE_URL") else {
        error!("DATABASE_URL not set; nothing to seed");
        std::process::exit(1);
    };

    let db = match Database::connect(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            error!(?e, "failed to connect to database");
            std::process::exit(1);
        }
    };

    if let Err(e) = Migrator::up(&db, None).await {
        error!(?e, "migrations failed");
        std::process::exit(1);
    }

    match seed_categories(&db).await {
        Ok(added) => info!(added, "Seeding finished"),
        Err(e) => {
            error!(?e, "seeding categories failed");
            std::process::exit(1);
        }
    }
}
