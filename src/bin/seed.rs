// Loads the starter communities and video catalog into DATABASE_URL

use tracing::info;
use tracing_subscriber::EnvFilter;

use parentpick::{config::Config, data_seeder, database::Database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parentpick=info")))
        .init();

    let config = Config::from_env()?;
    info!("Seeding database at {}", config.database.url);

    let db = Database::new(&config.database.url).await?;
    db.init().await?;
    data_seeder::seed_all(&db).await?;

    info!("Seeding complete");
    Ok(())
}
