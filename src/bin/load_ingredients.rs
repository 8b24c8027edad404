use std::{error::Error, fs::File, path::PathBuf};

use clap::Parser;
use foodgram::{
    actions::load_ingredients, connect_cache, import::parse_ingredients, invalidate_reference_cache,
};
use sqlx::postgres::PgPoolOptions;

/// Loads reference ingredients from a `name,measurement_unit` CSV file.
#[derive(Parser, Debug)]
#[command(name = "load_ingredients")]
struct Args {
    /// CSV file without a header row
    #[arg(default_value = "data/ingredients.csv")]
    path: PathBuf,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let rows = parse_ingredients(File::open(&args.path)?)?;
    log::info!("Read {} rows from {}", rows.len(), args.path.display());

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&args.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let report = load_ingredients(&rows, &pool)
        .await
        .map_err(|e| format!("Loading failed: {:?}", e.info))?;

    if let Some(url) = args.redis_url.as_deref() {
        if let Some(mut cache) = connect_cache(url).await {
            invalidate_reference_cache(&mut cache)
                .await
                .map_err(|e| format!("Cache invalidation failed: {:?}", e.info))?;
        }
    }

    println!(
        "{} ingredients created, {} already existed",
        report.created, report.existing
    );
    Ok(())
}
