use std::error::Error;

use foodgram::{api, connect_cache, Config, Context};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("Database ready");

    let cache = match config.redis_url.as_deref() {
        Some(url) => connect_cache(url).await,
        None => None,
    };

    let addr = config.listen_addr;
    let ctx = Context::new(pool, cache, config)?;

    log::info!("Listening on {addr}");
    warp::serve(api(ctx)).run(addr).await;

    Ok(())
}
