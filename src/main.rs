use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use warbler::config::Config;
use warbler::http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // This returns an error if the `.env` file doesn't exist, but that's not what we want
    // since we're not going to use a `.env` file if we deploy this application.
    dotenvy::dotenv().ok();

    // Initialize the logger. `RUST_LOG=warbler=debug,tower_http=debug` is a good start.
    env_logger::init();

    // Parse our configuration from the environment.
    // This will exit with a help message if something is wrong.
    let config = Config::parse();

    let db = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("could not connect to database_url")?;

    // Embeds `migrations/` into the binary and brings the schema up to date on startup.
    sqlx::migrate!()
        .run(&db)
        .await
        .context("failed to run database migrations")?;

    log::info!("listening on port {}", config.port);
    http::serve(config, db).await
}
