use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, STRIPE_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = revo_api::config::config();
    tracing::info!("Starting Revo API in {:?} mode", config.environment);

    // Connect and make sure the schema exists before accepting traffic.
    let pool = revo_api::db::pool().await?;
    revo_api::db::schema::bootstrap(&pool).await?;

    let app = revo_api::routes::app();

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Revo API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
