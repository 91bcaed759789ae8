use greeting_service as app;
use json_handler_func::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let router = app::build_router(Config::default())?;

    let address = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into())
        + ":"
        + &std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    tracing::info!("🚀 Server running at http://{}", address);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
