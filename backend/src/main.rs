use backend::config::Config;
use backend::routes::{app, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Starting group meal election server");

    let state = AppState::new(Config::load());
    app(state).launch().await?;
    Ok(())
}
