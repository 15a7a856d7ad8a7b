use tracing::info;

const DEFAULT_CLIENT_ORIGIN: &str = "http://localhost:3000";

/// Environment-driven startup settings. Bind address and port stay with
/// Rocket's own configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub allowed_origin: String,
}

impl Config {
    pub fn load() -> Self {
        let allowed_origin = std::env::var("CLIENT_ORIGIN")
            .unwrap_or_else(|_| DEFAULT_CLIENT_ORIGIN.to_string());
        info!("Allowed client origin: {allowed_origin}");
        Self { allowed_origin }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_origin: DEFAULT_CLIENT_ORIGIN.to_string(),
        }
    }
}
