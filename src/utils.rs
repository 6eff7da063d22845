use chrono::{DateTime, Utc};

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Reads an environment variable, treating an empty value as unset.
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_opt(name).and_then(|value| value.parse().ok()).unwrap_or(default)
}

/// Loads `.env` from the working directory, falling back to the crate root.
pub fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}
