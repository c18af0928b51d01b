use crate::{
    api,
    auth::{Argon2Hasher, AuthConfig, AuthService, MemoryStore, PgStore, UserStore},
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<SecretString>,
    pub config: AuthConfig,
    pub pepper: Option<SecretString>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be
/// applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store: Arc<dyn UserStore> = match &args.dsn {
        Some(dsn) => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(dsn.expose_secret())
                .await
                .context("Failed to connect to database")?;

            let store = PgStore::new(pool);
            store
                .ensure_schema()
                .await
                .context("Failed to apply users schema")?;
            Arc::new(store)
        }
        None => {
            warn!("No DSN given, users are kept in memory and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let mut hasher = Argon2Hasher::new();
    if let Some(pepper) = &args.pepper {
        hasher = hasher.with_pepper(pepper.expose_secret().as_bytes().to_vec());
    }

    let service = Arc::new(AuthService::new(args.config, store, Arc::new(hasher)));

    api::new(args.port, service).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "dsn",
            args.dsn.as_ref().map_or_else(
                || "none (in-memory store)".to_string(),
                |dsn| redact_dsn(dsn.expose_secret()),
            ),
        ),
        ("auth_scheme", args.config.scheme().to_string()),
        ("path_match", args.config.path_match().to_string()),
        ("excluded_paths", args.config.excluded_paths().join(",")),
        ("session_name", args.config.session_cookie_name().to_string()),
        ("password_pepper_set", args.pepper.is_some().to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} ({})\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
