use crate::{
    auth::{AuthConfig, AuthScheme, PathMatch},
    cli::actions::{server::Args, Action},
};
use anyhow::{anyhow, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if the scheme or path match mode cannot be parsed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .filter(|dsn| !dsn.trim().is_empty())
        .map(|dsn| SecretString::from(dsn.clone()));

    let scheme = matches
        .get_one::<String>("auth-scheme")
        .map_or(Ok(AuthScheme::default()), |s| s.parse::<AuthScheme>())
        .map_err(|e| anyhow!(e))?;
    let path_match = matches
        .get_one::<String>("path-match")
        .map_or(Ok(PathMatch::default()), |s| s.parse::<PathMatch>())
        .map_err(|e| anyhow!(e))?;

    let mut config = AuthConfig::new(scheme).with_path_match(path_match);
    if let Some(paths) = matches.get_many::<String>("excluded-paths") {
        config = config.with_excluded_paths(paths.cloned().collect());
    }
    if let Some(name) = matches.get_one::<String>("session-name") {
        config = config.with_session_cookie_name(name.clone());
    }

    let pepper = matches
        .get_one::<String>("password-pepper")
        .filter(|pepper| !pepper.is_empty())
        .map(|pepper| SecretString::from(pepper.clone()));

    Ok(Action::Server(Args {
        port,
        dsn,
        config,
        pepper,
    }))
}
