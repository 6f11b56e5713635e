//! Shared setup for the CloudPOS demo binaries

use anyhow::{Context, Result};
use cloudpos_client::config::{ClientOptions, ENV_DEBUG};
use cloudpos_client::CloudPos;
use log::LevelFilter;
use std::env;

/// Load `.env`, install the logger and build a client from the environment
pub fn init() -> Result<CloudPos> {
    dotenv::dotenv().ok();
    init_logger();

    // After the logger, so warnings about bad settings are printed.
    let options = ClientOptions::from_env();
    log::debug!("using API at {}", options.base_url);
    CloudPos::new(options).context("could not build the CloudPOS client")
}

fn init_logger() {
    let debug = env::var(ENV_DEBUG).map(|v| v.trim() == "1").unwrap_or(false);
    pretty_env_logger::formatted_builder()
        .parse_filters(&log_filters(debug, env::var("RUST_LOG").ok()))
        .init();
}

/// Debug level when `CLOUDPOS_DEBUG=1`, else `RUST_LOG`, else info
fn log_filters(debug: bool, rust_log: Option<String>) -> String {
    match rust_log {
        _ if debug => LevelFilter::Debug.to_string(),
        Some(filters) if !filters.trim().is_empty() => filters,
        _ => LevelFilter::Info.to_string(),
    }
}

/// Read a required environment variable
pub fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} must be set", name))
}

/// Link the terminal and log in with the `CLOUDPOS_*` credentials
pub async fn sign_in(pos: &CloudPos) -> Result<()> {
    let email = required("CLOUDPOS_EMAIL")?;
    let code = required("CLOUDPOS_CODE")?;
    let user = required("CLOUDPOS_USER")?;
    let password = required("CLOUDPOS_PASSWORD")?;

    pos.auth().link(&email, &code).await?;
    let outcome = pos.auth().login(&user, &password).await?;
    println!("Sesión iniciada: {} ({})", outcome.user, outcome.role);
    Ok(())
}
