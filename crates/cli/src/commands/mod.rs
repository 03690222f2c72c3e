//! Subcommand implementations and the helpers they share.

pub mod auth;
pub mod chat;
pub mod config_cmd;
pub mod datasets;
pub mod models;
pub mod projects;

use mlstudio_client::Workbench;
use mlstudio_config::ClientConfig;
use mlstudio_core::error::ClientError;
use mlstudio_core::resource::ResourceKey;
use mlstudio_core::session::SessionStatus;
use serde::de::DeserializeOwned;
use std::error::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub type CmdResult = Result<(), Box<dyn Error>>;

/// Load config, build the workbench and restore any saved session.
pub async fn open(api_url: Option<String>) -> Result<Workbench, Box<dyn Error>> {
    let mut config = ClientConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(url) = api_url {
        config.api_url = Some(url);
    }

    let workbench = Workbench::from_config(config).map_err(fail)?;
    let status = workbench.hydrate().await;
    debug!(?status, "Session restored");
    Ok(workbench)
}

/// Like [`open`], but refuses to continue without a session.
pub async fn open_authenticated(api_url: Option<String>) -> Result<Workbench, Box<dyn Error>> {
    let workbench = open(api_url).await?;
    if workbench.status() != SessionStatus::Authenticated {
        return Err("Not signed in — run `mlstudio login` first".into());
    }
    Ok(workbench)
}

/// Read a collection; Ctrl+C abandons the wait.
pub async fn read_interruptible<T: DeserializeOwned>(
    workbench: &Workbench,
    key: &ResourceKey,
) -> Result<T, Box<dyn Error>> {
    let token = CancellationToken::new();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };

    let result = workbench.read_cancellable(key, &token).await;
    watcher.abort();

    match result {
        Some(result) => result.map_err(fail),
        None => Err("Cancelled".into()),
    }
}

/// Surface a client error as its user-facing message.
pub fn fail(error: ClientError) -> Box<dyn Error> {
    error.user_message().into()
}

/// Human-readable byte count: `0 Bytes`, `1.5 KB`, `12.34 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".into();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let rounded = (size * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
