//! `mlstudio config` — Configuration management commands.

use clap::Subcommand;
use mlstudio_config::ClientConfig;

use super::CmdResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check the config file and report problems
    Validate,

    /// Print the config file location
    Path,
}

pub async fn run(action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Show => show(),
        ConfigAction::Init { force } => init(force),
        ConfigAction::Validate => validate(),
        ConfigAction::Path => {
            println!("{}", ClientConfig::config_dir().join("config.toml").display());
            Ok(())
        }
    }
}

fn show() -> CmdResult {
    let config = ClientConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn init(force: bool) -> CmdResult {
    let config_dir = ClientConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() && !force {
        println!("  Config already exists: {}", config_path.display());
        println!("  Use --force to overwrite it.");
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, ClientConfig::default_toml())?;
    println!("✅ Wrote {}", config_path.display());
    Ok(())
}

fn validate() -> CmdResult {
    println!("🔍 Validating configuration...");

    let config = match ClientConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed successfully");

    let mut warnings = Vec::new();
    if config.api_url.as_deref().is_some_and(|u| u.starts_with("http://"))
        && !config.api_url.as_deref().is_some_and(|u| u.contains("localhost") || u.contains("127.0.0.1"))
    {
        warnings.push("api_url uses plain http:// for a remote server; credentials travel unencrypted");
    }
    if config.request_timeout_secs > 300 {
        warnings.push("request_timeout_secs above 300 makes a dead server very slow to detect");
    }
    if config.upload.max_size_bytes > 100 * 1024 * 1024 {
        warnings.push("upload.max_size_bytes is above the server's 100 MB limit");
    }

    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   Server:        {}", config.base_url());
    println!("   Origin:        {}", config.current_origin);
    println!("   Timeout:       {}s", config.request_timeout_secs);
    println!("   On 401:        {:?}", config.on_unauthorized);
    println!("   Token store:   {} ({})", config.session.store, config.token_path().display());
    println!("   Upload limit:  {} bytes", config.upload.max_size_bytes);
    println!("   Upload types:  {}", config.upload.allowed_extensions.join(", "));
    println!("   Chat model:    {}", config.chat.default_model);
    Ok(())
}
