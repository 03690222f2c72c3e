//! ML Studio CLI — the main entry point.
//!
//! Commands:
//! - `login` / `logout` / `register` / `whoami` — Session management
//! - `projects`  — List, create and delete projects
//! - `datasets`  — List, upload and delete datasets
//! - `models`    — List, create, delete and train models
//! - `chat`      — Talk to the AI assistant
//! - `config`    — Show or initialize configuration

use clap::{CommandFactory, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "mlstudio",
    about = "ML Studio — command-line client for the ML workbench",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    /// Server origin, e.g. https://studio.example.com (overrides config)
    #[arg(long, global = true, env = "MLSTUDIO_API_URL")]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(short, long)]
        username: Option<String>,

        /// Read from the prompt when omitted
        #[arg(long, env = "MLSTUDIO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(long)]
        full_name: Option<String>,

        #[arg(long, env = "MLSTUDIO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Show the signed-in user
    Whoami,

    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: commands::projects::ProjectAction,
    },

    /// Manage datasets
    Datasets {
        #[command(subcommand)]
        action: commands::datasets::DatasetAction,
    },

    /// Manage models
    Models {
        #[command(subcommand)]
        action: commands::models::ModelAction,
    },

    /// Chat with the AI assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Model to ask (defaults to chat.default_model)
        #[arg(long)]
        model: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config_cmd::ConfigAction,
    },

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let api_url = cli.api_url;
    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(api_url, username, password).await?
        }
        Commands::Logout => commands::auth::logout(api_url).await?,
        Commands::Register {
            username,
            email,
            full_name,
            password,
        } => commands::auth::register(api_url, username, email, full_name, password).await?,
        Commands::Whoami => commands::auth::whoami(api_url).await?,
        Commands::Projects { action } => commands::projects::run(api_url, action).await?,
        Commands::Datasets { action } => commands::datasets::run(api_url, action).await?,
        Commands::Models { action } => commands::models::run(api_url, action).await?,
        Commands::Chat { message, model } => commands::chat::run(api_url, message, model).await?,
        Commands::Config { action } => commands::config_cmd::run(action).await?,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "mlstudio", &mut std::io::stdout());
        }
    }

    Ok(())
}
