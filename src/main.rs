use clap::{Parser, Subcommand};

use hermes_bot::application::errors::BotError;
use hermes_bot::bootstrap::{self, Platform};
use hermes_bot::infrastructure::config::Config;

#[derive(Parser)]
#[command(name = "hermes-bot")]
#[command(about = "A Discord bot answering /ping and /echo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config and environment)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot (Discord when a token is set, console otherwise)
    Run,
    /// Drive the bot from stdin
    Console,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => {
            let config = load_config(&cli.config, cli.token);
            let platform = Platform::detect(&config);
            run(config, platform)
        }
        Commands::Console => run(load_config(&cli.config, cli.token), Platform::Console),
        Commands::Version => {
            println!("hermes-bot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(&cli.config),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(config_path: &str, token_override: Option<String>) -> Config {
    let config = if std::path::Path::new(config_path).exists() {
        Config::load(config_path)
            .map(Config::with_env)
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Config::load_env()
            })
    } else {
        Config::load_env()
    };

    match token_override {
        Some(token) => config.with_token(token),
        None => config,
    }
}

fn run(config: Config, platform: Platform) -> Result<(), BotError> {
    if platform == Platform::Discord && config.token().is_none() {
        return Err(BotError::Auth(
            "no token configured: set TOKEN or DISCORD_TOKEN, or pass --token".to_string(),
        ));
    }

    tracing::info!("Starting {}", config.bot.name);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("Failed to start runtime: {}", e)))?;

    rt.block_on(async move {
        let app = bootstrap::build(config, platform);
        app.run().await
    })
}

fn init_config(path: &str) -> Result<(), BotError> {
    if std::path::Path::new(path).exists() {
        println!("{} already exists, leaving it untouched", path);
        return Ok(());
    }

    Config::default().save(path)?;
    println!("Created {}", path);
    println!("Set discord.token, or export TOKEN / DISCORD_TOKEN");
    Ok(())
}
