use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fintrack::commands::{
    LoginCommand, PullCommand, PushCommand, RegisterCommand, StatusCommand, VerifyCommand,
};
use fintrack::config::Config;

#[derive(Parser)]
#[command(name = "fintrack")]
#[command(version)]
#[command(about = "A personal finance CLI with server sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a login code
    Login(LoginCommand),

    /// Request a registration code
    Register(RegisterCommand),

    /// Submit a verification code and store the access token
    Verify(VerifyCommand),

    /// Show per-kind last-update times on the server
    Status(StatusCommand),

    /// Fetch server-side changes as JSON
    Pull(PullCommand),

    /// Submit a change batch from a JSON file
    Push(PushCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.clone())?;

    match cli.command {
        Some(Commands::Login(cmd)) => cmd.run(&config).await?,
        Some(Commands::Register(cmd)) => cmd.run(&config).await?,
        Some(Commands::Verify(cmd)) => cmd.run(&mut config, cli.config).await?,
        Some(Commands::Status(cmd)) => cmd.run(&config).await?,
        Some(Commands::Pull(cmd)) => cmd.run(&config).await?,
        Some(Commands::Push(cmd)) => cmd.run(&config).await?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
