use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod commands;

#[derive(Parser)]
#[command(name = "launchloop", version, about = "LaunchLoop closed-test coordinator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Choose a role and remember its dashboard
    Role {
        #[arg(value_enum)]
        role: commands::role::Role,
    },
    /// Show which screen the app would open
    Start {
        /// Join link the app was opened with
        #[arg(long)]
        link: Option<String>,
    },
    /// Creator dashboard: manage campaigns
    Creator {
        #[command(subcommand)]
        action: commands::creator::CreatorAction,
    },
    /// Join a campaign by id or join link
    Onboard {
        /// Campaign id or https://<host>/applaunchloop/join/<id>
        target: String,
        /// Confirm every step without prompting
        #[arg(long)]
        yes: bool,
    },
    /// Tester dashboard: streak status and daily check-in
    Tester {
        #[command(subcommand)]
        action: commands::tester::TesterAction,
    },
    /// Background daily reminder
    Worker {
        #[command(subcommand)]
        action: commands::worker::WorkerAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Role { role } => commands::role::run(role).await,
        Commands::Start { link } => commands::start::run(link).await,
        Commands::Creator { action } => commands::creator::run(action).await,
        Commands::Onboard { target, yes } => commands::onboard::run(&target, yes).await,
        Commands::Tester { action } => commands::tester::run(action).await,
        Commands::Worker { action } => commands::worker::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "launchloop", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
