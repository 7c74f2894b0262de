//! Point d'entrée CLI pour wildfire-var

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Calculer les valeurs à risque autour des feux de forêt
#[derive(Parser)]
#[command(name = "wildfire-var")]
#[command(author, version)]
#[command(about = "Compute wildfire values at risk from hosted feature services")]
#[command(long_about = "Queries every configured dataset around each fire, analyses the results per ring (fire, 1, 3 and 5 miles) and writes one attribute row per ring.\n\nTokens are read from VAR_TOKEN_<SCOPE> environment variables.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run(args) => {
            info!(fires = %args.fires.display(), plan = %args.plan.display(), "Values-at-risk run");
            cli::cmd_run(args).await?;
        }
        Commands::Validate { plan } => {
            cli::cmd_validate(&plan)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
