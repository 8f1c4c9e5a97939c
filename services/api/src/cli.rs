use crate::demo::{run_demo, run_model, run_quote, DemoArgs, QuoteArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use prop_trust::config::AppConfig;
use prop_trust::error::AppError;
use prop_trust::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "Prop Trust Index",
    about = "Serve and inspect the Prop Trust Index scoring engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the score model: pillars, categories, weights and slabs
    Model,
    /// Price a single approved complaint without touching any record
    Quote(QuoteArgs),
    /// Run an in-memory demo approving complaints against seeded firms
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the in-memory stores with the demo firms
    #[arg(long)]
    pub(crate) seed_demo: bool,
}

/// Load configuration and install the log subscriber shared by every command.
fn bootstrap() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));
    let config = bootstrap()?;

    match command {
        Command::Serve(args) => server::run(config, args).await,
        Command::Model => run_model(&config),
        Command::Quote(args) => run_quote(&config, args),
        Command::Demo(args) => run_demo(&config, args),
    }
}
