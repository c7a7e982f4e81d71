use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lectern_backend_api::{build_router, AppState};
use lectern_config::load as load_config;
use lectern_learning::{NewAccount, Role};
use lectern_runtime::{shutdown_signal, telemetry, LecternServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Lectern course back-end (serves HTTP by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and the background maintenance sweep
    Serve,
    /// Run one subscription and session sweep, then exit
    Sweep,
    /// Create a curator, manager or admin account
    CreateStaff {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "curator")]
        role: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let services = LecternServices::initialise(&config)
        .await
        .context("failed to initialise services")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(&config, services).await,
        Commands::Sweep => run_sweep(&services).await,
        Commands::CreateStaff {
            email,
            name,
            role,
            password,
        } => create_staff(&services, email, name, &role, &password).await,
    }
}

async fn run_server(
    config: &lectern_config::AppConfig,
    services: LecternServices,
) -> anyhow::Result<()> {
    info!("starting Lectern back-end");

    let period = config.engine.subscription.sweep_interval_seconds;
    let sweeper = (period > 0).then(|| services.spawn_sweeper(Duration::from_secs(period)));

    let app = build_router(AppState::new(services.authenticator.clone()));

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, sweep_interval_seconds = period, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server error")?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("back-end shut down");
    Ok(())
}

async fn run_sweep(services: &LecternServices) -> anyhow::Result<()> {
    let outcome = services.sweep_once().await?;
    println!(
        "scanned {} subscriptions: {} expired, {} warned; {} sessions purged",
        outcome.subscriptions.scanned,
        outcome.subscriptions.expired,
        outcome.subscriptions.warned,
        outcome.purged_sessions
    );
    Ok(())
}

async fn create_staff(
    services: &LecternServices,
    email: String,
    name: String,
    role: &str,
    password: &str,
) -> anyhow::Result<()> {
    let role: Role = role.parse()?;
    anyhow::ensure!(role != Role::Learner, "learners sign up through the API");

    let account = services
        .authenticator
        .register_with_password(NewAccount { name, email, role }, password)
        .await
        .context("failed to create staff account")?;

    println!("created {} {} ({})", role, account.email, account.public_id);
    Ok(())
}
