use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lectern_auth::Authenticator;
use lectern_config::AppConfig;
use lectern_database::{
    initialize_database, SqliteAccountRepository, SqlitePool, SqliteSessionRepository,
};
use lectern_learning::{LearnerService, SweepReport};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::DEBUG)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// What one maintenance pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub subscriptions: SweepReport,
    pub purged_sessions: u64,
}

#[derive(Clone)]
pub struct LecternServices {
    pub db_pool: SqlitePool,
    pub learners: Arc<LearnerService<SqliteAccountRepository>>,
    pub authenticator: Arc<Authenticator<SqliteAccountRepository, SqliteSessionRepository>>,
    sessions: SqliteSessionRepository,
}

impl LecternServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        config
            .engine
            .validate()
            .context("invalid engine configuration")?;

        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let learners = Arc::new(LearnerService::with_system_clock(
            SqliteAccountRepository::new(db_pool.clone()),
            &config.engine,
        ));
        let sessions = SqliteSessionRepository::new(db_pool.clone());
        let authenticator = Arc::new(Authenticator::new(
            learners.clone(),
            sessions.clone(),
            &config.auth,
        ));

        info!(
            total_modules = config.engine.progression.total_modules,
            pass_score = config.engine.progression.pass_score,
            "learning engine ready"
        );

        Ok(Self {
            db_pool,
            learners,
            authenticator,
            sessions,
        })
    }

    /// Expire lapsed subscriptions, warn the ones about to lapse and drop
    /// dead sessions.
    pub async fn sweep_once(&self) -> Result<SweepOutcome> {
        let subscriptions = self
            .learners
            .sweep_subscriptions()
            .await
            .context("subscription sweep failed")?;
        let purged_sessions = self
            .sessions
            .purge_expired(self.learners.now())
            .await
            .context("session purge failed")?;

        Ok(SweepOutcome {
            subscriptions,
            purged_sessions,
        })
    }

    /// Run `sweep_once` every `period` until the handle is aborted. Failed
    /// passes are logged and retried on the next tick.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let services = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match services.sweep_once().await {
                    Ok(outcome) => info!(
                        expired = outcome.subscriptions.expired,
                        warned = outcome.subscriptions.warned,
                        purged_sessions = outcome.purged_sessions,
                        "maintenance sweep finished"
                    ),
                    Err(error) => warn!(error = ?error, "maintenance sweep failed"),
                }
            }
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
