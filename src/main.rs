//! saas-starter server binary.
//!
//! Loads configuration, connects to PostgreSQL, wires the adapters into the
//! billing handlers and serves the HTTP API until ctrl-c.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use saas_starter::adapters::http::{app_router, AuthState, BillingAppState, HttpOptions};
use saas_starter::adapters::{
    JwtConfig, JwtSessionValidator, PostgresCustomerRepository, PostgresPaymentRepository,
    PostgresSubscriptionRepository, PostgresWebhookEventRepository, StripeConfig,
    StripePaymentAdapter,
};
use saas_starter::application::handlers::{PruneWebhookEventsCommand, PruneWebhookEventsHandler};
use saas_starter::application::{CheckoutUrls, HandleStripeWebhookHandler};
use saas_starter::config::AppConfig;
use saas_starter::domain::webhook::StripeWebhookVerifier;
use saas_starter::ports::WebhookEventRepository;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const RETENTION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        stripe_test_mode = config.payment.is_test_mode(),
        "Starting saas-starter"
    );

    let pool = connect(&config).await?;

    // Persistence
    let payments = Arc::new(PostgresPaymentRepository::new(pool.clone()));
    let subscriptions = Arc::new(PostgresSubscriptionRepository::new(pool.clone()));
    let customers = Arc::new(PostgresCustomerRepository::new(pool.clone()));
    let webhook_events: Arc<dyn WebhookEventRepository> =
        Arc::new(PostgresWebhookEventRepository::new(pool));

    // External services
    let stripe = StripeConfig::new(config.payment.stripe_api_key.clone())
        .with_base_url(config.payment.api_base_url.clone());
    let payment_provider = Arc::new(StripePaymentAdapter::new(stripe));

    let mut jwt = JwtConfig::new(SecretString::new(config.auth.session_secret.clone()));
    if let Some(issuer) = &config.auth.issuer {
        jwt = jwt.with_issuer(issuer.clone());
    }
    if let Some(audience) = &config.auth.audience {
        jwt = jwt.with_audience(audience.clone());
    }
    let auth = AuthState::new(Arc::new(JwtSessionValidator::new(jwt)))
        .with_session_cookie(config.auth.session_cookie.clone());

    let catalog = Arc::new(config.plan_catalog());
    tracing::info!(plans = catalog.plans().len(), "Plan catalog loaded");

    let verifier = StripeWebhookVerifier::new(config.payment.stripe_webhook_secret.clone())
        .with_tolerance(config.payment.webhook_tolerance_secs)
        .with_livemode_required(config.payment.require_livemode);
    let webhook_handler = HandleStripeWebhookHandler::with_repositories(
        verifier,
        webhook_events.clone(),
        payments.clone(),
        subscriptions.clone(),
        customers.clone(),
        catalog.clone(),
    );

    let state = BillingAppState {
        payments,
        subscriptions,
        customers,
        payment_provider,
        catalog,
        checkout_urls: CheckoutUrls::new(config.server.app_url.clone()),
        webhook_handler: Arc::new(webhook_handler),
    };

    spawn_webhook_retention(webhook_events, config.payment.webhook_retention_days);

    let options = HttpOptions {
        cors_origins: config.server.cors_origins_list(),
        request_timeout: config.server.request_timeout(),
    };
    let app = app_router(state, auth, &options);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// JSON output in production, human-readable output elsewhere.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

async fn connect(config: &AppConfig) -> Result<PgPool, BoxError> {
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        "Database connection established"
    );

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    Ok(pool)
}

fn spawn_webhook_retention(events: Arc<dyn WebhookEventRepository>, retention_days: i64) {
    let handler = PruneWebhookEventsHandler::new(events, retention_days);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RETENTION_INTERVAL);
        loop {
            interval.tick().await;
            let cmd = PruneWebhookEventsCommand {
                now: chrono::Utc::now(),
            };
            if let Err(e) = handler.handle(cmd).await {
                tracing::warn!(error = %e, "Webhook event pruning failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
