//! Academy payments service entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use academy_payments::adapters::http::middleware::GatewayAllowList;
use academy_payments::adapters::http::{app_router, HttpLimits, PaymentsAppState, WebhookAppState};
use academy_payments::adapters::{
    InMemoryPaymentStore, PostgresAuditLog, PostgresPaymentLedger, PostgresWebhookEventRepository,
};
use academy_payments::application::ReconcileWebhookHandler;
use academy_payments::config::AppConfig;
use academy_payments::domain::payment::Gateway;
use academy_payments::domain::webhook::SignatureVerifier;
use academy_payments::ports::{AuditLog, PaymentLedger, WebhookEventRepository};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Stores {
    ledger: Arc<dyn PaymentLedger>,
    events: Arc<dyn WebhookEventRepository>,
    audit: Arc<dyn AuditLog>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let stores = connect_stores(&config).await?;

    let mut reconcile = ReconcileWebhookHandler::new(stores.ledger.clone(), stores.events.clone())
        .with_io_timeout(config.payment.lookup_timeout());
    for gateway in [Gateway::Paymob, Gateway::Tap, Gateway::EasyKash] {
        match &config.payment.gateway(gateway).hmac_secret {
            Some(secret) => {
                reconcile = reconcile
                    .with_verifier(gateway, SignatureVerifier::new(gateway, secret.expose_secret()));
            }
            None => warn!(gateway = %gateway, "No webhook secret configured, signatures not checked"),
        }
    }

    let webhooks = WebhookAppState {
        reconcile: Arc::new(reconcile),
        events: stores.events.clone(),
        allow_list: Arc::new(
            GatewayAllowList::new(config.payment.allow_lists()?)
                .with_trusted_proxies(config.payment.trusted_proxies()?),
        ),
    };
    let payments = PaymentsAppState {
        ledger: stores.ledger,
        audit: stores.audit,
    };
    let limits = HttpLimits {
        request_timeout: config.server.request_timeout(),
        max_body_bytes: config.server.max_body_bytes,
    };
    let app = app_router(webhooks, payments, limits);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, environment = ?config.server.environment, "Listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).pretty().init();
    }
}

async fn connect_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    if !config.database.is_configured() {
        warn!("No database configured, using in-memory store");
        let store = Arc::new(InMemoryPaymentStore::new());
        return Ok(Stores {
            ledger: store.clone(),
            events: store.clone(),
            audit: store,
        });
    }

    let db = &config.database;
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .acquire_timeout(db.acquire_timeout())
        .connect(&db.url)
        .await?;

    if db.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Migrations applied");
    }

    Ok(Stores {
        ledger: Arc::new(PostgresPaymentLedger::new(pool.clone())),
        events: Arc::new(PostgresWebhookEventRepository::new(pool.clone())),
        audit: Arc::new(PostgresAuditLog::new(pool)),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
