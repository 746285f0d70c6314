use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use saas_auth::configuration::{get_configuration, AuthConfig, Settings, StorageBackend};
use saas_auth::startup::run;
use saas_auth::state::AppState;
use saas_auth::store::{InMemoryKvStore, InMemoryUserStore, KvStore, PgKvStore, PgUserStore};
use saas_auth::telemetry::init_telemetry;

const PURGE_INTERVAL: Duration = Duration::from_secs(600);

fn fatal(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

/// Periodically drop expired refresh-token records, whatever the backend
fn spawn_purge_task(sessions: Arc<dyn KvStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Purged expired refresh tokens"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired refresh tokens"),
            }
        }
    });
}

async fn build_state(configuration: &Settings, auth: AuthConfig) -> std::io::Result<AppState> {
    match configuration.application.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; accounts and sessions are lost on restart");
            Ok(AppState::new(
                auth,
                Arc::new(InMemoryUserStore::new()),
                Arc::new(InMemoryKvStore::new()),
            ))
        }
        StorageBackend::Postgres => {
            let database = configuration.database.as_ref().ok_or_else(|| {
                tracing::error!("Postgres storage selected but no database settings were given");
                fatal(std::io::ErrorKind::InvalidInput, "Configuration error")
            })?;

            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    fatal(std::io::ErrorKind::ConnectionRefused, "Database connection error")
                })?;

            sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                fatal(std::io::ErrorKind::Other, "Migration error")
            })?;
            tracing::info!("Database connection pool created successfully");

            Ok(AppState::new(
                auth,
                Arc::new(PgUserStore::new(pool.clone())),
                Arc::new(PgKvStore::new(pool)),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // 구조화된 로깅 초기화
    init_telemetry("info");

    tracing::info!("Starting application");

    // 설정 로드
    let configuration = get_configuration().map_err(|e| {
        tracing::error!("Failed to read configuration: {}", e);
        fatal(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let auth = AuthConfig::try_from(&configuration.auth).map_err(|e| {
        tracing::error!("Invalid auth configuration: {}", e);
        fatal(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    // 저장소 선택 및 만료 토큰 정리 작업 시작
    let state = build_state(&configuration, auth).await?;
    spawn_purge_task(state.sessions.clone());

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    if configuration.application.seed_users {
        tracing::warn!("POST /seed is enabled; do not expose this in production");
    }

    run(listener, state, configuration.application.seed_users)?.await
}
