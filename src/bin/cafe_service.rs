//! Hosts one backend service over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use cafebot::config::ServiceConfig;
use cafebot::db::{
    self, PgAuthRepository, PgInfoRepository, PgMediaRepository, PgMenuRepository,
    PgPromoRepository,
};
use cafebot::memory::{
    InMemoryAuthRepository, InMemoryInfoRepository, InMemoryMediaRepository,
    InMemoryMenuRepository, InMemoryPromoRepository,
};
use cafebot::rpc::{Dispatcher, ServiceKind};
use cafebot::server;
use cafebot::services::{AuthService, InfoService, MediaService, MenuService, PromoService};
use cafebot::telemetry::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "cafe-service", about = "Hosts one café backend service")]
struct Args {
    /// Service to host: auth, menu, promo, info or media
    service: ServiceKind,

    /// Port to listen on, overrides SERVICE_PORT
    #[arg(long)]
    port: Option<u16>,
}

async fn postgres_dispatcher(kind: ServiceKind, database_url: &str) -> Result<Arc<dyn Dispatcher>> {
    let pool = db::connect(database_url).await?;
    db::init_database_schema(&pool).await?;

    Ok(match kind {
        ServiceKind::Auth => Arc::new(AuthService::new(Arc::new(PgAuthRepository::new(pool)))),
        ServiceKind::Menu => Arc::new(MenuService::new(Arc::new(PgMenuRepository::new(pool)))),
        ServiceKind::Promo => Arc::new(PromoService::new(Arc::new(PgPromoRepository::new(pool)))),
        ServiceKind::Info => Arc::new(InfoService::new(Arc::new(PgInfoRepository::new(pool)))),
        ServiceKind::Media => Arc::new(MediaService::new(Arc::new(PgMediaRepository::new(pool)))),
    })
}

fn in_memory_dispatcher(kind: ServiceKind) -> Arc<dyn Dispatcher> {
    match kind {
        ServiceKind::Auth => {
            Arc::new(AuthService::new(Arc::new(InMemoryAuthRepository::default())))
        }
        ServiceKind::Menu => Arc::new(MenuService::new(Arc::new(
            InMemoryMenuRepository::with_default_categories(),
        ))),
        ServiceKind::Promo => {
            Arc::new(PromoService::new(Arc::new(InMemoryPromoRepository::default())))
        }
        ServiceKind::Info => {
            Arc::new(InfoService::new(Arc::new(InMemoryInfoRepository::default())))
        }
        ServiceKind::Media => {
            Arc::new(MediaService::new(Arc::new(InMemoryMediaRepository::default())))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let mut config = ServiceConfig::from_env(args.service)?;
    if let Some(port) = args.port {
        config.port = port;
    }

    info!(service = %config.kind, port = config.port, "Starting service");

    let dispatcher = match &config.database_url {
        Some(url) => postgres_dispatcher(config.kind, url).await?,
        None => {
            warn!(service = %config.kind, "DATABASE_URL not set, data lives in memory only");
            in_memory_dispatcher(config.kind)
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    server::serve(listener, dispatcher).await
}
