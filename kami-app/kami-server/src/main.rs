// ============================================================================
// Kami Server - Entry Point
// File: kami-app/kami-server/src/main.rs
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use kami_api::{build_router, state::login_limiter, AppState};
use kami_core::mail::Mailer;
use kami_core::repositories::{InMemoryVerificationCodeStore, VerificationCodeStore};
use kami_core::services::{
    ActivationCodeService, AuthService, CardService, ChannelService, MailService, OrderService,
    ProxyService, RegistrationPolicy, SaleService, UserService,
};
use kami_infrastructure::{
    create_pool, create_redis_pool, run_migrations, LogMailer, PgActivationCodeRepository,
    PgCardRepository, PgChannelRepository, PgOrderRepository, PgProxyRepository,
    PgSaleRepository, PgUserRepository, RedisVerificationCodeStore, SmtpMailer,
};
use kami_security::JwtService;
use kami_shared::config::AppConfig;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    let _log_guard = kami_shared::telemetry::init_telemetry(&config.log);

    info!("{} starting in {} mode", config.app.name, config.app.env);

    // Database
    let pool = create_pool(&config.database)
        .await
        .context("failed to connect to database")?;
    if config.database.run_migrations {
        run_migrations(&pool).await.context("failed to run migrations")?;
        info!("Migrations applied");
    }

    let users = Arc::new(PgUserRepository::new(pool.clone()));
    let channels = Arc::new(PgChannelRepository::new(pool.clone()));
    let cards = Arc::new(PgCardRepository::new(pool.clone()));
    let codes = Arc::new(PgActivationCodeRepository::new(pool.clone()));
    let orders = Arc::new(PgOrderRepository::new(pool.clone()));
    let proxies = Arc::new(PgProxyRepository::new(pool.clone()));
    let sales = Arc::new(PgSaleRepository::new(pool));

    // Verification codes
    let code_store: Arc<dyn VerificationCodeStore> = match &config.redis.url {
        Some(url) => {
            let redis = create_redis_pool(url, &config.redis)?;
            info!("Verification codes stored in Redis");
            Arc::new(RedisVerificationCodeStore::new(redis))
        }
        None => {
            warn!("No redis.url configured; verification codes are kept in memory");
            Arc::new(InMemoryVerificationCodeStore::new())
        }
    };

    // Mail
    let mailer: Arc<dyn Mailer> = if config.mail.enabled {
        Arc::new(SmtpMailer::new(&config.mail)?)
    } else {
        warn!("Mail delivery disabled; outgoing mail is only logged");
        Arc::new(LogMailer)
    };
    let mail = Arc::new(MailService::new(mailer)?);

    // Services
    let jwt = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
        config.jwt.refresh_token_expiry,
    ));
    let auth = Arc::new(AuthService::new(
        users.clone(),
        jwt,
        code_store,
        mail.clone(),
        RegistrationPolicy {
            enabled: config.auth.registration_enabled,
            code_ttl: Duration::from_secs(config.auth.verification_code_ttl_secs),
            tolerate_mail_failure: config.is_development(),
        },
    ));

    if config.admin.bootstrap {
        let admin = &config.admin;
        if let Some(created) = auth
            .bootstrap_admin(&admin.username, &admin.email, &admin.password, &admin.name)
            .await?
        {
            info!("Bootstrapped admin account {}", created.username);
        }
    }

    let state = AppState {
        auth,
        users: Arc::new(UserService::new(users.clone(), channels.clone())),
        channels: Arc::new(ChannelService::new(channels.clone())),
        cards: Arc::new(CardService::new(cards.clone(), channels.clone(), codes.clone())),
        codes: Arc::new(ActivationCodeService::new(
            codes.clone(),
            cards.clone(),
            channels.clone(),
            users.clone(),
        )),
        orders: Arc::new(OrderService::new(
            orders.clone(),
            codes.clone(),
            cards.clone(),
            channels,
            users.clone(),
            proxies.clone(),
            mail.clone(),
        )),
        proxies: Arc::new(ProxyService::new(proxies, users, cards.clone(), codes.clone())),
        sales: Arc::new(SaleService::new(sales, cards, codes, orders, mail)),
        login_limiter: login_limiter(config.auth.login_attempts_per_minute),
    };

    let app = build_router(state, &config.app);

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
