use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use uuid::Uuid;

use felicity_server::config::Config;
use felicity_server::routes::create_routes;
use felicity_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    seed_admin(&pool, &config)
        .await
        .expect("Failed to seed admin account");

    let addr: SocketAddr = config.bind_addr.parse().expect("Invalid BIND_ADDR");
    let state = AppState::new(pool, config);
    let app: Router = create_routes(state);

    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}

/// Create the admin account on first boot, through the same credential
/// hashing as every other account. Admin login stays disabled until the
/// seed credentials are configured.
async fn seed_admin(pool: &PgPool, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let existing =
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE user_type = 'admin' LIMIT 1")
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Ok(());
    }

    let Some(seed) = &config.admin_seed else {
        tracing::warn!("No admin account exists and ADMIN_PASSWORD is unset; admin login disabled");
        return Ok(());
    };

    let password_hash = bcrypt::hash(&seed.password, bcrypt::DEFAULT_COST)?;
    sqlx::query(
        "INSERT INTO users (username, password_hash, user_type, filled) VALUES ($1, $2, 'admin', TRUE)",
    )
    .bind(&seed.username)
    .bind(&password_hash)
    .execute(pool)
    .await?;

    tracing::info!(username = %seed.username, "Seeded admin account");
    Ok(())
}
