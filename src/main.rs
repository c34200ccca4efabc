// src/main.rs

use std::net::SocketAddr;
use std::str::FromStr;

use dotenvy::dotenv;
use quiz_backend::config::Config;
use quiz_backend::routes;
use quiz_backend::state::AppState;
use quiz_backend::utils::hash::hash_password;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool
    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("Invalid DATABASE_URL")
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // Seed Admin User
    if let Err(e) = seed_admin_user(&pool, &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    // Create AppState
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}

async fn seed_admin_user(
    pool: &SqlitePool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        let user_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(pool)
            .await?;

        if user_exists == 0 {
            tracing::info!("Seeding admin user: {}", username);
            let hashed_password = hash_password(password)?;
            let email = format!("{}@quiz.local", username);

            sqlx::query(
                "INSERT INTO users (username, email, password, role) VALUES (?, ?, ?, 'admin')",
            )
            .bind(username)
            .bind(email)
            .bind(hashed_password)
            .execute(pool)
            .await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}
