//! Creates the initial administrator, or resets its password and role if the account exists.
//!
//! Reads `DATABASE_URL`, `ADMIN_USERNAME` (default `admin`) and `ADMIN_PASSWORD` (required).

use newsdesk::{auth, models::Role};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed_admin=info,newsdesk=info".into()),
        )
        .init();

    let db_url = std::env::var("DATABASE_URL").expect("FATAL: DATABASE_URL must be set");
    let username = std::env::var("ADMIN_USERNAME")
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "admin".to_string());
    let password = std::env::var("ADMIN_PASSWORD")
        .ok()
        .filter(|password| !password.is_empty())
        .expect("FATAL: ADMIN_PASSWORD must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to apply database migrations.");

    let password_hash = auth::hash_password(&password).expect("FATAL: Failed to hash password");

    let id: i64 = sqlx::query_scalar(
        r#"INSERT INTO users (username, password_hash, role)
           VALUES ($1, $2, $3)
           ON CONFLICT (username)
           DO UPDATE SET password_hash = EXCLUDED.password_hash, role = EXCLUDED.role
           RETURNING id"#,
    )
    .bind(&username)
    .bind(&password_hash)
    .bind(Role::Admin.as_str())
    .fetch_one(&pool)
    .await
    .expect("FATAL: Failed to upsert the admin user");

    tracing::info!(user_id = id, username = %username, "admin account ready");
}
