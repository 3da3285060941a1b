use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use upool::pool_manager::pool_mgr;
use upool::udbc_mysql::driver::MysqlDriver;
use upool::{Pool, PoolOptions, args};

#[derive(Deserialize, Debug)]
#[allow(dead_code)]
struct User {
    id: i64,
    name: String,
    email: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let url = std::env::var("DATABASE_URL")?;
    let options = PoolOptions::new(env_or("UPOOL_WORKERS", 50))
        .queue(env_or("UPOOL_QUEUE", 50))
        .timeout(Duration::from_millis(env_or("UPOOL_TIMEOUT_MS", 4000)));
    let rounds: usize = env_or("UPOOL_ROUNDS", 10_000);
    let concurrency: usize = env_or("UPOOL_CONCURRENCY", 600);

    let driver = MysqlDriver::new(url).name("main").build()?;
    let pool = Pool::with_options(driver, options).await?;
    pool_mgr().register("main", pool);

    let start = Instant::now();
    let failures = Arc::new(AtomicUsize::new(0));
    let next = Arc::new(AtomicUsize::new(0));
    let mut tasks = JoinSet::new();
    for _ in 0..concurrency {
        let failures = failures.clone();
        let next = next.clone();
        tasks.spawn(async move {
            let Some(session) = pool_mgr().session("main") else {
                return;
            };
            loop {
                let id = next.fetch_add(1, Ordering::Relaxed);
                if id >= rounds {
                    break;
                }
                let users = session
                    .select::<User>("SELECT id, name, email FROM users LIMIT ?", &args![100i64])
                    .await;
                if let Err(e) = users {
                    warn!(id, error = %e, "select");
                    failures.fetch_add(1, Ordering::Relaxed);
                }
                let result = session
                    .must_exec(
                        "INSERT INTO users (email, name) VALUES (?, ?)",
                        &args![format!("email-{}", id), format!("stress-{}", id)],
                    )
                    .await;
                if let Some(e) = result.err() {
                    warn!(id, error = %e, "insert");
                    failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    }
    while tasks.join_next().await.is_some() {}

    pool_mgr().close_all().await?;
    info!(
        rounds,
        failures = failures.load(Ordering::Relaxed),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "done"
    );
    Ok(())
}
