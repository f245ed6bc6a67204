pub mod auth;
pub mod blob;
mod error;
pub mod jobs;
pub mod ledger;

pub use auth::{PgTokenStore, TokenStore};
pub use blob::{BlobStore, Bucket, S3BlobStore};
pub use error::Error;
pub use jobs::{PgStore, Store};
pub use ledger::{Ledger, PgLedger};

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::time::Duration;

/// Connects a Postgres pool the same way the teacher's control-plane does:
/// TLS mode selectable via the connection string, slow statements logged at
/// `warn`, and a bounded pool size so a single misbehaving worker can't
/// starve the rest of the fleet.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    require_ssl: bool,
) -> Result<sqlx::PgPool, Error> {
    let mut options = PgConnectOptions::from_str(database_url).map_err(Error::Sqlx)?;
    if require_ssl {
        options = options.ssl_mode(PgSslMode::Require);
    }
    options = options.log_slow_statements(sqlx::log::LevelFilter::Warn, Duration::from_millis(250));

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;
    Ok(pool)
}
