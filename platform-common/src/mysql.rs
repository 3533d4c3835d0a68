use anyhow::{Context, Result};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;

/// Connection details resolved by a caller from a DatabaseServer or an
/// external address (see the drain interface's `Open` operation).
#[derive(Clone, Debug)]
pub struct MySqlTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl MySqlTarget {
    /// The exact `user:password@tcp(host:port)/database` DSN shape the
    /// reference implementation constructs, kept for log redaction and
    /// debugging even though sqlx itself connects via `MySqlConnectOptions`.
    pub fn dsn_redacted(&self) -> String {
        format!(
            "{}:****@tcp({}:{})/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

/// Opens a connection pool scoped to a single reconcile pass. Callers are
/// expected to drop the returned pool (closing all connections) once the
/// reconcile's SQL work is done — connections are never held across an
/// API-server call (see the concurrency model's suspension-point rule).
pub async fn connect(target: &MySqlTarget) -> Result<MySqlPool> {
    let options = MySqlConnectOptions::new()
        .host(&target.host)
        .port(target.port)
        .database(&target.database)
        .username(&target.user)
        .password(&target.password);

    MySqlPoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("connecting to {}", target.dsn_redacted()))
}
