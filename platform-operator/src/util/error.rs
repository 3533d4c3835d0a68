/// Crate-wide error type. Each variant carries enough context to decide the
/// requeue policy (§7) without re-inspecting the originating failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kubernetes reported error: {source}")]
    Kube {
        #[from]
        source: kube::Error,
    },

    #[error("Invalid user input: {0}")]
    UserInput(String),

    #[error("Json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("Parse duration: {source}")]
    ParseDuration {
        #[from]
        source: parse_duration::parse::Error,
    },

    /// The password Secret referenced by a DatabaseServer/DatabaseBackup is
    /// missing, or lacks the expected key.
    #[error("Secret '{secret}' is missing or has no key '{key}'")]
    SecretNotFound { secret: String, key: String },

    /// SQL connection or execution failure. All variants are retryable
    /// (§7 DatabaseUnreachable / SQLExec).
    #[error("Database error: {source}")]
    Database {
        #[from]
        source: sqlx::Error,
    },

    /// A declared value is outside its valid range (e.g. `minCpu >
    /// maxCpu`). The offending reconcile is reported and skipped, not
    /// retried.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Whether the caller should request a requeue rather than surface the
    /// error as terminal for the current reconcile.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Database { .. } | Error::Kube { .. } | Error::Json { .. }
        )
    }
}
