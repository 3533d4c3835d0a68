//! The database drain interface (§4.4): resolves connection info for a
//! cluster's application database and exposes the small set of SQL
//! operations the binding manager and autoscaler need. Connections are
//! opened per call and closed on every exit path — nothing here outlives a
//! single reconcile.

mod queries;

pub use queries::{disable_all_jobs, count_active_tasks, read_node_task_state, write_node_task_limit};

use crate::util::Error;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use platform_types::{DatabaseServer, DatabaseServerRef};

/// Key under which the service user's password is stored in the
/// referenced Secret (§6 "Secret layout").
pub const SERVICE_USER_NAME: &str = "platformuser";

/// Resolved, ready-to-dial connection target for one cluster's database.
#[derive(Clone, Debug)]
pub struct DatabaseConnectionInfo {
    pub host: String,
    pub port: i32,
    pub secret_name: String,
}

/// Resolves a `DatabaseServerRef` into a dialable host/port/secret triple.
///
/// If `server_ref` is set, the referenced `DatabaseServer` is read and its
/// headless-service FQDN is used as the host; otherwise the externally
/// supplied `server_address` is used verbatim.
pub async fn resolve_connection_info(
    client: &Client,
    db_ref: &DatabaseServerRef,
    owner_namespace: &str,
) -> Result<DatabaseConnectionInfo, Error> {
    if let Some(server_ref) = &db_ref.server_ref {
        let namespace = server_ref.namespace_or(owner_namespace);
        let api: Api<DatabaseServer> = Api::namespaced(client.clone(), namespace);
        let server = api.get(&server_ref.name).await?;
        Ok(DatabaseConnectionInfo {
            host: service_fqdn(&server_ref.name, namespace),
            port: server.spec.port,
            secret_name: secret_name(&server_ref.name),
        })
    } else if let Some(address) = &db_ref.server_address {
        Ok(DatabaseConnectionInfo {
            host: address.host.clone(),
            port: address.port,
            secret_name: address.secret_name.clone(),
        })
    } else {
        Err(Error::UserInput(
            "DatabaseServerRef has neither serverRef nor serverAddress set".to_owned(),
        ))
    }
}

/// Cluster-internal service name for a managed DatabaseServer.
pub fn service_fqdn(database_server_name: &str, namespace: &str) -> String {
    format!("{database_server_name}.{namespace}.svc.cluster.local")
}

/// Secret name carrying the service user's password for a managed
/// DatabaseServer. The backing Secret is assembled by the manifest
/// collaborator; this naming convention is the contract between them.
pub fn secret_name(database_server_name: &str) -> String {
    format!("{database_server_name}-db-password")
}

/// Opens a connection to `database` on the server described by
/// `connection_info`, reading the service user's password from the Secret
/// named within it. Mirrors the `Open(cluster)` operation of §4.4.
pub async fn open(
    client: &Client,
    connection_info: &DatabaseConnectionInfo,
    secret_namespace: &str,
    database: &str,
) -> Result<sqlx::MySqlPool, Error> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), secret_namespace);
    let secret = secrets.get(&connection_info.secret_name).await?;
    let password = secret
        .data
        .as_ref()
        .and_then(|data| data.get(SERVICE_USER_NAME))
        .map(|bytes| String::from_utf8_lossy(&bytes.0).into_owned())
        .ok_or_else(|| Error::SecretNotFound {
            secret: connection_info.secret_name.clone(),
            key: SERVICE_USER_NAME.to_owned(),
        })?;

    let target = platform_common::mysql::MySqlTarget {
        host: connection_info.host.clone(),
        port: connection_info.port as u16,
        database: database.to_owned(),
        user: SERVICE_USER_NAME.to_owned(),
        password,
    };
    platform_common::mysql::connect(&target)
        .await
        .map_err(|source| Error::Configuration(source.to_string()))
}
