use k8s_openapi::api::core::v1::Volume;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{DatabaseServerRef, Image};

/// Declares one scheduled backup CronJob against a [`crate::DatabaseServer`]
/// or an externally hosted database (supplement, see §11.1 of the expanded
/// design; the CronJob's pod body is assembled by a manifest-assembly
/// collaborator, not by this core).
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "platform.example.io",
    version = "v1",
    kind = "DatabaseBackup",
    plural = "databasebackups",
    derive = "PartialEq",
    status = "DatabaseBackupStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[serde(rename_all = "camelCase")]
pub struct DatabaseBackupSpec {
    pub image: Image,
    #[serde(default)]
    pub image_pull_policy: Option<String>,
    pub database_server_ref: DatabaseServerRef,
    /// Backup these database names. Empty means all user databases.
    #[serde(default)]
    pub database_names: Vec<String>,
    /// The target volume for `mysqldump` output; its `name` is overridden
    /// with this controller's own convention when mounted (§11.1).
    pub target_volume: Volume,
    pub schedule: String,
}

/// Prefix every derived backup CronJob name carries, ahead of the
/// DatabaseBackup's own name.
pub const PLATFORM_PREFIX: &str = "platform";

impl DatabaseBackupSpec {
    pub fn base_name(instance_name: &str) -> String {
        format!("{PLATFORM_PREFIX}-{instance_name}-db-backup")
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct DatabaseBackupStatus {}
