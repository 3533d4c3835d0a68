use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A reference to another namespaced custom resource.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct ResourceRef {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl ResourceRef {
    pub fn namespace_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(fallback)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct Image {
    pub repository: String,
    #[serde(default)]
    pub tag: Option<String>,
}

impl Image {
    /// Image tag with the empty-tag-means-latest convention applied.
    pub fn tag_or_latest(&self) -> &str {
        match self.tag.as_deref() {
            Some(tag) if !tag.is_empty() => tag,
            _ => "latest",
        }
    }

    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag_or_latest())
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub struct ProbeTimings {
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_seconds: i32,
    #[serde(default = "default_period_secs")]
    pub period_seconds: i32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: i32,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: i32,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: i32,
}

fn default_initial_delay_secs() -> i32 {
    5
}
fn default_period_secs() -> i32 {
    5
}
fn default_timeout_secs() -> i32 {
    5
}
fn default_success_threshold() -> i32 {
    1
}
fn default_failure_threshold() -> i32 {
    10
}

impl Default for ProbeTimings {
    fn default() -> Self {
        Self {
            initial_delay_seconds: default_initial_delay_secs(),
            period_seconds: default_period_secs(),
            timeout_seconds: default_timeout_secs(),
            success_threshold: default_success_threshold(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

/// Either a reference to a managed [`crate::DatabaseServer`] or the connection
/// details of an externally hosted MySQL-compatible database.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseServerRef {
    /// Reference to a managed DatabaseServer in the same (or named) namespace.
    #[serde(default)]
    pub server_ref: Option<ResourceRef>,
    /// Connection details of an externally hosted database. Mutually exclusive
    /// with `server_ref`; `server_ref` takes precedence if both are set.
    #[serde(default)]
    pub server_address: Option<ServerAddress>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerAddress {
    pub host: String,
    #[serde(default = "default_database_port")]
    pub port: i32,
    pub secret_name: String,
}

pub fn default_database_port() -> i32 {
    3306
}

/// Volume retention policy applied when a NodeSet scales down or the
/// owning cluster is deleted.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum VolumeClaimDeletePolicy {
    DeleteOnScaledownAndClusterDeletion,
    DeleteOnScaledownOnly,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressSettings {
    pub host_name: String,
    #[serde(default)]
    pub secret_name: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
}

/// Kubernetes-native resource requests/limits, kept as opaque quantity
/// strings since the core never needs to parse these beyond the CPU limit
/// used by the autoscaler (see [`crate::NodeSet::cpu_limit_millicores`]).
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct ResourceRequirements {
    #[serde(default)]
    pub requests: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub limits: std::collections::BTreeMap<String, String>,
}

