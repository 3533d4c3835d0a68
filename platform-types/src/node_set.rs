use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::{ProbeTimings, ResourceRequirements};

/// Selects whether a NodeSet's pods process tasks, serve UI traffic, or both.
///
/// `None` (the field omitted entirely) means "dual": the shard both processes
/// tasks and serves traffic. This is preserved intentionally — see the role
/// "dual" design note.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
pub enum NodeRole {
    Processing,
    Frontend,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeSet {
    pub name: String,
    #[serde(default = "default_count")]
    pub count: i32,
    #[serde(default)]
    pub role: Option<NodeRole>,
    #[serde(default)]
    pub resources: ResourceRequirements,
    /// Percentage of the memory limit assigned to the JVM heap, e.g. "50".
    #[serde(default)]
    pub java_opts: Option<String>,
    #[serde(default)]
    pub startup_probe_timings: ProbeTimings,
    #[serde(default)]
    pub liveness_probe_timings: ProbeTimings,
    #[serde(default)]
    pub ingress_enabled: bool,
}

fn default_count() -> i32 {
    1
}

impl NodeSet {
    /// Whether this shard participates in the task autoscaler. A NodeSet
    /// with no declared role is "dual" and is NOT excluded, matching the
    /// role "dual" design note: only Frontend-only shards are skipped.
    pub fn runs_tasks(&self) -> bool {
        !matches!(self.role, Some(NodeRole::Frontend))
    }

    /// Pod-name / platform-node-name for a given ordinal. Every SQL
    /// statement against the application database keys off this value, so
    /// it is centralized here rather than re-derived at each call site.
    pub fn pod_name(cluster_basename: &str, nodeset_name: &str, ordinal: i32) -> String {
        format!("{cluster_basename}-node-{nodeset_name}-{ordinal}")
    }

    pub fn statefulset_name(cluster_basename: &str, nodeset_name: &str) -> String {
        format!("{cluster_basename}-node-{nodeset_name}")
    }

    pub fn pvc_name(pvc_base: &str, statefulset_name: &str, ordinal: i32) -> String {
        format!("{pvc_base}-{statefulset_name}-{ordinal}")
    }

    /// Declared CPU limit in millicores, parsed from the resource
    /// requirements' `limits.cpu` quantity (e.g. "2" => 2000, "500m" => 500).
    /// Returns `None` if unset or unparsable — the autoscaler must then skip
    /// that pod, since it cannot compute a CPU percentage without a
    /// denominator.
    pub fn cpu_limit_millicores(&self) -> Option<i64> {
        let raw = self.resources.limits.get("cpu")?;
        parse_cpu_millicores(raw)
    }
}

fn parse_cpu_millicores(raw: &str) -> Option<i64> {
    if let Some(stripped) = raw.strip_suffix('m') {
        stripped.parse::<i64>().ok()
    } else {
        let cores: f64 = raw.parse().ok()?;
        Some((cores * 1000.0).round() as i64)
    }
}

/// Quantity re-export for schema generation in collaborator-facing specs.
pub type ResourceQuantity = Quantity;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dual_role_runs_tasks() {
        let ns = NodeSet {
            name: "data".into(),
            count: 1,
            role: None,
            resources: Default::default(),
            java_opts: None,
            startup_probe_timings: Default::default(),
            liveness_probe_timings: Default::default(),
            ingress_enabled: false,
        };
        assert!(ns.runs_tasks());
    }

    #[test]
    fn frontend_role_excluded_from_tasks() {
        let ns = NodeSet {
            role: Some(NodeRole::Frontend),
            ..NodeSet {
                name: "ui".into(),
                count: 1,
                role: None,
                resources: Default::default(),
                java_opts: None,
                startup_probe_timings: Default::default(),
                liveness_probe_timings: Default::default(),
                ingress_enabled: false,
            }
        };
        assert!(!ns.runs_tasks());
    }

    #[test]
    fn processing_role_runs_tasks() {
        let ns = NodeSet {
            role: Some(NodeRole::Processing),
            ..NodeSet {
                name: "proc".into(),
                count: 1,
                role: None,
                resources: Default::default(),
                java_opts: None,
                startup_probe_timings: Default::default(),
                liveness_probe_timings: Default::default(),
                ingress_enabled: false,
            }
        };
        assert!(ns.runs_tasks());
    }

    #[test]
    fn pod_name_follows_convention() {
        assert_eq!(NodeSet::pod_name("platform-prod", "data", 2), "platform-prod-node-data-2");
    }

    #[test]
    fn cpu_limit_parses_cores_and_millicores() {
        let mut ns = NodeSet {
            name: "data".into(),
            count: 1,
            role: None,
            resources: Default::default(),
            java_opts: None,
            startup_probe_timings: Default::default(),
            liveness_probe_timings: Default::default(),
            ingress_enabled: false,
        };
        ns.resources.limits.insert("cpu".into(), "2".into());
        assert_eq!(ns.cpu_limit_millicores(), Some(2000));

        ns.resources.limits.insert("cpu".into(), "750m".into());
        assert_eq!(ns.cpu_limit_millicores(), Some(750));
    }

    #[test]
    fn cpu_limit_missing_is_none() {
        let ns = NodeSet {
            name: "data".into(),
            count: 1,
            role: None,
            resources: Default::default(),
            java_opts: None,
            startup_probe_timings: Default::default(),
            liveness_probe_timings: Default::default(),
            ingress_enabled: false,
        };
        assert_eq!(ns.cpu_limit_millicores(), None);
    }
}
