//! Minimal client type for `metrics.k8s.io/v1beta1` `PodMetrics`, which
//! `k8s-openapi` does not carry since it ships from the metrics-server
//! aggregated API rather than the core API server.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct PodMetricsContainer {
    pub name: String,
    pub usage: PodMetricsContainerUsage,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PodMetricsContainerUsage {
    pub cpu: Quantity,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PodMetrics {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub containers: Vec<PodMetricsContainer>,
}

impl k8s_openapi::Resource for PodMetrics {
    const GROUP: &'static str = "metrics.k8s.io";
    const KIND: &'static str = "PodMetrics";
    const VERSION: &'static str = "v1beta1";
    const API_VERSION: &'static str = "metrics.k8s.io/v1beta1";
    const URL_PATH_SEGMENT: &'static str = "pods";

    type Scope = k8s_openapi::NamespaceResourceScope;
}

impl k8s_openapi::Metadata for PodMetrics {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Self::Ty {
        &mut self.metadata
    }
}

/// Parses a CPU [`Quantity`] (e.g. `"143m"`, `"1"`) into millicores.
pub fn cpu_millicores(quantity: &Quantity) -> Option<i64> {
    let raw = &quantity.0;
    if let Some(stripped) = raw.strip_suffix('m') {
        stripped.parse::<i64>().ok()
    } else if let Some(stripped) = raw.strip_suffix('n') {
        stripped.parse::<i64>().ok().map(|n| n / 1_000_000)
    } else {
        let cores: f64 = raw.parse().ok()?;
        Some((cores * 1000.0).round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_millicore_suffix() {
        assert_eq!(cpu_millicores(&Quantity("143m".into())), Some(143));
    }

    #[test]
    fn parses_bare_cores() {
        assert_eq!(cpu_millicores(&Quantity("2".into())), Some(2000));
    }

    #[test]
    fn parses_nanocore_suffix() {
        assert_eq!(cpu_millicores(&Quantity("143000000n".into())), Some(143));
    }
}
