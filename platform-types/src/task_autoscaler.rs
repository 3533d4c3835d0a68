use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::common::ResourceRef;

/// A feedback-control configuration bound to one [`crate::PlatformCluster`],
/// adjusting one job's per-node task concurrency based on CPU telemetry.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "platform.example.io",
    version = "v1",
    kind = "TaskAutoscaler",
    plural = "taskautoscalers",
    derive = "PartialEq",
    status = "TaskAutoscalerStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[serde(rename_all = "camelCase")]
pub struct TaskAutoscalerSpec {
    pub cluster_ref: ResourceRef,
    pub task_name: String,
    #[serde(default = "default_adjustment_interval_mins")]
    pub adjustment_interval_mins: i64,
    #[serde(default = "default_metrics_sliding_window_mins")]
    pub metrics_sliding_window_mins: i64,
    #[serde(default = "default_min_cpu_percent")]
    pub min_cpu_percent: i64,
    #[serde(default = "default_max_cpu_percent")]
    pub max_cpu_percent: i64,
    #[serde(default = "default_min_task_limit")]
    pub min_task_limit: i64,
    #[serde(default = "default_max_task_limit")]
    pub max_task_limit: i64,
    #[serde(default = "default_step_amount")]
    pub step_amount: i64,
}

fn default_adjustment_interval_mins() -> i64 {
    1
}
fn default_metrics_sliding_window_mins() -> i64 {
    1
}
fn default_min_cpu_percent() -> i64 {
    50
}
fn default_max_cpu_percent() -> i64 {
    90
}
fn default_min_task_limit() -> i64 {
    1
}
fn default_max_task_limit() -> i64 {
    20
}
fn default_step_amount() -> i64 {
    1
}

impl TaskAutoscalerSpec {
    /// Reports a configuration error without panicking; reconciliation of
    /// the offending resource should be skipped (§7 Configuration errors).
    pub fn validate(&self) -> Result<(), String> {
        if self.min_cpu_percent > self.max_cpu_percent {
            return Err(format!(
                "minCpuPercent ({}) must be <= maxCpuPercent ({})",
                self.min_cpu_percent, self.max_cpu_percent
            ));
        }
        if self.min_task_limit > self.max_task_limit {
            return Err(format!(
                "minTaskLimit ({}) must be <= maxTaskLimit ({})",
                self.min_task_limit, self.max_task_limit
            ));
        }
        if self.step_amount < 1 {
            return Err("stepAmount must be >= 1".to_string());
        }
        if self.adjustment_interval_mins < 1 || self.metrics_sliding_window_mins < 1 {
            return Err("time values must be >= 1 minute".to_string());
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct TaskAutoscalerStatus {}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> TaskAutoscalerSpec {
        TaskAutoscalerSpec {
            cluster_ref: ResourceRef {
                name: "dev-cluster".into(),
                namespace: None,
            },
            task_name: "Data Processor".into(),
            adjustment_interval_mins: 1,
            metrics_sliding_window_mins: 1,
            min_cpu_percent: 50,
            max_cpu_percent: 90,
            min_task_limit: 1,
            max_task_limit: 20,
            step_amount: 1,
        }
    }

    #[test]
    fn defaults_validate() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_cpu_band() {
        let mut spec = base();
        spec.min_cpu_percent = 95;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn rejects_inverted_task_limits() {
        let mut spec = base();
        spec.min_task_limit = 25;
        assert!(spec.validate().is_err());
    }
}
