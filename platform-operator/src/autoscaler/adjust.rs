//! Pure adjustment math for the task autoscaler (§4.3 "Adjustment step"),
//! reproducing the original controller's saturation-gated scale-up and
//! step-clamped scale-down with strict-boundary hysteresis.

use platform_types::TaskAutoscalerSpec;

/// `floor(avg / limit * 100)`, matching the original integer-division
/// truncation.
pub fn cpu_percent(avg_cpu_millicores: i64, limit_millicores: i64) -> i64 {
    (avg_cpu_millicores * 100) / limit_millicores
}

pub fn in_band(cpu_percent: i64, cfg: &TaskAutoscalerSpec) -> bool {
    cpu_percent >= cfg.min_cpu_percent && cpu_percent <= cfg.max_cpu_percent
}

/// Computes the new per-node task limit. Returns `current_limit` unchanged
/// when no boundary is crossed, or when the crossed boundary's scaling
/// direction is disallowed by the saturation gate (scale-up) or the
/// configured floor (scale-down).
pub fn new_task_limit(cpu_percent: i64, current_limit: i64, active_tasks: i64, cfg: &TaskAutoscalerSpec) -> i64 {
    if cpu_percent < cfg.min_cpu_percent && current_limit < cfg.max_task_limit && active_tasks >= current_limit {
        (current_limit + cfg.step_amount).min(cfg.max_task_limit)
    } else if cpu_percent > cfg.max_cpu_percent && current_limit > cfg.min_task_limit {
        (current_limit - cfg.step_amount).max(cfg.min_task_limit)
    } else {
        current_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_types::ResourceRef;

    fn cfg() -> TaskAutoscalerSpec {
        TaskAutoscalerSpec {
            cluster_ref: ResourceRef { name: "c".into(), namespace: None },
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
    fn cpu_percent_truncates() {
        assert_eq!(cpu_percent(749, 1000), 74);
        assert_eq!(cpu_percent(750, 1000), 75);
    }

    #[test]
    fn in_band_is_inclusive_on_both_ends() {
        let cfg = cfg();
        assert!(in_band(50, &cfg));
        assert!(in_band(90, &cfg));
        assert!(!in_band(49, &cfg));
        assert!(!in_band(91, &cfg));
    }

    #[test]
    fn scales_up_when_saturated_and_under_band() {
        let cfg = cfg();
        assert_eq!(new_task_limit(30, 5, 5, &cfg), 6);
    }

    #[test]
    fn does_not_scale_up_idle_node_even_if_under_band() {
        let cfg = cfg();
        // activeTasks < currentLimit: node has spare capacity, not saturated.
        assert_eq!(new_task_limit(30, 5, 2, &cfg), 5);
    }

    #[test]
    fn scale_up_is_clamped_at_max_task_limit() {
        let cfg = cfg();
        assert_eq!(new_task_limit(10, 20, 20, &cfg), 20);
    }

    #[test]
    fn scales_down_when_over_band() {
        let cfg = cfg();
        assert_eq!(new_task_limit(95, 5, 0, &cfg), 4);
    }

    #[test]
    fn scale_down_is_clamped_at_min_task_limit() {
        let cfg = cfg();
        assert_eq!(new_task_limit(95, 1, 0, &cfg), 1);
    }

    #[test]
    fn in_band_cpu_makes_no_change() {
        let cfg = cfg();
        assert_eq!(new_task_limit(70, 5, 5, &cfg), 5);
    }
}
