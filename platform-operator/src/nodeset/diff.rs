//! Pure diff logic for the NodeSet rollout controller (§4.2), kept apart
//! from anything that touches the API server so it can be unit tested
//! directly.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedStatefulSet {
    pub replicas: i32,
    pub image: String,
    pub image_pull_policy: Option<String>,
    pub termination_grace_period_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredStatefulSet {
    pub replicas: i32,
    pub image: String,
    pub image_pull_policy: Option<String>,
    pub termination_grace_period_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatefulSetDiff {
    pub replicas: Option<i32>,
    pub image: Option<String>,
    pub image_pull_policy: Option<Option<String>>,
    pub termination_grace_period_secs: Option<i64>,
}

impl StatefulSetDiff {
    pub fn is_empty(&self) -> bool {
        self == &StatefulSetDiff::default()
    }
}

/// Computes the set of fields that differ between observed and desired
/// state (§4.2 step 2 "Diff & update").
pub fn diff_statefulset(observed: &ObservedStatefulSet, desired: &DesiredStatefulSet) -> StatefulSetDiff {
    let mut diff = StatefulSetDiff::default();
    if observed.replicas != desired.replicas {
        diff.replicas = Some(desired.replicas);
    }
    if observed.image != desired.image {
        diff.image = Some(desired.image.clone());
    }
    if observed.image_pull_policy != desired.image_pull_policy {
        diff.image_pull_policy = Some(desired.image_pull_policy.clone());
    }
    if observed.termination_grace_period_secs != desired.termination_grace_period_secs {
        diff.termination_grace_period_secs = Some(desired.termination_grace_period_secs);
    }
    diff
}

/// Ordinals whose PVCs should be reclaimed after a scale-down from
/// `old_count` to `new_count`, i.e. `[new_count, old_count)` (§4.2 step 3).
/// Empty unless this really is a scale-down.
pub fn pvcs_to_reclaim(old_count: i32, new_count: i32) -> Vec<i32> {
    if new_count >= old_count {
        return Vec::new();
    }
    (new_count..old_count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_observed() -> ObservedStatefulSet {
        ObservedStatefulSet {
            replicas: 3,
            image: "platform:1.0".into(),
            image_pull_policy: Some("IfNotPresent".into()),
            termination_grace_period_secs: 30,
        }
    }

    fn base_desired() -> DesiredStatefulSet {
        DesiredStatefulSet {
            replicas: 3,
            image: "platform:1.0".into(),
            image_pull_policy: Some("IfNotPresent".into()),
            termination_grace_period_secs: 30,
        }
    }

    #[test]
    fn unchanged_spec_produces_empty_diff() {
        assert!(diff_statefulset(&base_observed(), &base_desired()).is_empty());
    }

    #[test]
    fn replica_count_change_is_detected() {
        let mut desired = base_desired();
        desired.replicas = 1;
        let diff = diff_statefulset(&base_observed(), &desired);
        assert_eq!(diff.replicas, Some(1));
        assert_eq!(diff.image, None);
    }

    #[test]
    fn image_and_pull_policy_changes_are_detected_independently() {
        let mut desired = base_desired();
        desired.image = "platform:2.0".into();
        desired.image_pull_policy = Some("Always".into());
        let diff = diff_statefulset(&base_observed(), &desired);
        assert_eq!(diff.image, Some("platform:2.0".into()));
        assert_eq!(diff.image_pull_policy, Some(Some("Always".into())));
        assert_eq!(diff.replicas, None);
    }

    #[test]
    fn scale_down_reclaims_trailing_ordinals() {
        assert_eq!(pvcs_to_reclaim(3, 1), vec![1, 2]);
    }

    #[test]
    fn scale_up_reclaims_nothing() {
        assert_eq!(pvcs_to_reclaim(1, 3), Vec::<i32>::new());
    }

    #[test]
    fn unchanged_count_reclaims_nothing() {
        assert_eq!(pvcs_to_reclaim(2, 2), Vec::<i32>::new());
    }
}
