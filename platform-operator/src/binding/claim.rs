//! Pure claim-protocol logic (§4.1), kept free of any Kubernetes API calls
//! so it can be exercised directly by unit tests.

use platform_types::ClusterRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// `clusterRef` was empty; the claimant should write this value.
    ShouldClaim(ClusterRef),
    /// `clusterRef` already names the claimant; no write needed.
    AlreadyClaimed,
    /// `clusterRef` names a different cluster; non-retryable for this reconcile.
    Conflict { holder: ClusterRef },
}

pub fn evaluate_claim(
    current: &Option<ClusterRef>,
    claimant_namespace: &str,
    claimant_name: &str,
) -> ClaimOutcome {
    match current {
        None => ClaimOutcome::ShouldClaim(ClusterRef {
            name: claimant_name.to_owned(),
            namespace: claimant_namespace.to_owned(),
        }),
        Some(holder)
            if holder.name == claimant_name && holder.namespace == claimant_namespace =>
        {
            ClaimOutcome::AlreadyClaimed
        }
        Some(holder) => ClaimOutcome::Conflict {
            holder: holder.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unclaimed_database_should_be_claimed() {
        let outcome = evaluate_claim(&None, "ns", "cluster-a");
        assert_eq!(
            outcome,
            ClaimOutcome::ShouldClaim(ClusterRef {
                name: "cluster-a".into(),
                namespace: "ns".into(),
            })
        );
    }

    #[test]
    fn reclaiming_by_the_same_cluster_is_idempotent() {
        let current = Some(ClusterRef {
            name: "cluster-a".into(),
            namespace: "ns".into(),
        });
        assert_eq!(
            evaluate_claim(&current, "ns", "cluster-a"),
            ClaimOutcome::AlreadyClaimed
        );
    }

    #[test]
    fn claim_by_a_different_cluster_conflicts() {
        let current = Some(ClusterRef {
            name: "cluster-a".into(),
            namespace: "ns".into(),
        });
        let outcome = evaluate_claim(&current, "ns", "cluster-b");
        assert_eq!(
            outcome,
            ClaimOutcome::Conflict {
                holder: ClusterRef {
                    name: "cluster-a".into(),
                    namespace: "ns".into(),
                }
            }
        );
    }

    #[test]
    fn claim_by_the_same_name_in_a_different_namespace_conflicts() {
        let current = Some(ClusterRef {
            name: "cluster-a".into(),
            namespace: "ns1".into(),
        });
        assert_eq!(
            evaluate_claim(&current, "ns2", "cluster-a"),
            ClaimOutcome::Conflict {
                holder: ClusterRef {
                    name: "cluster-a".into(),
                    namespace: "ns1".into(),
                }
            }
        );
    }
}
