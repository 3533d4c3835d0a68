//! Per-pod CPU sample retention and sliding-window averaging for the task
//! autoscaler (§4.3). Kept free of any Kubernetes or SQL dependency so it
//! can be unit tested directly; the reconciler owns one instance behind a
//! mutex.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Samples older than this are dropped on every write, regardless of
/// whether they are still inside anyone's sliding window.
pub const RETENTION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy)]
struct Sample {
    at: Instant,
    cpu_millicores: i64,
}

#[derive(Debug, Default)]
struct PodState {
    samples: VecDeque<Sample>,
    last_scaled_at: Option<Instant>,
}

/// Tracks CPU samples and scaling cooldowns for every pod currently seen
/// by one TaskAutoscaler reconciler. Keyed by an opaque pod identity
/// (namespace/name is sufficient and is what callers should pass).
#[derive(Debug, Default)]
pub struct MetricStore {
    pods: HashMap<String, PodState>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new sample and prunes anything older than [`RETENTION`].
    pub fn record_sample(&mut self, pod_key: &str, now: Instant, cpu_millicores: i64) {
        let state = self.pods.entry(pod_key.to_owned()).or_default();
        state.samples.push_back(Sample { at: now, cpu_millicores });
        prune(&mut state.samples, now);
    }

    /// Drops all retained state for a pod that no longer exists.
    pub fn purge(&mut self, pod_key: &str) {
        self.pods.remove(pod_key);
    }

    /// Arithmetic mean of samples within `window` of `now`, or `None` if
    /// there are no in-window samples.
    pub fn sliding_window_mean(&self, pod_key: &str, now: Instant, window: Duration) -> Option<i64> {
        let state = self.pods.get(pod_key)?;
        let cutoff = now.checked_sub(window).unwrap_or(now);
        let (sum, count) = state
            .samples
            .iter()
            .filter(|s| s.at >= cutoff)
            .fold((0i64, 0i64), |(sum, count), s| (sum + s.cpu_millicores, count + 1));
        if count == 0 {
            return None;
        }
        Some(sum / count)
    }

    /// `true` if this is the first time this pod has been seen (no
    /// `lastScaledAt` yet), in which case the clock is started but no
    /// adjustment should run this pass (§4.3 step 1c).
    pub fn start_cooldown_if_new(&mut self, pod_key: &str, now: Instant) -> bool {
        let state = self.pods.entry(pod_key.to_owned()).or_default();
        if state.last_scaled_at.is_none() {
            state.last_scaled_at = Some(now);
            true
        } else {
            false
        }
    }

    /// Whether `now` is at least `interval` past this pod's last
    /// adjustment.
    pub fn due_for_adjustment(&self, pod_key: &str, now: Instant, interval: Duration) -> bool {
        match self.pods.get(pod_key).and_then(|s| s.last_scaled_at) {
            Some(last) => now.duration_since(last) >= interval,
            None => false,
        }
    }

    /// Records that an adjustment pass ran for this pod, resetting its
    /// cooldown clock regardless of whether the limit actually changed.
    pub fn mark_scaled(&mut self, pod_key: &str, now: Instant) {
        self.pods.entry(pod_key.to_owned()).or_default().last_scaled_at = Some(now);
    }
}

fn prune(samples: &mut VecDeque<Sample>, now: Instant) {
    let cutoff = now.checked_sub(RETENTION).unwrap_or(now);
    while let Some(front) = samples.front() {
        if front.at < cutoff {
            samples.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_in_window_samples() {
        let now = Instant::now();
        let mut store = MetricStore::new();
        store.record_sample("p1", now - Duration::from_secs(30), 100);
        store.record_sample("p1", now - Duration::from_secs(10), 200);
        assert_eq!(store.sliding_window_mean("p1", now, Duration::from_secs(60)), Some(150));
    }

    #[test]
    fn samples_outside_window_are_excluded() {
        let now = Instant::now();
        let mut store = MetricStore::new();
        store.record_sample("p1", now - Duration::from_secs(600), 999);
        store.record_sample("p1", now - Duration::from_secs(5), 100);
        assert_eq!(store.sliding_window_mean("p1", now, Duration::from_secs(60)), Some(100));
    }

    #[test]
    fn no_samples_means_none() {
        let store = MetricStore::new();
        assert_eq!(store.sliding_window_mean("p1", Instant::now(), Duration::from_secs(60)), None);
    }

    #[test]
    fn samples_older_than_retention_are_pruned_on_write() {
        let now = Instant::now();
        let mut store = MetricStore::new();
        store.record_sample("p1", now - Duration::from_secs(61 * 60), 999);
        store.record_sample("p1", now, 100);
        assert_eq!(
            store.sliding_window_mean("p1", now, Duration::from_secs(61 * 60)),
            Some(100)
        );
    }

    #[test]
    fn first_sighting_starts_cooldown_without_signalling_due() {
        let now = Instant::now();
        let mut store = MetricStore::new();
        assert!(store.start_cooldown_if_new("p1", now));
        assert!(!store.start_cooldown_if_new("p1", now + Duration::from_secs(1)));
    }

    #[test]
    fn due_for_adjustment_respects_interval() {
        let now = Instant::now();
        let mut store = MetricStore::new();
        store.start_cooldown_if_new("p1", now);
        assert!(!store.due_for_adjustment("p1", now + Duration::from_secs(30), Duration::from_secs(60)));
        assert!(store.due_for_adjustment("p1", now + Duration::from_secs(61), Duration::from_secs(60)));
    }

    #[test]
    fn purge_clears_all_state() {
        let now = Instant::now();
        let mut store = MetricStore::new();
        store.record_sample("p1", now, 100);
        store.purge("p1");
        assert_eq!(store.sliding_window_mean("p1", now, Duration::from_secs(60)), None);
    }
}
