pub mod colors;
pub mod error;
pub mod finalizer;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod patch;

pub use error::Error;
pub use patch::{Object, Status, patch_status};

use sha2::{Digest, Sha256};
use std::time::Duration;

/// Field manager used on every server-side apply / status patch.
pub const MANAGER_NAME: &str = "platform-operator";

/// How often a controller requeues an object it is actively waiting on
/// (drain polling, rollout progress) rather than leaving it to the
/// resync period.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(60);

/// Stable short hash of a serializable spec, stored as an annotation so a
/// reconciler can tell whether a child resource still matches its owner's
/// declared spec without a full field-by-field diff.
pub fn hash_spec<T: serde::Serialize>(spec: &T) -> String {
    let bytes = serde_json::to_vec(spec).expect("spec is serializable");
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)
}
