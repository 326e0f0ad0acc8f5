//! Aggregation of step judgments into a ratio and a status.

use super::types::{VerificationStatus, VerificationStep};

/// Minimum ratio (percent) for a verified status.
pub const DEFAULT_VERIFIED_THRESHOLD: f64 = 66.0;

/// Percentage of steps judged verified; 0 when there are no steps.
pub fn verification_ratio(steps: &[VerificationStep]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }
    let verified = steps
        .iter()
        .filter(|s| s.judgment().is_verified())
        .count();
    (verified as f64 / steps.len() as f64 * 100.0).clamp(0.0, 100.0)
}

/// Verified iff `ratio >= threshold` and the answer carried no doubt.
pub fn status_for(ratio: f64, uncertain: bool, threshold: f64) -> VerificationStatus {
    if ratio >= threshold && !uncertain {
        VerificationStatus::Verified
    } else {
        VerificationStatus::Unverified
    }
}
