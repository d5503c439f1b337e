//! The fit-for-planting evaluation rule
//!
//! A pure, total function from one sensor sample to a [`Verdict`]. The gas
//! sensor reads HIGH for clean air, so the check is a strict `>` against the
//! configured threshold; soil must match the configured good moisture code
//! (dry by default). The moisture sentinel `-1` simply compares unequal to
//! the good code.

use crate::config::RuleConfig;
use crate::types::{FitReason, Verdict};

/// Evaluate one sample against the planting rule
///
/// Fit-for-planting holds iff `gas > threshold` and `moisture == good`.
/// When not fit, the verdict carries one reason per failing sub-condition,
/// gas first, then moisture.
pub fn evaluate(gas: i32, moisture: i32, config: &RuleConfig) -> Verdict {
    let mut reasons = Vec::new();

    if gas <= config.gas_threshold {
        reasons.push(FitReason::GasAtOrBelowThreshold);
    }
    if moisture != config.good_moisture {
        reasons.push(FitReason::MoistureNotSuitable);
    }

    Verdict {
        fit: reasons.is_empty(),
        reasons,
    }
}
