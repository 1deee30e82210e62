use serde::{Deserialize, Serialize};

use crate::rival::Frequencies;

pub const SUM_TOLERANCE: f64 = 1e-3;

/// Which corrections fired while turning a raw triple into a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidationTrace {
    pub input_sum: f64,
    pub clamped: Vec<String>,
    pub normalised: bool,
    pub min_raise_enforced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationTrace {
    pub fn adjusted(&self) -> bool {
        !self.clamped.is_empty() || self.normalised || self.min_raise_enforced || self.reason.is_some()
    }
}

/// Clamps to [0, 1], normalises to a unit sum, then lifts raise to
/// `min_raise` by draining fold and call in proportion to their size.
pub fn validate(raw: Frequencies, min_raise: f64, neutral: Frequencies) -> (Frequencies, ValidationTrace) {
    let mut trace = ValidationTrace {
        input_sum: raw.sum(),
        ..ValidationTrace::default()
    };

    let mut clamp = |name: &str, value: f64| -> f64 {
        if !value.is_finite() {
            trace.clamped.push(format!("{name} not finite"));
            return 0.0;
        }
        let clamped = value.clamp(0.0, 1.0);
        if clamped != value {
            trace.clamped.push(format!("{name} {value:.3} -> {clamped:.3}"));
        }
        clamped
    };
    let mut freq = Frequencies {
        fold: clamp("fold", raw.fold),
        call: clamp("call", raw.call),
        raise: clamp("raise", raw.raise),
    };

    let sum = freq.sum();
    if sum <= f64::EPSILON {
        trace.reason = Some("all frequencies collapsed to zero".to_string());
        freq = neutral;
    } else if (sum - 1.0).abs() > f64::EPSILON {
        freq = Frequencies {
            fold: freq.fold / sum,
            call: freq.call / sum,
            raise: freq.raise / sum,
        };
        trace.normalised = true;
    }

    if freq.raise < min_raise {
        let deficit = min_raise - freq.raise;
        let pool = freq.fold + freq.call;
        if pool > 0.0 {
            freq.fold -= deficit * freq.fold / pool;
            freq.call -= deficit * freq.call / pool;
        }
        freq.raise = min_raise;
        trace.min_raise_enforced = true;
    }

    (freq, trace)
}
