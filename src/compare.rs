//! Combining branch EVs, enumerating the hero's alternatives, and labelling the
//! chosen action.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::Decision;
use crate::ev::BranchEvs;
use crate::game::ActionKind;
use crate::rival::Frequencies;

/// Probability-weighted EV of a bet, rounded to 3 decimals.
pub fn total_ev(freq: Frequencies, branches: BranchEvs) -> f64 {
    crate::round3(freq.fold * branches.fold + freq.call * branches.call + freq.raise * branches.raise)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    pub ev: f64,
}

impl Candidate {
    pub fn new(label: impl Into<String>, ev: f64) -> Self {
        Self {
            label: label.into(),
            ev,
        }
    }
}

/// Best candidate plus every other candidate with exactly the same EV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub best: Candidate,
    pub ties: Vec<Candidate>,
    pub candidates: Vec<Candidate>,
}

/// Picks the highest EV. The earliest candidate wins a tie, so candidate order
/// decides which of several equal actions is reported as best.
pub fn compare(candidates: Vec<Candidate>) -> Option<Comparison> {
    let mut best: Option<&Candidate> = None;
    for candidate in &candidates {
        if best.is_none_or(|b| candidate.ev > b.ev) {
            best = Some(candidate);
        }
    }
    let best = best?.clone();
    let mut seen_best = false;
    let ties = candidates
        .iter()
        .filter(|c| {
            if c.ev != best.ev {
                return false;
            }
            if !seen_best && c.label == best.label {
                seen_best = true;
                return false;
            }
            true
        })
        .cloned()
        .collect();
    Some(Comparison {
        best,
        ties,
        candidates,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "+EV")]
    PlusEv,
    #[serde(rename = "-EV")]
    MinusEv,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Classification::PlusEv => "+EV",
            Classification::MinusEv => "-EV",
        })
    }
}

/// Labels the chosen action and returns `best - chosen`, rounded.
pub fn classify(best_ev: f64, chosen_ev: f64, threshold: f64) -> (Classification, f64) {
    let delta = crate::round3(best_ev - chosen_ev);
    let label = if delta > threshold {
        Classification::MinusEv
    } else {
        Classification::PlusEv
    };
    (label, delta)
}

/// A hero action that could have been taken at the decision instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Alternative {
    Fold,
    Check,
    Call(f64),
    Bet { kind: ActionKind, amount: f64 },
    AllIn(f64),
}

impl Alternative {
    pub fn label(&self) -> String {
        match self {
            Alternative::Fold => "fold".to_string(),
            Alternative::Check => "check".to_string(),
            Alternative::Call(amount) => format!("call {}", chips(*amount)),
            Alternative::Bet { kind, amount } => format!("{kind} {}", chips(*amount)),
            Alternative::AllIn(amount) => format!("all-in {}", chips(*amount)),
        }
    }
}

fn chips(amount: f64) -> String {
    let rounded = crate::round3(amount);
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}

/// Actions available at `decision`: the chosen one first, then the passive
/// options, resized bets, and all-in. Sizes that do not beat the price to call
/// or that reach the all-in the villain can match are dropped; all-in covers
/// the latter, unless the chosen bet already does.
pub fn alternatives(decision: &Decision, sizes: &[f64]) -> Vec<Alternative> {
    let chosen = decision.bet();
    let kind = decision.action.kind;
    let stack = decision.hero_remaining;
    let jam = decision.all_in();
    let mut out = vec![Alternative::Bet {
        kind,
        amount: chosen,
    }];

    if decision.to_call > 0.0 {
        out.push(Alternative::Fold);
        out.push(Alternative::Call(decision.to_call.min(stack.max(0.0))));
    } else {
        out.push(Alternative::Check);
    }

    let near = |a: f64, b: f64| (a - b).abs() < 1e-6;
    let mut taken = vec![decision.callable(chosen)];
    for &multiple in sizes {
        let amount = crate::round3(chosen * multiple);
        if !amount.is_finite() || amount <= decision.to_call || amount <= 0.0 {
            continue;
        }
        if jam > 0.0 && amount >= jam {
            continue;
        }
        if taken.iter().any(|&t| near(t, amount)) {
            continue;
        }
        taken.push(amount);
        out.push(Alternative::Bet { kind, amount });
    }

    if jam > decision.to_call && !taken.iter().any(|&t| near(t, jam)) {
        out.push(Alternative::AllIn(crate::round3(jam)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_reported_once() {
        let cmp = compare(vec![
            Candidate::new("bet", 1.0),
            Candidate::new("check", 1.0),
            Candidate::new("fold", -0.1),
        ])
        .unwrap();
        assert_eq!(cmp.best, Candidate::new("bet", 1.0));
        assert_eq!(cmp.ties, vec![Candidate::new("check", 1.0)]);
        assert_eq!(cmp.candidates.len(), 3);
    }

    #[test]
    fn strictly_better_later_candidate_wins() {
        let cmp = compare(vec![Candidate::new("bet 50", 2.0), Candidate::new("check", 3.5)]).unwrap();
        assert_eq!(cmp.best.label, "check");
        assert!(cmp.ties.is_empty());
    }

    #[test]
    fn empty_has_no_best() {
        assert!(compare(Vec::new()).is_none());
    }

    #[test]
    fn threshold_controls_label() {
        assert_eq!(classify(10.0, 10.0, 0.0), (Classification::PlusEv, 0.0));
        assert_eq!(classify(10.5, 10.0, 0.0), (Classification::MinusEv, 0.5));
        assert_eq!(classify(10.5, 10.0, 1.0).0, Classification::PlusEv);
    }

    #[test]
    fn labels() {
        assert_eq!(Alternative::Check.label(), "check");
        assert_eq!(
            Alternative::Bet {
                kind: ActionKind::Bet,
                amount: 37.5
            }
            .label(),
            "bet 37.5"
        );
        assert_eq!(Alternative::AllIn(400.0).label(), "all-in 400");
    }

    #[test]
    fn classification_wire_names() {
        assert_eq!(serde_json::to_string(&Classification::PlusEv).unwrap(), "\"+EV\"");
        assert_eq!(serde_json::to_string(&Classification::MinusEv).unwrap(), "\"-EV\"");
    }
}
