//! Expected value of each villain response to a hero bet, in chips relative to
//! the hero giving up the pot now.

use serde::{Deserialize, Serialize};

use crate::config::Rake;

/// House cut of a pot of `amount`: `min(percent * amount, cap)`.
pub fn rake(amount: f64, rake: Rake) -> f64 {
    if rake.percent <= 0.0 || amount <= 0.0 {
        return 0.0;
    }
    let cut = rake.percent * amount;
    match rake.cap {
        Some(cap) => cut.min(cap),
        None => cut,
    }
}

/// Villain folds: the hero collects the pot that was there before the bet.
pub fn fold_ev(pot: f64, r: Rake) -> f64 {
    pot - rake(pot, r)
}

/// Villain calls a bet of `bet` into `pot`. With no bet this is the value of
/// checking it down.
pub fn call_ev(pot: f64, bet: f64, equity: f64, r: Rake) -> f64 {
    if bet <= 0.0 {
        return equity * pot - equity * rake(pot, r);
    }
    showdown_ev(pot + 2.0 * bet, bet, equity, r)
}

/// Villain re-raises by `reraise`. The hero takes the better of giving up the
/// bet and calling down against the raising range.
pub fn raise_ev(pot: f64, bet: f64, reraise: f64, equity_vs_raise: f64, r: Rake) -> f64 {
    if reraise <= 0.0 {
        return call_ev(pot, bet, equity_vs_raise, r);
    }
    let give_up = -bet;
    let pot_after = pot + bet + 2.0 * reraise;
    let continue_ev = showdown_ev(pot_after, reraise, equity_vs_raise, r);
    give_up.max(continue_ev)
}

/// The hero calls `to_call` into `pot` and sees a showdown.
pub fn hero_call_ev(pot: f64, to_call: f64, equity: f64, r: Rake) -> f64 {
    showdown_ev(pot + to_call, to_call, equity, r)
}

fn showdown_ev(pot_after: f64, invested: f64, equity: f64, r: Rake) -> f64 {
    equity * pot_after - invested - equity * rake(pot_after, r)
}

/// Size of the modelled villain re-raise: a multiple of the bet, capped by
/// what is left behind.
pub fn reraise_size(bet: f64, effective_stack: f64, multiplier: f64) -> f64 {
    let behind = (effective_stack - bet).max(0.0);
    (multiplier * bet).min(behind).max(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BranchEvs {
    pub fold: f64,
    pub call: f64,
    pub raise: f64,
}

impl BranchEvs {
    pub fn rounded(&self) -> Self {
        Self {
            fold: crate::round3(self.fold),
            call: crate::round3(self.call),
            raise: crate::round3(self.raise),
        }
    }
}

/// Everything the branch formulas read, kept for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchInputs {
    pub pot: f64,
    /// What the hero faced before betting; already part of `pot`.
    pub to_call: f64,
    pub bet: f64,
    pub reraise: f64,
    pub equity_vs_call: f64,
    pub equity_vs_raise: f64,
    pub rake: Rake,
}

impl BranchInputs {
    /// When the hero raises, the villain's own bet is already in `pot`, so the
    /// called and re-raised branches count it once.
    pub fn evaluate(&self) -> BranchEvs {
        let contested = (self.pot - self.to_call).max(0.0);
        BranchEvs {
            fold: fold_ev(self.pot, self.rake),
            call: call_ev(contested, self.bet, self.equity_vs_call, self.rake),
            raise: raise_ev(
                contested,
                self.bet,
                self.reraise,
                self.equity_vs_raise,
                self.rake,
            ),
        }
    }

    pub fn rounded(&self) -> Self {
        Self {
            pot: crate::round3(self.pot),
            to_call: crate::round3(self.to_call),
            bet: crate::round3(self.bet),
            reraise: crate::round3(self.reraise),
            equity_vs_call: crate::round3(self.equity_vs_call),
            equity_vs_raise: crate::round3(self.equity_vs_raise),
            rake: self.rake,
        }
    }
}
