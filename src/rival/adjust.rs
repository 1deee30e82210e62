//! Additive corrections to the base response frequencies. Each adjustment is
//! clamped to its own envelope so no single input can dominate.

use serde::{Deserialize, Serialize};

use crate::config::ModelCoefficients;
use crate::game::BetSizeCategory;
use crate::rival::features::{BetFeatures, BoardTexture, RangeStrengthPrior, StreetPattern};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    RangeStrength,
    Position,
    StackDepth,
    Multiway,
    BetSizing,
    Aggression,
    BoardTexture,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub kind: AdjustmentKind,
    pub fold: f64,
    pub call: f64,
    pub raise: f64,
    pub note: String,
}

impl Adjustment {
    fn new(kind: AdjustmentKind, note: impl Into<String>) -> Self {
        Self {
            kind,
            fold: 0.0,
            call: 0.0,
            raise: 0.0,
            note: note.into(),
        }
    }

    fn clamped(mut self, envelope: f64) -> Self {
        let envelope = envelope.abs();
        self.fold = self.fold.clamp(-envelope, envelope);
        self.call = self.call.clamp(-envelope, envelope);
        self.raise = self.raise.clamp(-envelope, envelope);
        self
    }

    pub fn is_zero(&self) -> bool {
        self.fold == 0.0 && self.call == 0.0 && self.raise == 0.0
    }
}

/// Strong ranges fold less and raise more.
pub fn range_strength(prior: &RangeStrengthPrior, c: &ModelCoefficients) -> Adjustment {
    let mut adj = Adjustment::new(
        AdjustmentKind::RangeStrength,
        format!("average range strength {:.2}", prior.average),
    );
    let tilt = (0.5 - prior.average) * c.range_slope;
    adj.fold = tilt;
    adj.raise = -tilt * 0.5;
    adj.call = prior.drawing * -tilt.min(0.0);
    adj.clamped(c.range_envelope)
}

pub fn position(villain_in_position: Option<bool>, c: &ModelCoefficients) -> Adjustment {
    let p = &c.position;
    let adj = match villain_in_position {
        Some(true) => Adjustment {
            fold: p.in_position_fold,
            call: p.in_position_call,
            ..Adjustment::new(AdjustmentKind::Position, "villain in position")
        },
        Some(false) => Adjustment {
            fold: p.out_of_position_fold,
            call: p.out_of_position_call,
            ..Adjustment::new(AdjustmentKind::Position, "villain out of position")
        },
        None => Adjustment::new(AdjustmentKind::Position, "position unknown"),
    };
    adj.clamped(p.envelope)
}

/// Short stacks polarise the villain towards fold or jam; deep stacks favour
/// flatting.
pub fn stack_depth(effective_stack: f64, pot_after_bet: f64, c: &ModelCoefficients) -> Adjustment {
    let s = &c.stack;
    if pot_after_bet <= 0.0 || effective_stack <= 0.0 {
        return Adjustment::new(AdjustmentKind::StackDepth, "stack depth unknown");
    }
    let spr = effective_stack / pot_after_bet;
    let adj = if spr <= s.short_spr {
        Adjustment {
            fold: s.short_fold,
            call: s.short_call,
            raise: s.short_raise,
            ..Adjustment::new(AdjustmentKind::StackDepth, format!("short, spr {spr:.2}"))
        }
    } else if spr >= s.deep_spr {
        Adjustment {
            fold: s.deep_fold,
            call: s.deep_call,
            ..Adjustment::new(AdjustmentKind::StackDepth, format!("deep, spr {spr:.2}"))
        }
    } else {
        Adjustment::new(AdjustmentKind::StackDepth, format!("spr {spr:.2}"))
    };
    adj.clamped(s.envelope)
}

pub fn multiway(active_players: usize, c: &ModelCoefficients) -> Adjustment {
    let m = &c.multiway;
    let fold = match active_players {
        0..=2 => m.heads_up,
        3 => m.three_way,
        _ => m.four_plus,
    };
    let continuing = -fold;
    Adjustment {
        fold,
        call: continuing * m.call_share,
        raise: continuing * (1.0 - m.call_share),
        ..Adjustment::new(
            AdjustmentKind::Multiway,
            format!("{active_players} players"),
        )
    }
}

/// Small bets invite raises, big ones shut them down.
pub fn bet_sizing(features: &BetFeatures, c: &ModelCoefficients) -> Adjustment {
    let raise = c.sizing_raise.get(features.category);
    let mut adj = Adjustment {
        raise,
        ..Adjustment::new(
            AdjustmentKind::BetSizing,
            format!("{:?} bet, {:.2}x pot", features.category, features.bet_to_pot),
        )
    };
    if features.category == BetSizeCategory::AllIn {
        // facing a jam the villain can only call or fold
        adj.call = -raise;
    }
    adj.clamped(c.sizing_envelope)
}

pub fn aggression(pattern: &StreetPattern, c: &ModelCoefficients) -> Adjustment {
    let a = &c.aggression;
    let observed = pattern.checks + pattern.calls + pattern.aggressive;
    if observed == 0 {
        return Adjustment::new(AdjustmentKind::Aggression, "no prior actions");
    }
    let lean = (pattern.aggression - a.pivot) * a.slope;
    Adjustment {
        fold: -lean,
        raise: lean,
        ..Adjustment::new(
            AdjustmentKind::Aggression,
            format!("aggression {:.0}%", pattern.aggression * 100.0),
        )
    }
    .clamped(a.envelope)
}

pub fn board_texture(texture: &BoardTexture, c: &ModelCoefficients) -> Adjustment {
    let t = &c.texture;
    let mut adj = Adjustment::new(AdjustmentKind::BoardTexture, describe(texture));
    if !texture.known {
        return adj;
    }
    if texture.dry {
        adj.fold += t.dry_fold;
    }
    if texture.wet {
        adj.call += t.wet_call;
        adj.fold += t.wet_fold;
    }
    if texture.paired {
        adj.raise += t.paired_raise;
    }
    if texture.connected {
        adj.call += t.connected_call;
    }
    adj.clamped(t.envelope)
}

fn describe(texture: &BoardTexture) -> String {
    if !texture.known {
        return "no board".to_string();
    }
    let flags = [
        (texture.dry, "dry"),
        (texture.wet, "wet"),
        (texture.paired, "paired"),
        (texture.connected, "connected"),
        (texture.monotone, "flush possible"),
    ];
    let parts: Vec<&str> = flags
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();
    if parts.is_empty() {
        "neutral board".to_string()
    } else {
        parts.join(", ")
    }
}
