//! A sizing-driven equilibrium heuristic and the rule for blending it into the
//! modelled response.

use serde::{Deserialize, Serialize};

use crate::config::{ModelCoefficients, NashConfig};
use crate::game::BetSizeCategory;
use crate::rival::Frequencies;
use crate::rival::features::{BetFeatures, BoardTexture};
use crate::rival::validate::validate;

const FALLBACK_FOLD: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NashBlend {
    pub heuristic: Frequencies,
    pub confidence: f64,
    pub informative: Vec<String>,
    /// `true` when the heuristic replaced the modelled triple outright.
    pub replaced: bool,
    pub blended: Frequencies,
}

/// Fold at the bettor's indifference point (`bet / (pot + bet)`), nudged by
/// texture, position and pot odds. Returns the triple and the inputs that were
/// actually informative.
pub fn heuristic(
    features: &BetFeatures,
    pot: f64,
    texture: &BoardTexture,
    villain_in_position: Option<bool>,
    coefficients: &ModelCoefficients,
) -> (Frequencies, Vec<String>) {
    let mut informative = Vec::new();

    // sizing and pot odds are one signal
    let mut fold = if features.call_cost > 0.0 && pot > 0.0 {
        informative.push("sizing".to_string());
        let sized = features.call_cost / (pot + features.call_cost);
        let odds_fold = (features.pot_odds * coefficients.pot_odds_fold_scale).min(1.0);
        0.7 * sized + 0.3 * odds_fold
    } else {
        FALLBACK_FOLD
    };

    if texture.known && (texture.dry || texture.wet) {
        informative.push("texture".to_string());
        fold += if texture.dry { 0.04 } else { -0.04 };
    }

    if let Some(in_position) = villain_in_position {
        informative.push("position".to_string());
        fold += if in_position { -0.03 } else { 0.03 };
    }

    let fold = fold.clamp(coefficients.fold_floor, 0.9);
    let raise_share = match features.category {
        BetSizeCategory::Small => 0.20,
        BetSizeCategory::Medium => 0.12,
        BetSizeCategory::Large | BetSizeCategory::VeryLarge => 0.08,
        BetSizeCategory::AllIn => 0.0,
    };
    let continuing = 1.0 - fold;
    let raw = Frequencies {
        fold,
        call: continuing * (1.0 - raise_share),
        raise: continuing * raise_share,
    };
    let (freq, _) = validate(raw, coefficients.min_raise, coefficients.neutral);
    (freq, informative)
}

/// Sizing, a dry or wet board, and the villain's position feed the heuristic;
/// confidence is the share that carried information.
pub fn confidence(informative: &[String]) -> f64 {
    (informative.len() as f64 / 3.0).clamp(0.0, 1.0)
}

/// Replaces `modelled` above the configured confidence, otherwise blends
/// linearly by confidence. `None` when disabled or nothing was informative.
pub fn blend(
    modelled: Frequencies,
    heuristic: Frequencies,
    informative: Vec<String>,
    config: &NashConfig,
    coefficients: &ModelCoefficients,
) -> Option<NashBlend> {
    if !config.enabled {
        return None;
    }
    let confidence = confidence(&informative);
    if confidence <= 0.0 {
        return None;
    }
    let replaced = confidence > config.confidence_threshold;
    let blended = if replaced {
        heuristic
    } else {
        let mixed = Frequencies {
            fold: (1.0 - confidence) * modelled.fold + confidence * heuristic.fold,
            call: (1.0 - confidence) * modelled.call + confidence * heuristic.call,
            raise: (1.0 - confidence) * modelled.raise + confidence * heuristic.raise,
        };
        validate(mixed, coefficients.min_raise, coefficients.neutral).0
    };
    Some(NashBlend {
        heuristic,
        confidence,
        informative,
        replaced,
        blended,
    })
}
