use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::game::{BetSizeCategory, Street};
use crate::rival::Frequencies;

/// Everything one analysis reads. Passed by value; nothing is global.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyserConfig {
    /// Run-outs per matchup in the equity estimator.
    pub samples: u32,
    /// Run-outs across all matchups of one estimate.
    pub max_rollouts: u64,
    pub seed: u64,
    pub rake: RakeConfig,
    /// A decision is -EV when the best alternative beats it by more than this.
    pub classification_threshold: f64,
    /// Wall-clock budget checked at every stage boundary.
    pub deadline_ms: Option<u64>,
    /// Modelled villain re-raise, as a multiple of the hero's bet.
    pub villain_raise_multiplier: f64,
    /// Alternative bet sizes, as multiples of the chosen bet.
    pub alternative_sizes: Vec<f64>,
    pub nash: NashConfig,
    pub model: ModelCoefficients,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            max_rollouts: 20_000,
            seed: 0,
            rake: RakeConfig::default(),
            classification_threshold: 0.0,
            deadline_ms: None,
            villain_raise_multiplier: 2.0,
            alternative_sizes: vec![0.5, 1.5],
            nash: NashConfig::default(),
            model: ModelCoefficients::default(),
        }
    }
}

impl AnalyserConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.rake.percent) {
            bail!("rake percent {} outside [0, 1]", self.rake.percent);
        }
        if let Some(cap) = self.rake.cap
            && cap < 0.0
        {
            bail!("rake cap {cap} is negative");
        }
        if !(0.0..=1.0).contains(&self.nash.confidence_threshold) {
            bail!(
                "nash confidence threshold {} outside [0, 1]",
                self.nash.confidence_threshold
            );
        }
        if self.villain_raise_multiplier < 0.0 {
            bail!("villain raise multiplier must not be negative");
        }
        if self.model.min_raise < 0.0 || self.model.min_raise > 1.0 {
            bail!("minimum raise probability {} outside [0, 1]", self.model.min_raise);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RakeConfig {
    pub percent: f64,
    pub cap: Option<f64>,
    pub no_flop_no_drop: bool,
}

impl RakeConfig {
    /// Rake parameters in force for a decision taken on `street`.
    pub fn for_street(&self, street: Street) -> Rake {
        if self.no_flop_no_drop && street == Street::Preflop {
            return Rake::NONE;
        }
        Rake {
            percent: self.percent,
            cap: self.cap,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Rake {
    pub percent: f64,
    pub cap: Option<f64>,
}

impl Rake {
    pub const NONE: Rake = Rake {
        percent: 0.0,
        cap: None,
    };
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NashConfig {
    pub enabled: bool,
    /// Above this confidence the heuristic triple replaces the modelled one.
    pub confidence_threshold: f64,
}

impl Default for NashConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence_threshold: 0.8,
        }
    }
}

/// Per bet-size values, used for the GTO fold table and the raise-induction
/// factor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SizeTable {
    pub small: f64,
    pub medium: f64,
    pub large: f64,
    pub very_large: f64,
    pub all_in: f64,
}

impl SizeTable {
    pub fn get(&self, category: BetSizeCategory) -> f64 {
        match category {
            BetSizeCategory::Small => self.small,
            BetSizeCategory::Medium => self.medium,
            BetSizeCategory::Large => self.large,
            BetSizeCategory::VeryLarge => self.very_large,
            BetSizeCategory::AllIn => self.all_in,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreetTable {
    pub preflop: f64,
    pub flop: f64,
    pub turn: f64,
    pub river: f64,
}

impl StreetTable {
    pub fn get(&self, street: Street) -> f64 {
        match street {
            Street::Preflop => self.preflop,
            Street::Flop => self.flop,
            Street::Turn => self.turn,
            Street::River => self.river,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BaseWeights {
    pub gto: f64,
    pub sizing: f64,
    pub pot_odds: f64,
    pub range: f64,
    pub street: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionCoefficients {
    pub in_position_fold: f64,
    pub in_position_call: f64,
    pub out_of_position_fold: f64,
    pub out_of_position_call: f64,
    pub envelope: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StackCoefficients {
    /// Stack-to-pot ratio at or below which stacks count as short.
    pub short_spr: f64,
    pub deep_spr: f64,
    pub short_fold: f64,
    pub short_call: f64,
    pub short_raise: f64,
    pub deep_fold: f64,
    pub deep_call: f64,
    pub envelope: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiwayCoefficients {
    pub heads_up: f64,
    pub three_way: f64,
    pub four_plus: f64,
    /// Share of a fold shift that moves into calls rather than raises.
    pub call_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggressionCoefficients {
    /// Aggression share treated as neutral.
    pub pivot: f64,
    pub slope: f64,
    pub envelope: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextureCoefficients {
    pub dry_fold: f64,
    pub wet_call: f64,
    pub wet_fold: f64,
    pub paired_raise: f64,
    pub connected_call: f64,
    pub envelope: f64,
}

/// Heuristic priors of the opponent model. None of these are fitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelCoefficients {
    pub gto_fold: SizeTable,
    pub weights: BaseWeights,
    /// Fold prior by street before the villain's line is considered.
    pub street_fold: StreetTable,
    pub base_call: f64,
    pub base_raise: f64,
    pub min_raise: f64,
    pub fold_floor: f64,
    pub fold_ceiling: f64,
    pub neutral: Frequencies,
    /// Pot odds are scaled by this to read as a fold estimate.
    pub pot_odds_fold_scale: f64,
    pub range_slope: f64,
    pub range_envelope: f64,
    pub position: PositionCoefficients,
    pub stack: StackCoefficients,
    pub multiway: MultiwayCoefficients,
    pub sizing_raise: SizeTable,
    pub sizing_envelope: f64,
    pub aggression: AggressionCoefficients,
    pub texture: TextureCoefficients,
}

impl Default for ModelCoefficients {
    fn default() -> Self {
        Self {
            gto_fold: SizeTable {
                small: 0.25,
                medium: 0.40,
                large: 0.55,
                very_large: 0.65,
                all_in: 0.60,
            },
            weights: BaseWeights {
                gto: 0.25,
                sizing: 0.25,
                pot_odds: 0.20,
                range: 0.20,
                street: 0.10,
            },
            street_fold: StreetTable {
                preflop: 0.45,
                flop: 0.42,
                turn: 0.38,
                river: 0.35,
            },
            base_call: 0.30,
            base_raise: 0.10,
            min_raise: 0.02,
            fold_floor: 0.05,
            fold_ceiling: 0.95,
            neutral: Frequencies {
                fold: 0.5,
                call: 0.3,
                raise: 0.2,
            },
            pot_odds_fold_scale: 1.5,
            range_slope: 0.30,
            range_envelope: 0.15,
            position: PositionCoefficients {
                in_position_fold: -0.05,
                in_position_call: 0.04,
                out_of_position_fold: 0.05,
                out_of_position_call: -0.03,
                envelope: 0.10,
            },
            stack: StackCoefficients {
                short_spr: 2.0,
                deep_spr: 8.0,
                short_fold: 0.05,
                short_call: -0.08,
                short_raise: 0.05,
                deep_fold: -0.03,
                deep_call: 0.05,
                envelope: 0.10,
            },
            multiway: MultiwayCoefficients {
                heads_up: -0.10,
                three_way: 0.05,
                four_plus: 0.15,
                call_share: 0.7,
            },
            sizing_raise: SizeTable {
                small: 0.05,
                medium: 0.02,
                large: -0.02,
                very_large: -0.04,
                all_in: -0.08,
            },
            sizing_envelope: 0.08,
            aggression: AggressionCoefficients {
                pivot: 0.3,
                slope: 0.25,
                envelope: 0.10,
            },
            texture: TextureCoefficients {
                dry_fold: 0.05,
                wet_call: 0.05,
                wet_fold: -0.03,
                paired_raise: -0.03,
                connected_call: 0.03,
                envelope: 0.10,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AnalyserConfig =
            serde_json::from_str(r#"{"seed": 9, "rake": {"percent": 0.05, "cap": 3}}"#).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.rake.cap, Some(3.0));
        assert_eq!(config.samples, 1000);
        assert_eq!(config.nash.confidence_threshold, 0.8);
        assert_eq!(config.model.multiway.heads_up, -0.10);
    }

    #[test]
    fn no_flop_no_drop_waives_preflop_rake() {
        let rake = RakeConfig {
            percent: 0.05,
            cap: Some(3.0),
            no_flop_no_drop: true,
        };
        assert_eq!(rake.for_street(Street::Preflop), Rake::NONE);
        assert_eq!(rake.for_street(Street::Flop).percent, 0.05);
    }

    #[test]
    fn rejects_out_of_range_rake() {
        let mut config = AnalyserConfig::default();
        config.rake.percent = 1.5;
        assert!(config.check().is_err());
    }
}
