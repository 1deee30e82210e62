//! The analysis pipeline for one hero decision: context, response model,
//! ranges, equities, branch EVs, total, alternatives, classification.
//!
//! Stages run in a fixed order and each one only reads what earlier stages
//! produced. After every stage the run checks its deadline and abort flag, so
//! a caller can abandon it at any stage boundary. Nothing partial escapes a
//! cancelled run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cards::Card;
use crate::compare::{self, Alternative, Candidate, Classification};
use crate::config::AnalyserConfig;
use crate::context::ActionContext;
use crate::equity::{EquityResult, SampleBudget, estimate_equity};
use crate::error::AnalysisError;
use crate::ev::{self, BranchEvs, BranchInputs};
use crate::game::Street;
use crate::hand::HandRecord;
use crate::range::{self, Range, RangeSummary};
use crate::rival::adjust::Adjustment;
use crate::rival::validate::ValidationTrace;
use crate::rival::{self, Frequencies, ModelInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Context,
    BetFeatures,
    RangeStrength,
    StreetPattern,
    BoardTexture,
    BaseFrequencies,
    RangeAdjustment,
    PositionAdjustment,
    StackAdjustment,
    MultiwayAdjustment,
    SizingAdjustment,
    AggressionAdjustment,
    TextureAdjustment,
    Assembly,
    Validation,
    NashBlend,
    Ranges,
    EquityVsCall,
    EquityVsRaise,
    BranchEvs,
    TotalEv,
    Alternatives,
    Classification,
}

impl Stage {
    pub const ALL: [Stage; 23] = [
        Stage::Context,
        Stage::BetFeatures,
        Stage::RangeStrength,
        Stage::StreetPattern,
        Stage::BoardTexture,
        Stage::BaseFrequencies,
        Stage::RangeAdjustment,
        Stage::PositionAdjustment,
        Stage::StackAdjustment,
        Stage::MultiwayAdjustment,
        Stage::SizingAdjustment,
        Stage::AggressionAdjustment,
        Stage::TextureAdjustment,
        Stage::Assembly,
        Stage::Validation,
        Stage::NashBlend,
        Stage::Ranges,
        Stage::EquityVsCall,
        Stage::EquityVsRaise,
        Stage::BranchEvs,
        Stage::TotalEv,
        Stage::Alternatives,
        Stage::Classification,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Context => "action context",
            Stage::BetFeatures => "bet features",
            Stage::RangeStrength => "range strength",
            Stage::StreetPattern => "street pattern",
            Stage::BoardTexture => "board texture",
            Stage::BaseFrequencies => "base frequencies",
            Stage::RangeAdjustment => "range adjustment",
            Stage::PositionAdjustment => "position adjustment",
            Stage::StackAdjustment => "stack adjustment",
            Stage::MultiwayAdjustment => "multiway adjustment",
            Stage::SizingAdjustment => "sizing adjustment",
            Stage::AggressionAdjustment => "aggression adjustment",
            Stage::TextureAdjustment => "texture adjustment",
            Stage::Assembly => "assembly",
            Stage::Validation => "validation",
            Stage::NashBlend => "nash blend",
            Stage::Ranges => "ranges",
            Stage::EquityVsCall => "equity vs calling range",
            Stage::EquityVsRaise => "equity vs raising range",
            Stage::BranchEvs => "branch EVs",
            Stage::TotalEv => "total EV",
            Stage::Alternatives => "alternatives",
            Stage::Classification => "classification",
        }
    }
}

/// A run stopped at a stage boundary. `completed` is the furthest stage that
/// finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled {
    pub completed: Option<Stage>,
}

impl From<Cancelled> for AnalysisError {
    fn from(c: Cancelled) -> Self {
        AnalysisError::Cancelled {
            completed: c.completed,
        }
    }
}

/// External stop conditions for a run.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    pub deadline: Option<Instant>,
    pub abort: Option<Arc<AtomicBool>>,
}

impl RunControl {
    /// Deadline taken from `deadline_ms`, counted from now.
    pub fn from_config(config: &AnalyserConfig) -> Self {
        Self {
            deadline: config
                .deadline_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms)),
            abort: None,
        }
    }

    pub fn with_abort(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort = Some(flag);
        self
    }

    fn should_stop(&self) -> bool {
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        let aborted = self
            .abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed));
        expired || aborted
    }
}

struct StageClock<'a> {
    control: &'a RunControl,
    completed: Option<Stage>,
    passed: Vec<Stage>,
}

impl<'a> StageClock<'a> {
    fn new(control: &'a RunControl) -> Self {
        Self {
            control,
            completed: None,
            passed: Vec::with_capacity(Stage::ALL.len()),
        }
    }

    fn mark(&mut self, stage: Stage) -> Result<(), Cancelled> {
        self.completed = Some(stage);
        self.passed.push(stage);
        self.check()
    }

    fn check(&self) -> Result<(), Cancelled> {
        if self.control.should_stop() {
            return Err(Cancelled {
                completed: self.completed,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquitySamples {
    pub vs_call: u64,
    pub vs_raise: u64,
    pub vs_range: u64,
}

/// Everything behind the headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub hero: String,
    pub street: Street,
    pub board: Vec<Card>,
    pub villain: Option<String>,
    pub stages: Vec<Stage>,
    pub raw_frequencies: Frequencies,
    pub validation: ValidationTrace,
    pub adjustments: Vec<Adjustment>,
    pub nash_confidence: Option<f64>,
    pub branch_inputs: BranchInputs,
    pub equity_vs_range: f64,
    pub equity_samples: EquitySamples,
    pub ranges: RangeSummary,
    pub candidates: Vec<Candidate>,
    pub ties: Vec<Candidate>,
    pub reasons: Vec<String>,
}

/// The analysis attached to a betting action under `evAnalysis`. Every number
/// is rounded to 3 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvAnalysis {
    pub response_frequencies: Frequencies,
    pub gto_frequencies: Option<Frequencies>,
    pub equity_vs_call: f64,
    pub equity_vs_raise: f64,
    #[serde(rename = "branchEVs")]
    pub branch_evs: BranchEvs,
    #[serde(rename = "totalEV")]
    pub total_ev: f64,
    pub best_alternative: Candidate,
    pub classification: Classification,
    pub delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit: Option<Audit>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Complete(Box<EvAnalysis>),
    Cancelled { completed: Option<Stage> },
}

impl AnalysisOutcome {
    pub fn into_result(self) -> Result<EvAnalysis, AnalysisError> {
        match self {
            AnalysisOutcome::Complete(analysis) => Ok(*analysis),
            AnalysisOutcome::Cancelled { completed } => Err(AnalysisError::Cancelled { completed }),
        }
    }
}

/// Analyses the hero bet or raise at `index`, honouring `deadline_ms`.
pub fn analyse(
    hand: &HandRecord,
    index: usize,
    config: &AnalyserConfig,
) -> Result<EvAnalysis, AnalysisError> {
    analyse_with_control(hand, index, config, &RunControl::from_config(config))?.into_result()
}

/// Input-shape problems are errors; cancellation is an outcome.
pub fn analyse_with_control(
    hand: &HandRecord,
    index: usize,
    config: &AnalyserConfig,
    control: &RunControl,
) -> Result<AnalysisOutcome, AnalysisError> {
    let mut clock = StageClock::new(control);
    match run(hand, index, config, &mut clock) {
        Ok(analysis) => {
            info!(
                hand = %hand.id,
                index,
                total_ev = analysis.total_ev,
                best = %analysis.best_alternative.label,
                classification = %analysis.classification,
                "decision analysed"
            );
            Ok(AnalysisOutcome::Complete(Box::new(analysis)))
        }
        Err(AnalysisError::Cancelled { completed }) => {
            warn!(
                hand = %hand.id,
                index,
                completed = completed.map(Stage::name).unwrap_or("none"),
                "analysis cancelled"
            );
            Ok(AnalysisOutcome::Cancelled { completed })
        }
        Err(err) => Err(err),
    }
}

/// Analyses every hero bet and raise in the hand, in action order.
pub fn analyse_all(
    hand: &HandRecord,
    config: &AnalyserConfig,
) -> Vec<(usize, Result<EvAnalysis, AnalysisError>)> {
    hand.hero_decisions()
        .into_iter()
        .map(|index| (index, analyse(hand, index, config)))
        .collect()
}

fn run(
    hand: &HandRecord,
    index: usize,
    config: &AnalyserConfig,
    clock: &mut StageClock<'_>,
) -> Result<EvAnalysis, AnalysisError> {
    let context = ActionContext::extract(hand, index)?;
    let decision = context
        .decision
        .as_ref()
        .ok_or_else(|| AnalysisError::InvalidDecision {
            index,
            reason: "hand has no betting actions".to_string(),
        })?;
    clock.mark(Stage::Context)?;

    let inputs = ModelInputs::from_decision(decision);
    let model = rival::respond(&inputs, &config.model, &config.nash, |stage| {
        clock.mark(stage)
    })?;

    let dead = decision.dead_mask(context.hero);
    let ranges = range::resolve(&inputs.villain_actions, &decision.board, decision.street, dead);
    clock.mark(Stage::Ranges)?;

    let hero = Range::single(context.hero);
    let budget = SampleBudget {
        per_matchup: config.samples,
        max_rollouts: config.max_rollouts,
    };
    let vs_call = estimate_equity(&decision.board, &hero, &ranges.calling, budget, config.seed);
    clock.mark(Stage::EquityVsCall)?;
    let vs_raise = estimate_equity(
        &decision.board,
        &hero,
        &ranges.raising,
        budget,
        config.seed.wrapping_add(1),
    );
    clock.mark(Stage::EquityVsRaise)?;

    let rake = config.rake.for_street(decision.street);
    let bet = decision.callable(decision.bet());
    let branch_inputs = BranchInputs {
        pot: decision.pot,
        to_call: decision.to_call,
        bet,
        reraise: ev::reraise_size(bet, decision.effective_stack, config.villain_raise_multiplier),
        equity_vs_call: vs_call.mean,
        equity_vs_raise: vs_raise.mean,
        rake,
    };
    let branch_evs = branch_inputs.evaluate();
    clock.mark(Stage::BranchEvs)?;

    let total = compare::total_ev(model.frequencies, branch_evs);
    clock.mark(Stage::TotalEv)?;

    // passive lines are played against the range as it stands
    let vs_range = estimate_equity(
        &decision.board,
        &hero,
        &ranges.current,
        budget,
        config.seed.wrapping_add(2),
    );
    let mut candidates = Vec::new();
    for (i, alternative) in compare::alternatives(decision, &config.alternative_sizes)
        .into_iter()
        .enumerate()
    {
        clock.check()?;
        let ev = match alternative {
            _ if i == 0 => total,
            Alternative::Fold => 0.0,
            Alternative::Check => crate::round3(ev::call_ev(decision.pot, 0.0, vs_range.mean, rake)),
            Alternative::Call(amount) => {
                crate::round3(ev::hero_call_ev(decision.pot, amount, vs_range.mean, rake))
            }
            Alternative::Bet { amount, .. } | Alternative::AllIn(amount) => {
                let amount = decision.callable(amount);
                let model = rival::respond(&inputs.with_bet(amount), &config.model, &config.nash, |_| {
                    clock.check()
                })?;
                let evs = BranchInputs {
                    bet: amount,
                    reraise: ev::reraise_size(
                        amount,
                        decision.effective_stack,
                        config.villain_raise_multiplier,
                    ),
                    ..branch_inputs
                }
                .evaluate();
                compare::total_ev(model.frequencies, evs)
            }
        };
        debug!(alternative = %alternative.label(), ev, "alternative evaluated");
        candidates.push(Candidate::new(alternative.label(), ev));
    }
    let comparison = compare::compare(candidates).ok_or_else(|| AnalysisError::InvalidDecision {
        index,
        reason: "no candidate actions".to_string(),
    })?;
    clock.mark(Stage::Alternatives)?;

    let (classification, delta) = compare::classify(
        comparison.best.ev,
        total,
        config.classification_threshold,
    );
    clock.mark(Stage::Classification)?;

    let reasons = degeneracy_reasons(
        decision.villain.is_none(),
        &model.trace,
        [("calling range", &vs_call), ("raising range", &vs_raise), ("current range", &vs_range)],
    );
    let audit = Audit {
        hero: context.hero.to_string(),
        street: decision.street,
        board: decision.board.clone(),
        villain: decision.villain.as_ref().map(|v| v.id.clone()),
        stages: clock.passed.clone(),
        raw_frequencies: model.raw.rounded(),
        validation: ValidationTrace {
            input_sum: crate::round3(model.trace.input_sum),
            ..model.trace.clone()
        },
        adjustments: model
            .adjustments
            .iter()
            .filter(|a| !a.is_zero())
            .map(rounded_adjustment)
            .collect(),
        nash_confidence: model.nash.as_ref().map(|n| crate::round3(n.confidence)),
        branch_inputs: branch_inputs.rounded(),
        equity_vs_range: crate::round3(vs_range.mean),
        equity_samples: EquitySamples {
            vs_call: vs_call.samples,
            vs_raise: vs_raise.samples,
            vs_range: vs_range.samples,
        },
        ranges: ranges.summary(),
        candidates: comparison.candidates,
        ties: comparison.ties,
        reasons,
    };

    Ok(EvAnalysis {
        response_frequencies: model.frequencies.rounded(),
        gto_frequencies: model.gto_frequencies().map(|f| f.rounded()),
        equity_vs_call: crate::round3(vs_call.mean),
        equity_vs_raise: crate::round3(vs_raise.mean),
        branch_evs: branch_evs.rounded(),
        total_ev: total,
        best_alternative: comparison.best,
        classification,
        delta,
        audit: Some(audit),
    })
}

fn rounded_adjustment(adjustment: &Adjustment) -> Adjustment {
    Adjustment {
        fold: crate::round3(adjustment.fold),
        call: crate::round3(adjustment.call),
        raise: crate::round3(adjustment.raise),
        ..adjustment.clone()
    }
}

fn degeneracy_reasons<'a>(
    no_villain: bool,
    trace: &ValidationTrace,
    equities: impl IntoIterator<Item = (&'a str, &'a EquityResult)>,
) -> Vec<String> {
    let mut reasons = Vec::new();
    if no_villain {
        reasons.push("no opponent identified".to_string());
    }
    if let Some(reason) = &trace.reason {
        reasons.push(format!("response model: {reason}"));
    }
    for (name, result) in equities {
        if let Some(reason) = &result.reason {
            reasons.push(format!("equity vs {name}: {reason}"));
        }
    }
    reasons
}
