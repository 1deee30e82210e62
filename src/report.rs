use owo_colors::OwoColorize;

use crate::analyser::EvAnalysis;
use crate::cards::Card;
use crate::compare::Classification;
use crate::error::AnalysisError;
use crate::hand::HandRecord;
use crate::store::PlayerStats;

/// Terminal rendering of analyses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Report {
    pub no_color: bool,
}

impl Report {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    pub fn header(&self, hand: &HandRecord) -> String {
        let hero: Vec<&str> = hand.hero_hole_cards.iter().map(String::as_str).collect();
        let board = board_of(hand);
        if self.no_color {
            format!(
                "Hand {} | Hero {} | Board {}",
                hand.id,
                hero.join(" "),
                joined_or_dash(&board)
            )
        } else {
            let hero = pretty_cards(&hero);
            let board = pretty_cards(&board);
            format!(
                "{} {} {} {} {} {}",
                "Hand".bold().cyan(),
                hand.id,
                "Hero".bold().white(),
                hero.bold().yellow(),
                "Board".bold().white(),
                board.bold().blue()
            )
        }
    }

    pub fn decision(&self, hand: &HandRecord, index: usize, analysis: &EvAnalysis) -> String {
        let action = hand
            .betting_actions
            .get(index)
            .map(|a| format!("{} {} {}", a.street, a.action, a.amount))
            .unwrap_or_else(|| "?".to_string());
        let f = analysis.response_frequencies;
        let b = analysis.branch_evs;
        let mut lines = Vec::new();

        if self.no_color {
            lines.push(format!(
                "#{index} {action}: {} (EV {:.3}, best {} {:.3}, delta {:.3})",
                analysis.classification,
                analysis.total_ev,
                analysis.best_alternative.label,
                analysis.best_alternative.ev,
                analysis.delta
            ));
        } else {
            let label = match analysis.classification {
                Classification::PlusEv => analysis.classification.to_string().bold().green().to_string(),
                Classification::MinusEv => analysis.classification.to_string().bold().red().to_string(),
            };
            lines.push(format!(
                "{} {} {} {} {:.3} {} {} {:.3} {} {:.3}",
                format!("#{index}").bold().cyan(),
                action.bold().white(),
                label,
                "EV".bold().white(),
                analysis.total_ev,
                "Best".bold().white(),
                analysis.best_alternative.label.bold().yellow(),
                analysis.best_alternative.ev,
                "Delta".bold().white(),
                analysis.delta
            ));
        }
        lines.push(format!(
            "  response fold {:.3} call {:.3} raise {:.3}{}",
            f.fold,
            f.call,
            f.raise,
            if analysis.gto_frequencies.is_some() {
                " (nash blend)"
            } else {
                ""
            }
        ));
        lines.push(format!(
            "  equity vs call {:.3} vs raise {:.3} | branches fold {:.3} call {:.3} raise {:.3}",
            analysis.equity_vs_call, analysis.equity_vs_raise, b.fold, b.call, b.raise
        ));
        if let Some(audit) = &analysis.audit {
            let others = audit
                .candidates
                .iter()
                .map(|c| format!("{} {:.3}", c.label, c.ev))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("  candidates: {others}"));
            for reason in &audit.reasons {
                lines.push(format!("  note: {reason}"));
            }
        }
        lines.join("\n")
    }

    pub fn failure(&self, index: usize, err: &AnalysisError) -> String {
        if self.no_color {
            format!("#{index} not analysed: {err}")
        } else {
            format!("{} {}", format!("#{index} not analysed:").bold().red(), err)
        }
    }

    pub fn stats(&self, stats: &PlayerStats) -> String {
        if self.no_color {
            format!(
                "Summary: hands={}, decisions={}, +EV={}, -EV={}, total EV={:.3}, EV lost={:.3}",
                stats.hands, stats.analysed, stats.plus_ev, stats.minus_ev, stats.total_ev, stats.total_delta
            )
        } else {
            format!(
                "{} {} {} {} {} {} {} {:.3} {} {:.3}",
                "Summary".bold().magenta(),
                stats.hands,
                "+EV".bold().green(),
                stats.plus_ev,
                "-EV".bold().red(),
                stats.minus_ev,
                "Total EV".bold().white(),
                stats.total_ev,
                "EV lost".bold().white(),
                stats.total_delta
            )
        }
    }
}

fn board_of(hand: &HandRecord) -> Vec<&str> {
    let cards = &hand.community_cards;
    let mut board: Vec<&str> = cards
        .flop
        .iter()
        .flatten()
        .map(String::as_str)
        .collect();
    board.extend(cards.turn.as_deref());
    board.extend(cards.river.as_deref());
    board
}

fn joined_or_dash(cards: &[&str]) -> String {
    if cards.is_empty() {
        "--".to_string()
    } else {
        cards.join(" ")
    }
}

/// Suit symbols where the card parses, the raw text otherwise.
fn pretty_cards(cards: &[&str]) -> String {
    let shown: Vec<String> = cards
        .iter()
        .map(|c| c.parse::<Card>().map(|card| card.pretty()).unwrap_or_else(|_| c.to_string()))
        .collect();
    joined_or_dash(&shown.iter().map(String::as_str).collect::<Vec<_>>())
}
