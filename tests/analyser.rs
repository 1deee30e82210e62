use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use hand_ev::analyser::{AnalysisOutcome, RunControl, Stage, analyse, analyse_all, analyse_with_control};
use hand_ev::cards::standard_deck;
use hand_ev::compare::Classification;
use hand_ev::config::AnalyserConfig;
use hand_ev::context::ActionContext;
use hand_ev::error::AnalysisError;
use hand_ev::game::{ActionKind, Street};
use hand_ev::hand::{BettingAction, CommunityCards, HandRecord, Player};
use hand_ev::{EvAnalysis, round3};

fn fixture() -> HandRecord {
    serde_json::from_str(include_str!("fixtures/flop_bet.json")).unwrap()
}

fn fast_config() -> AnalyserConfig {
    AnalyserConfig {
        samples: 100,
        max_rollouts: 3_000,
        ..AnalyserConfig::default()
    }
}

fn assert_consistent(analysis: &EvAnalysis) {
    let f = analysis.response_frequencies;
    // each of the three rounded values can be off by half a unit
    assert!((f.sum() - 1.0).abs() <= 1.5e-3 + 1e-9, "{f:?}");
    assert!(f.raise >= 0.02, "{f:?}");
    assert!((0.0..=1.0).contains(&analysis.equity_vs_call));
    assert!((0.0..=1.0).contains(&analysis.equity_vs_raise));
    assert!(analysis.best_alternative.ev >= analysis.total_ev);
    assert_eq!(
        analysis.delta,
        round3(analysis.best_alternative.ev - analysis.total_ev)
    );
    let expected = if analysis.delta > 0.0 {
        Classification::MinusEv
    } else {
        Classification::PlusEv
    };
    assert_eq!(analysis.classification, expected);
}

#[test]
fn analyses_every_hero_decision() {
    let hand = fixture();
    assert_eq!(hand.hero_decisions(), vec![1, 4, 7, 11]);
    let results = analyse_all(&hand, &fast_config());
    assert_eq!(results.len(), 4);
    for (index, result) in results {
        let analysis = result.unwrap_or_else(|err| panic!("decision {index}: {err}"));
        assert_consistent(&analysis);
        let audit = analysis.audit.as_ref().unwrap();
        assert_eq!(audit.candidates[0].ev, analysis.total_ev);
    }
}

#[test]
fn preflop_open_with_empty_pot_is_neutral() {
    let analysis = analyse(&fixture(), 1, &fast_config()).unwrap();
    assert_eq!(analysis.response_frequencies.fold, 0.5);
    assert_eq!(analysis.response_frequencies.call, 0.3);
    assert_eq!(analysis.response_frequencies.raise, 0.2);
    let audit = analysis.audit.unwrap();
    assert!(audit.reasons.iter().any(|r| r.contains("missing inputs")));
}

#[test]
fn river_raise_uses_exact_equity() {
    let analysis = analyse(&fixture(), 11, &fast_config()).unwrap();
    let audit = analysis.audit.as_ref().unwrap();
    assert_eq!(audit.board.len(), 5);
    assert_eq!(audit.branch_inputs.to_call, 60.0);
    assert_eq!(audit.branch_inputs.pot, 195.0);
    // one exact showdown per live matchup
    assert!(audit.equity_samples.vs_call > 0);
    assert!(audit.equity_samples.vs_call <= audit.ranges.calling_combos as u64);
    assert!(audit.candidates.iter().any(|c| c.label == "fold"));
    assert!(audit.candidates.iter().any(|c| c.label.starts_with("call ")));
    assert!(analysis.gto_frequencies.is_some());
}

#[test]
fn same_seed_same_analysis() {
    let hand = fixture();
    let config = fast_config();
    let first = analyse(&hand, 4, &config).unwrap();
    let second = analyse(&hand, 4, &config).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.total_ev.to_bits(), second.total_ev.to_bits());
}

#[test]
fn zero_deadline_cancels_after_context() {
    let config = AnalyserConfig {
        deadline_ms: Some(0),
        ..fast_config()
    };
    let err = analyse(&fixture(), 4, &config).unwrap_err();
    assert_eq!(
        err,
        AnalysisError::Cancelled {
            completed: Some(Stage::Context)
        }
    );
}

#[test]
fn generous_deadline_completes() {
    let config = AnalyserConfig {
        deadline_ms: Some(60_000),
        ..fast_config()
    };
    let outcome = analyse_with_control(&fixture(), 7, &config, &RunControl::from_config(&config)).unwrap();
    assert!(matches!(outcome, AnalysisOutcome::Complete(_)));
}

#[test]
fn empty_action_stream_has_no_decision() {
    let mut hand = fixture();
    hand.betting_actions.clear();
    let context = ActionContext::extract(&hand, 0).unwrap();
    assert!(context.decision.is_none());
    assert!(context.postflop.is_empty());
    assert!(matches!(
        analyse(&hand, 0, &fast_config()),
        Err(AnalysisError::InvalidDecision { index: 0, .. })
    ));
}

#[test]
fn input_shape_errors_surface() {
    let config = fast_config();

    let mut no_cards = fixture();
    no_cards.hero_hole_cards.clear();
    assert_eq!(analyse(&no_cards, 4, &config), Err(AnalysisError::MissingHeroCards));

    let mut bad_card = fixture();
    bad_card.community_cards.turn = Some("1h".to_string());
    assert!(matches!(
        analyse(&bad_card, 4, &config),
        Err(AnalysisError::InvalidCard(card)) if card == "1h"
    ));

    let mut regressed = fixture();
    regressed.betting_actions[5].street = Street::Preflop;
    assert!(matches!(
        analyse(&regressed, 4, &config),
        Err(AnalysisError::InconsistentStreet(_))
    ));

    let mut duplicate = fixture();
    duplicate.community_cards.river = Some("Ah".to_string());
    assert!(matches!(
        analyse(&duplicate, 4, &config),
        Err(AnalysisError::InvalidHand(_))
    ));
}

#[test]
fn call_is_not_an_analysable_decision() {
    assert!(matches!(
        analyse(&fixture(), 9, &fast_config()),
        Err(AnalysisError::InvalidDecision { index: 9, .. })
    ));
}

fn short_villain_flop(hero_bet: f64) -> HandRecord {
    HandRecord {
        id: "short-villain".to_string(),
        username: Some("hero".to_string()),
        hero_hole_cards: vec!["Ah".to_string(), "Kh".to_string()],
        community_cards: CommunityCards {
            flop: Some(vec!["Kd".to_string(), "7c".to_string(), "2s".to_string()]),
            turn: None,
            river: None,
        },
        betting_actions: vec![
            BettingAction::new("hero", ActionKind::Raise, 10.0, Street::Preflop, 1),
            BettingAction::new("villain", ActionKind::Call, 10.0, Street::Preflop, 2),
            BettingAction::new("villain", ActionKind::Check, 0.0, Street::Flop, 1),
            BettingAction::new("hero", ActionKind::Bet, hero_bet, Street::Flop, 2),
        ],
        players: vec![
            Player {
                id: "hero".to_string(),
                position: 0,
                stack_size: 1000.0,
                is_active: true,
            },
            Player {
                id: "villain".to_string(),
                position: 1,
                stack_size: 100.0,
                is_active: true,
            },
        ],
        button_position: 0,
        hero_position: 0,
        game_type: Default::default(),
        tournament_name: None,
    }
}

#[test]
fn bet_beyond_villain_stack_is_priced_as_callable_jam() {
    let config = fast_config();
    let jam = analyse(&short_villain_flop(90.0), 3, &config).unwrap();
    let over = analyse(&short_villain_flop(900.0), 3, &config).unwrap();

    assert_eq!(over.branch_evs, jam.branch_evs);
    assert_eq!(over.response_frequencies, jam.response_frequencies);
    assert_eq!(over.total_ev, jam.total_ev);
    assert_eq!(over.audit.as_ref().unwrap().branch_inputs.bet, 90.0);
    assert_consistent(&over);

    // every size at or above the villain's 90 behind is the same all-in
    for analysis in [&jam, &over] {
        let candidates = &analysis.audit.as_ref().unwrap().candidates;
        assert!(candidates.iter().all(|c| !c.label.starts_with("all-in")), "{candidates:?}");
        let oversized = candidates[1..].iter().filter(|c| {
            c.label
                .strip_prefix("bet ")
                .and_then(|a| a.parse::<f64>().ok())
                .is_some_and(|a| a >= 90.0)
        });
        assert_eq!(oversized.count(), 0, "{candidates:?}");
    }
}

#[test]
fn all_in_alternative_stops_at_villain_stack() {
    let analysis = analyse(&short_villain_flop(30.0), 3, &fast_config()).unwrap();
    let labels: Vec<&str> = analysis
        .audit
        .as_ref()
        .unwrap()
        .candidates
        .iter()
        .map(|c| c.label.as_str())
        .collect();
    assert_eq!(labels, ["bet 30", "check", "bet 15", "bet 45", "all-in 90"]);
}

fn random_hand(rng: &mut ChaCha8Rng, n: usize) -> HandRecord {
    let mut deck = standard_deck();
    deck.shuffle(rng);
    let board_len = *[0usize, 3, 4, 5].choose(rng).unwrap();
    let board: Vec<String> = deck[2..2 + board_len].iter().map(|c| c.to_string()).collect();

    let mut seats: Vec<u8> = (0..=8).collect();
    seats.shuffle(rng);
    let count = rng.gen_range(2..=6);
    let players: Vec<Player> = (0..count)
        .map(|i| Player {
            id: format!("p{i}"),
            position: seats[i],
            stack_size: rng.gen_range(0.0..400.0),
            is_active: rng.gen_bool(0.9),
        })
        .collect();

    let kinds = [
        ActionKind::Fold,
        ActionKind::Check,
        ActionKind::Call,
        ActionKind::Bet,
        ActionKind::Raise,
    ];
    let mut actions = Vec::new();
    for street in [Street::Preflop, Street::Flop, Street::Turn, Street::River] {
        if street.board_len() > board_len {
            break;
        }
        for order in 1..=rng.gen_range(0..6u32) {
            let kind = *kinds.choose(rng).unwrap();
            let player = &players[rng.gen_range(0..count)];
            let amount = match kind {
                ActionKind::Fold | ActionKind::Check => 0.0,
                _ => rng.gen_range(0.0..120.0),
            };
            actions.push(BettingAction::new(&player.id, kind, amount, street, order));
        }
    }

    HandRecord {
        id: format!("random-{n}"),
        username: Some("p0".to_string()),
        hero_hole_cards: deck[..2].iter().map(|c| c.to_string()).collect(),
        community_cards: CommunityCards {
            flop: (board_len >= 3).then(|| board[..3].to_vec()),
            turn: board.get(3).cloned(),
            river: board.get(4).cloned(),
        },
        betting_actions: actions,
        players,
        button_position: seats[rng.gen_range(0..count)],
        hero_position: seats[0],
        game_type: Default::default(),
        tournament_name: None,
    }
}

#[test]
fn adversarial_hands_never_panic() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let config = AnalyserConfig {
        samples: 20,
        max_rollouts: 400,
        ..AnalyserConfig::default()
    };
    for n in 0..40 {
        let hand = random_hand(&mut rng, n);
        let mut indices = hand.hero_decisions();
        indices.push(rng.gen_range(0..=hand.betting_actions.len()));
        for index in indices {
            match analyse(&hand, index, &config) {
                Ok(analysis) => assert_consistent(&analysis),
                Err(AnalysisError::Cancelled { .. }) => panic!("no deadline was set"),
                Err(_) => {}
            }
        }
    }
}
