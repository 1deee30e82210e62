use hand_ev::compare::{Candidate, Classification, classify, compare, total_ev};
use hand_ev::config::{Rake, RakeConfig};
use hand_ev::ev::{BranchEvs, call_ev, fold_ev, rake, raise_ev};
use hand_ev::game::Street;
use hand_ev::rival::Frequencies;

const FIVE_PERCENT_CAP_TEN: Rake = Rake {
    percent: 0.05,
    cap: Some(10.0),
};

#[test]
fn fold_branch_pays_pot_minus_rake() {
    assert_eq!(fold_ev(80.0, FIVE_PERCENT_CAP_TEN), 76.0);
    assert_eq!(fold_ev(400.0, FIVE_PERCENT_CAP_TEN), 390.0);
    assert_eq!(fold_ev(80.0, Rake::NONE), 80.0);
}

#[test]
fn raise_branch_without_reraise_is_call_branch() {
    let ev = raise_ev(100.0, 50.0, 0.0, 0.4, Rake::NONE);
    assert!((ev - 30.0).abs() < 1e-9, "ev={ev}");
    assert_eq!(ev, call_ev(100.0, 50.0, 0.4, Rake::NONE));
}

#[test]
fn call_branch_is_linear_in_equity() {
    let (pot, bet) = (120.0, 60.0);
    let pot_after = pot + 2.0 * bet;
    for r in [Rake::NONE, FIVE_PERCENT_CAP_TEN] {
        let rate = rake(pot_after, r) / pot_after;
        let expected_slope = pot_after * (1.0 - rate);
        let points: Vec<f64> = [0.0, 0.25, 0.5, 0.75, 1.0]
            .iter()
            .map(|&e| call_ev(pot, bet, e, r))
            .collect();
        assert!((points[0] + bet).abs() < 1e-9);
        for pair in points.windows(2) {
            let slope = (pair[1] - pair[0]) / 0.25;
            assert!((slope - expected_slope).abs() < 1e-9, "slope={slope}");
        }
    }
}

#[test]
fn no_flop_no_drop_waives_preflop_rake() {
    let config = RakeConfig {
        percent: 0.05,
        cap: Some(3.0),
        no_flop_no_drop: true,
    };
    assert_eq!(config.for_street(Street::Preflop), Rake::NONE);
    assert_eq!(rake(100.0, config.for_street(Street::Flop)), 3.0);
}

#[test]
fn total_is_probability_weighted() {
    let total = total_ev(
        Frequencies::new(0.5, 0.3, 0.2),
        BranchEvs {
            fold: 100.0,
            call: -20.0,
            raise: -50.0,
        },
    );
    assert_eq!(total, 34.0);
}

#[test]
fn classification_tie() {
    let comparison = compare(vec![
        Candidate::new("bet", 1.0),
        Candidate::new("check", 1.0),
        Candidate::new("fold", -0.1),
    ])
    .unwrap();
    assert_eq!(comparison.best.ev, 1.0);
    assert_eq!(comparison.ties.len(), 1);
    assert_eq!(comparison.ties[0].label, "check");

    let (label, delta) = classify(comparison.best.ev, 1.0, 0.0);
    assert_eq!(label, Classification::PlusEv);
    assert_eq!(delta, 0.0);
}

#[test]
fn comparison_order_is_stable() {
    let candidates = vec![
        Candidate::new("bet 50", 3.0),
        Candidate::new("check", 3.0),
        Candidate::new("bet 25", 3.0),
        Candidate::new("all-in 400", -12.0),
    ];
    for _ in 0..3 {
        let comparison = compare(candidates.clone()).unwrap();
        assert_eq!(comparison.best.label, "bet 50");
        let ties: Vec<&str> = comparison.ties.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(ties, ["check", "bet 25"]);
        assert_eq!(comparison.candidates, candidates);
    }
}
