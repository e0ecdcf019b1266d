//! Scenario: the `max deals` cap bounds how many assets may trade.
//!
//! # Invariants under test
//!
//! 1. With `max deals = 1` only one asset changes, and the optimizer picks
//!    the deal that reduces deviation the most.
//! 2. With the cap lifted both targets are met.
//! 3. `max deals = 0` means unlimited.

use folio_core::{Allocation, Optimizer};

const MODELS: [&str; 2] = ["lad", "lsapprox"];

fn rates(ticker: &str) -> (f64, f64) {
    match ticker {
        "ONE" => (1.0, 2.0),
        "TWO" => (2.0, 3.0),
        other => panic!("no rates for {other}"),
    }
}

fn optimize(model: &str, sections: &[&str]) -> Optimizer {
    let mut text = format!("[options]\ncommission = 0\nmodel = {model}\n");
    for section in sections {
        text.push_str(section);
        text.push('\n');
    }
    let allocation = Allocation::parse(&text).expect("config parses");
    let mut optimizer = Optimizer::new();
    assert!(optimizer.optimize(&allocation, rates), "model {model}");
    optimizer
}

#[test]
fn single_deal_picks_the_biggest_deviation() {
    for model in MODELS {
        let o = optimize(
            model,
            &[
                "[want]\nONE = 5\nTWO = 5",
                "[cash]\nhave = 30",
                "[options]\nmax deals = 1",
            ],
        );

        // TWO's dollar deviation (2·5 = 10) dominates ONE's (1·5 = 5).
        assert_eq!(o.result("TWO").change, 5.0);
        assert_eq!(o.result("ONE").change, 0.0);
        assert_eq!(o.cash_result().result, 15.0);

        let changed = o.results().filter(|r| r.change != 0.0).count();
        assert!(changed <= 1, "model {model}: {changed} deals made");
    }
}

#[test]
fn unlimited_deals_meet_both_targets() {
    for model in MODELS {
        for options in ["[options]\nmax deals = 0", "[options]\nmax deals = 2"] {
            let o = optimize(
                model,
                &["[want]\nONE = 5\nTWO = 5", "[cash]\nhave = 30", options],
            );
            assert_eq!(o.result("ONE").change, 5.0);
            assert_eq!(o.result("TWO").change, 5.0);
            assert_eq!(o.cash_result().result, 5.0);
        }
    }
}

#[test]
fn cap_of_two_with_three_candidates() {
    for model in MODELS {
        let o = optimize(
            model,
            &[
                "[have]\nONE = 10",
                "[want]\nONE = 10\nTWO = 4",
                "[cash]\nhave = 12",
                "[options]\nmax deals = 2",
            ],
        );
        // ONE is already on target; the single useful deal buys TWO.
        assert_eq!(o.result("ONE").change, 0.0);
        assert_eq!(o.result("TWO").change, 4.0);
        assert_eq!(o.cash_result().result, 0.0);
    }
}
