//! Scenario: the use-all-cash option versus explicit cash targets.
//!
//! With `no more deals = true` a plan may not leave enough cash to buy one
//! more share of any buyable asset; a deal that would strand affordable
//! cash becomes infeasible and the optimizer keeps the position instead.
//!
//! # Invariants under test
//!
//! 1. A cash target and use-all-cash reach different liquidation depths on
//!    the same position.
//! 2. Use-all-cash can forbid profitable-looking sales whose proceeds would
//!    remain spendable.
//! 3. Fractional tails interact with both mechanisms.

use folio_core::{Allocation, Optimizer};

const MODELS: [&str; 2] = ["lad", "lsapprox"];

fn rates(ticker: &str) -> (f64, f64) {
    match ticker {
        "ONE" => (1.0, 2.0),
        other => panic!("no rates for {other}"),
    }
}

fn optimize(model: &str, commission: f64, sections: &[&str]) -> Optimizer {
    let mut text = format!("[options]\ncommission = {commission}\nmodel = {model}\n");
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
fn cash_target_caps_the_liquidation() {
    for model in MODELS {
        let o = optimize(
            model,
            0.0,
            &["[have]\nONE = 4", "[want]\nONE = 0", "[cash]\nwant = 4"],
        );
        assert_eq!(o.result("ONE").result, 0.0);
        assert_eq!(o.cash_result().result, 4.0);

        let o = optimize(model, 0.0, &["[have]\nONE = 4", "[want]\nONE = 0"]);
        assert_eq!(o.result("ONE").result, 0.0);
        assert_eq!(o.cash_result().result, 4.0);

        // A zero cash target splits the difference with the position.
        let o = optimize(
            model,
            0.0,
            &["[have]\nONE = 4", "[want]\nONE = 0", "[cash]\nwant = 0"],
        );
        assert_eq!(o.result("ONE").result, 2.0);
        assert_eq!(o.cash_result().result, 2.0);
    }
}

#[test]
fn use_all_cash_blocks_the_sale_entirely() {
    for model in MODELS {
        let o = optimize(
            model,
            0.0,
            &[
                "[have]\nONE = 4",
                "[want]\nONE = 0",
                "[options]\nno more deals = true",
            ],
        );
        assert_eq!(o.result("ONE").result, 4.0);
        assert_eq!(o.cash_result().result, 0.0);
    }
}

#[test]
fn commission_shifts_the_achievable_target() {
    for model in MODELS {
        let o = optimize(
            model,
            1.0,
            &["[have]\nONE = 5", "[want]\nONE = 0", "[cash]\nwant = 4"],
        );
        assert_eq!(o.result("ONE").result, 0.0);
        assert_eq!(o.cash_result().result, 4.0);

        let o = optimize(
            model,
            1.0,
            &["[have]\nONE = 5", "[want]\nONE = 0", "[cash]\nwant = 0"],
        );
        assert_eq!(o.result("ONE").result, 2.0);
        assert_eq!(o.cash_result().result, 2.0);

        let o = optimize(model, 1.0, &["[have]\nONE = 5", "[want]\nONE = 0"]);
        assert_eq!(o.result("ONE").result, 0.0);
        assert_eq!(o.cash_result().result, 4.0);

        let o = optimize(
            model,
            1.0,
            &[
                "[have]\nONE = 5",
                "[want]\nONE = 0",
                "[options]\nno more deals = true",
            ],
        );
        assert_eq!(o.result("ONE").result, 4.0);
        assert_eq!(o.cash_result().result, 0.0);
    }
}

#[test]
fn fractional_tails_under_use_all_cash() {
    for model in MODELS {
        let o = optimize(model, 1.0, &["[have]\nONE = 1.3", "[want]\nONE = 0"]);
        assert_eq!(o.result("ONE").result, 0.0);
        assert!((o.cash_result().result - 0.3).abs() < 1e-6);

        // The liquidation proceeds (0.3) would not buy another share, but
        // selling costs the commission first; keeping wins.
        let o = optimize(
            model,
            1.0,
            &[
                "[have]\nONE = 1.3",
                "[want]\nONE = 0",
                "[options]\nno more deals = true",
            ],
        );
        assert_eq!(o.result("ONE").change, 0.0);
        assert_eq!(o.cash_result().change, 0.0);

        let o = optimize(model, 1.0, &["[have]\nONE = 2.3", "[want]\nONE = 0"]);
        assert_eq!(o.result("ONE").result, 0.0);
        assert!((o.cash_result().result - 1.3).abs() < 1e-6);

        let o = optimize(
            model,
            1.0,
            &[
                "[have]\nONE = 2.3",
                "[want]\nONE = 0",
                "[options]\nno more deals = true",
            ],
        );
        assert_eq!(o.result("ONE").change, 0.0);
        assert_eq!(o.cash_result().change, 0.0);
    }
}

#[test]
fn larger_fractional_position() {
    for model in MODELS {
        let o = optimize(
            model,
            1.0,
            &["[have]\nONE = 3.3", "[want]\nONE = 0", "[cash]\nwant = 0"],
        );
        assert!((o.result("ONE").result - 1.3).abs() < 1e-6);
        assert_eq!(o.cash_result().result, 1.0);

        let o = optimize(model, 1.0, &["[have]\nONE = 3.3", "[want]\nONE = 0"]);
        assert_eq!(o.result("ONE").result, 0.0);
        assert!((o.cash_result().result - 2.3).abs() < 1e-6);

        // Only a single-share sale leaves nothing spendable behind.
        let o = optimize(
            model,
            1.0,
            &[
                "[have]\nONE = 3.3",
                "[want]\nONE = 0",
                "[options]\nno more deals = true",
            ],
        );
        assert_eq!(o.result("ONE").change, -1.0);
        assert!(!o.result("ONE").in_percents);
        assert_eq!(o.cash_result().change, 0.0);
    }
}
