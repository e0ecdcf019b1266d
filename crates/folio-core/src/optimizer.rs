//! The rebalancing optimizer: lowers an [`Allocation`] and a price snapshot
//! into a mixed-integer model, runs the configured objective strategy and
//! projects the solution back into per-asset results.

use std::cell::Cell;
use std::collections::BTreeMap;

use itertools::izip;
use tracing::debug;

use folio_mip::{Expr, Model, RefPoints, Solution};

use crate::allocation::Allocation;

/// Outcome for one asset, and (with `ticker` empty, bid = ask = 1) for cash.
#[derive(Clone, Debug, Default)]
pub struct AssetResult {
    pub ticker: String,

    pub bid: f64,
    pub ask: f64,

    pub have: f64,
    pub result: f64,
    pub change: f64,
    pub commission: f64,

    /// True when the target for this row was expressed in percent.
    pub in_percents: bool,
    /// Resulting share of the percent-targeted portfolio volume.
    pub percents: f64,
    /// The same share before any trades.
    pub source_percents: f64,
}

/// Aggregate deviation from the targets, in dollars.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Quality {
    /// Mean absolute deviation.
    pub abserr: f64,
    /// Root mean square deviation.
    pub stddev: f64,
}

/// Computes integer buy/sell decisions minimizing deviation from the
/// allocation's targets. Stateless between [`Optimizer::optimize`] calls;
/// results of the last call are kept for inspection.
pub struct Optimizer {
    results: BTreeMap<String, AssetResult>,
    cash: AssetResult,

    quality_source: Quality,
    quality_result: Quality,
}

impl Optimizer {
    pub fn new() -> Self {
        Optimizer {
            results: BTreeMap::new(),
            cash: AssetResult {
                bid: 1.0,
                ask: 1.0,
                ..AssetResult::default()
            },
            quality_source: Quality::default(),
            quality_result: Quality::default(),
        }
    }

    /// Run the rebalance without progress reporting.
    ///
    /// `rates` must return `(bid, ask)` with `0 <= bid <= ask` and
    /// `ask > 0` for every ticker of the allocation.
    pub fn optimize<R>(&mut self, allocation: &Allocation, rates: R) -> bool
    where
        R: Fn(&str) -> (f64, f64),
    {
        self.optimize_with(allocation, rates, |_, _, _| true)
    }

    /// Run the rebalance, reporting `(iteration, active_nodes, progress)`.
    /// Iteration 0 is the no-trade source solve, 1 the first main solve,
    /// 2 the LAD tie-break or, for least squares, each further refinement.
    /// Returning false cancels the run; the no-trade plan is then reported
    /// and `optimize_with` returns false.
    pub fn optimize_with<R, P>(&mut self, allocation: &Allocation, rates: R, mut progress: P) -> bool
    where
        R: Fn(&str) -> (f64, f64),
        P: FnMut(usize, i64, f64) -> bool,
    {
        let assets = allocation.assets();

        let mut bid = Vec::with_capacity(assets.len());
        let mut ask = Vec::with_capacity(assets.len());
        for asset in assets {
            let (b, a) = rates(&asset.ticker);
            assert!(b >= 0.0 && a > 0.0 && a >= b, "bad rates for {}", asset.ticker);
            bid.push(b);
            ask.push(a);
        }

        self.results.clear();
        for (asset, &b, &a) in izip!(assets, &bid, &ask) {
            self.results.insert(
                asset.ticker.clone(),
                AssetResult {
                    ticker: asset.ticker.clone(),
                    bid: b,
                    ask: a,
                    have: asset.have,
                    ..AssetResult::default()
                },
            );
        }
        self.cash = AssetResult {
            bid: 1.0,
            ask: 1.0,
            have: allocation.cash(),
            ..AssetResult::default()
        };

        // Portfolio value ceiling: everything sold at bid plus cash.
        let mut upper_bound = allocation.cash();
        for (asset, &b) in izip!(assets, &bid) {
            upper_bound += asset.have * b;
        }

        let iteration = Cell::new(0usize);
        let mut report = |nodes: i64, fraction: f64| progress(iteration.get(), nodes, fraction);

        let mut model = Model::new();
        model.on_progress(&mut report);

        let mut count: Vec<Expr> = Vec::with_capacity(assets.len());
        let mut commission: Vec<Expr> = Vec::with_capacity(assets.len());
        let mut one_more: Vec<Expr> = Vec::with_capacity(assets.len());

        let mut total_deals = Expr::default();
        let mut cash = Expr::from(allocation.cash());

        for (i, asset) in assets.iter().enumerate() {
            let exists = asset.have;
            count.push(Expr::from(exists));

            let mut all_deals = Expr::default();
            let mut extra = Expr::default();

            if asset.can_buy {
                let max_buy = ((upper_bound - exists * bid[i]) / ask[i]).floor();
                if max_buy >= 1.0 {
                    let buy = model.binary();
                    all_deals += buy.clone();

                    let buy_vol = model.integer(max_buy);
                    model.restrict(buy_vol.clone().geq(buy.clone()));
                    model.restrict(buy_vol.clone().leq(buy.clone() * max_buy));

                    count[i] += buy_vol.clone();
                    cash -= buy_vol * ask[i];
                    extra += buy * ask[i];
                }
            }

            if asset.can_sell && exists > 0.0 {
                // Selling everything also liquidates the fractional tail.
                let sell_all = model.binary();
                all_deals += sell_all.clone();

                count[i] -= sell_all.clone() * exists;
                cash += sell_all.clone() * (exists * bid[i]);
                extra += sell_all * (exists * bid[i] - asset.commission);

                let mut max_sell = exists.floor();
                if max_sell != exists {
                    max_sell -= 1.0;
                }
                if max_sell > 1.0 {
                    let sell = model.binary();
                    all_deals += sell.clone();

                    let sell_vol = model.integer(max_sell);
                    model.restrict(sell_vol.clone().geq(sell.clone()));
                    model.restrict(sell_vol.clone().leq(sell.clone() * max_sell));

                    count[i] -= sell_vol.clone();
                    cash += sell_vol * bid[i];
                    extra += sell * bid[i];
                }
            }

            total_deals += all_deals.clone();
            model.restrict(all_deals.clone().leq(1.0));

            commission.push(all_deals.clone() * asset.commission);
            cash -= commission[i].clone();

            // Cash needed to buy one more share; unbuyable assets price it
            // beyond the whole portfolio.
            if asset.can_buy {
                extra += (1.0 - all_deals) * (ask[i] + asset.commission);
            } else {
                extra += (1.0 - all_deals) * (upper_bound + 0.01);
            }
            one_more.push(extra);
        }

        if allocation.max_deals() > 0 {
            model.restrict(total_deals.clone().leq(allocation.max_deals() as f64));
        }

        // Volume: resulting dollar value of the percent-targeted rows.
        let mut volume = Expr::default();
        for (i, asset) in assets.iter().enumerate() {
            if asset.target_in_percents {
                volume += count[i].clone() * bid[i];
            }
        }
        if allocation.cash_target_in_percents() {
            volume += cash.clone();
        }

        let mut diff: Vec<Expr> = Vec::with_capacity(assets.len() + 1);
        for (i, asset) in assets.iter().enumerate() {
            let target = if asset.target_in_percents {
                volume.clone() * (asset.target * 0.01)
            } else {
                Expr::from(asset.target * bid[i])
            };
            diff.push(count[i].clone() * bid[i] - target);
        }
        if allocation.has_cash_target() {
            let target = if allocation.cash_target_in_percents() {
                volume.clone() * (allocation.cash_target() * 0.01)
            } else {
                Expr::from(allocation.cash_target())
            };
            diff.push(cash.clone() - target);
        }

        // No-trade baseline: fixes the source percentages and quality.
        let cp = model.checkpoint();
        model.restrict(total_deals.clone().equals(0.0));
        iteration.set(0);
        let source = model.minimize(&Expr::from(0.0));
        model.rollback(&cp);

        let Some(source) = source else {
            // Only cancellation can get here; the no-trade model is
            // trivially feasible. Evaluating against all-zero variables
            // reproduces the no-trade plan exactly.
            let no_trade = Solution::new(vec![0.0; model.var_count()]);
            self.project(allocation, &bid, &diff, &count, &commission, &cash, &volume, &no_trade, None);
            return false;
        };
        debug_assert!((source.eval(&cash) - allocation.cash()).abs() < 1e-9);

        model.restrict(cash.clone().geq(0.0));

        for (i, asset) in assets.iter().enumerate() {
            if allocation.use_all_cash() {
                model.restrict(cash.clone().leq(one_more[i].clone() - 0.01));
            } else if asset.target_in_percents {
                // Keeps "move everything to cash" out of the percent math.
                model.restrict(volume.clone().geq(cash.clone() - one_more[i].clone() + 0.01));
            }
        }

        let sol = if allocation.use_least_squares() {
            Self::run_least_squares(&mut model, &diff, &iteration)
        } else {
            Self::run_least_deviations(&mut model, &diff, &iteration)
        };

        drop(model);
        self.project(
            allocation,
            &bid,
            &diff,
            &count,
            &commission,
            &cash,
            &volume,
            &source,
            sol.as_ref(),
        );
        sol.is_some()
    }

    /// Least absolute deviations: minimize `Σ|diffᵢ|`, then keep that
    /// optimum and minimize the spread of the deviations around their
    /// average so ties prefer even distribution.
    fn run_least_deviations(
        model: &mut Model<'_>,
        diff: &[Expr],
        iteration: &Cell<usize>,
    ) -> Option<Solution> {
        let mut abs = Vec::with_capacity(diff.len());
        let mut sum = Expr::default();
        for d in diff {
            let magnitude = model.abs(d);
            sum += magnitude.clone();
            abs.push(magnitude);
        }

        iteration.set(1);
        let sol = model.minimize(&sum)?;

        model.restrict(sum.clone().leq(sol.eval(&sum)));
        let average = sum / diff.len() as f64;

        let mut spread = Expr::default();
        for magnitude in &abs {
            spread += model.abs(&(magnitude.clone() - average.clone()));
        }

        iteration.set(2);
        model.minimize(&spread)
    }

    /// Least squares: approximate each `diffᵢ²` piecewise-linearly around
    /// the reference points seen so far, solve, and refine the anchors with
    /// the solution until no new point appears.
    fn run_least_squares(
        model: &mut Model<'_>,
        diff: &[Expr],
        iteration: &Cell<usize>,
    ) -> Option<Solution> {
        let cp = model.checkpoint();
        let mut refpoints = vec![RefPoints::new(); diff.len()];

        let mut round = 1usize;
        loop {
            iteration.set(round);

            let mut sum = Expr::default();
            for (d, points) in izip!(diff, &mut refpoints) {
                sum += model.square_approx(d, points);
            }

            let sol = model.minimize(&sum)?;

            let mut done = true;
            for (d, points) in izip!(diff, &mut refpoints) {
                if points.insert(sol.eval(d)) {
                    done = false;
                }
            }
            if done {
                debug!(rounds = round, "least-squares refinement converged");
                return Some(sol);
            }

            model.rollback(&cp);
            round += 1;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn project(
        &mut self,
        allocation: &Allocation,
        bid: &[f64],
        diff: &[Expr],
        count: &[Expr],
        commission: &[Expr],
        cash: &Expr,
        volume: &Expr,
        source: &Solution,
        sol: Option<&Solution>,
    ) {
        let assets = allocation.assets();

        if let Some(sol) = sol {
            for (i, asset) in assets.iter().enumerate() {
                let entry = self.results.get_mut(&asset.ticker).expect("seeded");
                entry.result = sol.eval(&count[i]);
                entry.commission = sol.eval(&commission[i]);
            }
            self.cash.result = sol.eval(cash);
        } else {
            for asset in assets {
                let entry = self.results.get_mut(&asset.ticker).expect("seeded");
                entry.result = entry.have;
                entry.commission = 0.0;
            }
            self.cash.result = self.cash.have;
        }

        for entry in self.results.values_mut() {
            entry.change = entry.result - entry.have;
        }
        self.cash.change = self.cash.result - self.cash.have;

        let source_volume = source.eval(volume);
        for (i, asset) in assets.iter().enumerate() {
            let entry = self.results.get_mut(&asset.ticker).expect("seeded");
            entry.percents = 0.0;
            entry.source_percents = 0.0;
            entry.in_percents = asset.target_in_percents;
            if entry.in_percents {
                if source_volume > 0.0 {
                    entry.source_percents = 100.0 * entry.have * bid[i] / source_volume;
                }
                if let Some(sol) = sol {
                    let result_volume = sol.eval(volume);
                    if result_volume > 0.0 {
                        entry.percents = 100.0 * entry.result * bid[i] / result_volume;
                    }
                }
            }
        }

        self.cash.in_percents = allocation.cash_target_in_percents();
        self.cash.percents = 0.0;
        self.cash.source_percents = 0.0;
        if self.cash.in_percents {
            if source_volume > 0.0 {
                self.cash.source_percents = 100.0 * self.cash.have / source_volume;
            }
            if let Some(sol) = sol {
                let result_volume = sol.eval(volume);
                if result_volume > 0.0 {
                    self.cash.percents = 100.0 * self.cash.result / result_volume;
                }
            }
        }

        self.quality_source = Self::quality(diff, source);
        if let Some(sol) = sol {
            self.quality_result = Self::quality(diff, sol);
        } else {
            // Fall back to the no-trade plan wholesale.
            for entry in self.results.values_mut() {
                entry.percents = entry.source_percents;
            }
            self.cash.percents = self.cash.source_percents;
            self.quality_result = self.quality_source;
        }
    }

    fn quality(diff: &[Expr], sol: &Solution) -> Quality {
        if diff.is_empty() {
            return Quality::default();
        }

        let mut abserr = 0.0;
        let mut sumsqr = 0.0;
        for d in diff {
            let delta = sol.eval(d);
            abserr += delta.abs();
            sumsqr += delta * delta;
        }

        let n = diff.len() as f64;
        Quality {
            abserr: abserr / n,
            stddev: (sumsqr / n).sqrt(),
        }
    }

    /// Result for one ticker. Panics for tickers absent from the last
    /// optimized allocation.
    pub fn result(&self, ticker: &str) -> &AssetResult {
        self.results
            .get(ticker)
            .unwrap_or_else(|| panic!("no result for ticker '{ticker}'"))
    }

    /// Results for all tickers of the last optimized allocation.
    pub fn results(&self) -> impl Iterator<Item = &AssetResult> {
        self.results.values()
    }

    pub fn cash_result(&self) -> &AssetResult {
        &self.cash
    }

    /// Quality of the no-trade baseline.
    pub fn source_quality(&self) -> &Quality {
        &self.quality_source
    }

    /// Quality of the returned plan; equals the source quality when no
    /// solution was found.
    pub fn result_quality(&self) -> &Quality {
        &self.quality_result
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}
