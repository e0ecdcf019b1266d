//! folio: compute and print a portfolio rebalancing plan.
//!
//! Reads an allocation config, fetches quotes from the configured market
//! info provider, runs the optimizer and renders the resulting trades as a
//! table plus an ordered rebalancing strategy.

mod table;

use std::cell::Cell;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;

use folio_core::{Allocation, AssetResult, Optimizer};
use folio_md::{provider_by_name, HttpClient, MarketInfoProvider, PriceKind};
use table::{Align, Table};

/// Relative spread assumed when no ticker quotes both sides.
const DEFAULT_REL_SPREAD: f64 = 0.05 / 100.0;

#[derive(Parser)]
#[command(name = "folio", version, about = "Portfolio rebalancing optimizer")]
struct Cli {
    /// Allocation config file
    config: Option<PathBuf>,

    /// HTTP(S) or SOCKS proxy for market data requests
    proxy: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let Some(config) = cli.config else {
        bail!("config file was not specified");
    };
    println!("Config: {}", config.display());
    if let Some(proxy) = &cli.proxy {
        println!("Proxy: {proxy}");
    }

    let allocation = Allocation::load(&config)
        .with_context(|| format!("failed to load config '{}'", config.display()))?;

    println!(
        "Model: Least {}",
        if allocation.use_least_squares() {
            "Squares Approximation"
        } else {
            "Absolute Deviations"
        }
    );

    let tickers: Vec<String> = allocation
        .assets()
        .iter()
        .map(|asset| asset.ticker.clone())
        .collect();

    let mut provider = provider_by_name(allocation.provider_name(), allocation.provider_token())?;
    println!("Provider: {}", allocation.provider_name());

    let http = HttpClient::new(cli.proxy.as_deref())?;
    provider.retrieve(&tickers, &http)?;

    for ticker in &tickers {
        if provider.price(ticker, PriceKind::Last).is_none() {
            bail!("failed to retrieve information about: {ticker}");
        }
    }

    println!("Assets info:");
    for ticker in &tickers {
        let name = provider.asset_name(ticker).unwrap_or_default();
        println!("  {ticker}\t{name}");
    }

    let avg_rel_spread = average_relative_spread(provider.as_ref(), &tickers);

    let have_all_asks = Cell::new(true);
    let rates = |ticker: &str| -> (f64, f64) {
        let bid = provider
            .price(ticker, PriceKind::Bid)
            .or_else(|| provider.price(ticker, PriceKind::Last))
            .expect("every ticker has a last price");
        match provider.price(ticker, PriceKind::Ask) {
            Some(ask) if ask > bid => (bid, ask),
            _ => {
                have_all_asks.set(false);
                (bid, bid + (bid * avg_rel_spread).max(0.01))
            }
        }
    };

    let mut optimizer = Optimizer::new();
    let status_width = optimize_with_status(&mut optimizer, &allocation, &rates);
    println!("{}", " ".repeat(status_width));

    let rows = collect_rows(&allocation, &optimizer, provider.as_ref(), have_all_asks.get());
    print!("{}", render_report(&rows, &optimizer));

    if !have_all_asks.get() {
        println!();
        println!("(*) Approximating value (not from the Market)");
    }

    print_strategy(rows);
    Ok(())
}

/// Average (ask - bid) / bid over tickers quoting both sides.
fn average_relative_spread(provider: &dyn MarketInfoProvider, tickers: &[String]) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for ticker in tickers {
        if let (Some(bid), Some(ask)) = (
            provider.price(ticker, PriceKind::Bid),
            provider.price(ticker, PriceKind::Ask),
        ) {
            if bid > 0.0 && ask > bid {
                total += (ask - bid) / bid;
                count += 1;
            }
        }
    }
    if count > 0 {
        total / count as f64
    } else {
        DEFAULT_REL_SPREAD
    }
}

/// Run the optimizer, painting a throttled one-line status. Returns the
/// widest status line painted so the caller can clear it.
fn optimize_with_status<R>(optimizer: &mut Optimizer, allocation: &Allocation, rates: R) -> usize
where
    R: Fn(&str) -> (f64, f64),
{
    let mut last_fraction = 0.0f64;
    let mut last_paint = Instant::now();
    let mut max_width = 0usize;

    optimizer.optimize_with(allocation, rates, |iteration, nodes, fraction| {
        let now = Instant::now();
        if now.duration_since(last_paint) > Duration::from_millis(100)
            || fraction - last_fraction > 0.5
        {
            let bar: String = (0..20)
                .map(|slot| if (slot as f64) < 20.0 * fraction { '#' } else { '.' })
                .collect();
            let mut line = format!(
                "Iteration: {iteration}      Nodes: {nodes:4}      \
                 Iteration progress: [{bar}] {:.0}%",
                fraction * 100.0
            );
            while line.len() < max_width {
                line.push(' ');
            }
            max_width = max_width.max(line.len());
            print!("{line}\r");
            let _ = io::stdout().flush();

            last_fraction = fraction;
            last_paint = now;
        }
        true
    });

    max_width
}

struct Row {
    result: AssetResult,
    is_cash: bool,
    ask_is_valid: bool,
    /// IOPV premium over the last price, where published.
    iopv: Option<f64>,
    /// Target value and whether it is a percentage; `None` when unset.
    target: Option<(f64, bool)>,
    can_buy: bool,
    can_sell: bool,
}

fn collect_rows(
    allocation: &Allocation,
    optimizer: &Optimizer,
    provider: &dyn MarketInfoProvider,
    have_all_asks: bool,
) -> Vec<Row> {
    let mut rows = Vec::with_capacity(allocation.assets().len() + 1);

    for asset in allocation.assets() {
        let result = optimizer.result(&asset.ticker).clone();

        let ask_is_valid = provider
            .price(&asset.ticker, PriceKind::Ask)
            .map_or(false, |ask| ask == result.ask);
        assert!(ask_is_valid || !have_all_asks);

        let iopv = provider.price(&asset.ticker, PriceKind::Iopv).map(|iopv| {
            let last = provider
                .price(&asset.ticker, PriceKind::Last)
                .expect("every ticker has a last price");
            iopv - last
        });

        rows.push(Row {
            result,
            is_cash: false,
            ask_is_valid,
            iopv,
            target: Some((asset.target, asset.target_in_percents)),
            can_buy: asset.can_buy,
            can_sell: asset.can_sell,
        });
    }

    let mut cash = optimizer.cash_result().clone();
    cash.ticker = "Cash".to_string();
    rows.push(Row {
        result: cash,
        is_cash: true,
        ask_is_valid: true,
        iopv: None,
        target: allocation
            .has_cash_target()
            .then(|| (allocation.cash_target(), allocation.cash_target_in_percents())),
        can_buy: false,
        can_sell: false,
    });

    rows
}

fn money(value: f64) -> String {
    format!("${value:.2}")
}

fn shares(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

fn render_report(rows: &[Row], optimizer: &Optimizer) -> String {
    let have_iopvs = rows.iter().any(|row| row.iopv.is_some());

    // Asset, bid, ask, [iopv,] source value/shares/%, change,
    // result value/shares/%, target, buy, sell, fee, fee share.
    let columns = if have_iopvs { 16 } else { 15 };
    let iopv_shift = usize::from(have_iopvs);
    let col = |base: usize| if base >= 3 { base + iopv_shift } else { base };

    let mut table = Table::new(columns);

    let header = table.add_row();
    table.set(header, 0, "Asset", Align::Center);
    table.set(header, 1, "Bid", Align::Center);
    table.set(header, 2, "Ask", Align::Center);
    if have_iopvs {
        table.set(header, 3, "IOPV", Align::Center);
    }
    table.set(header, col(3), "Source", Align::Center);
    table.set(header, col(6), "Change", Align::Center);
    table.set(header, col(7), "Result", Align::Center);
    table.set(header, col(10), "Target", Align::Center);
    table.set(header, col(11), "Buy", Align::Center);
    table.set(header, col(12), "Sell", Align::Center);
    table.set(header, col(13), "Commission", Align::Center);
    table.rule_after(header);

    for bar in [col(3), col(6), col(7), col(10), col(13)] {
        table.bar_before(bar);
    }

    let mut total_have = 0.0;
    let mut total_result = 0.0;
    let mut total_commission = 0.0;
    let mut total_sum = 0.0;

    for row in rows {
        let r = &row.result;
        let line = table.add_row();

        table.set(line, 0, r.ticker.clone(), Align::Left);
        table.set(line, 1, money(r.bid), Align::Right);
        let ask_mark = if row.ask_is_valid { "" } else { "*" };
        table.set(line, 2, format!("{}{ask_mark}", money(r.ask)), Align::Right);
        if have_iopvs {
            let text = match row.iopv {
                Some(delta) if delta > 0.0 => format!("+${delta:.2}"),
                Some(delta) => format!("${delta:.2}"),
                None => String::new(),
            };
            table.set(line, 3, text, Align::Right);
        }

        let have = r.have * r.bid;
        total_have += have;
        table.set(line, col(3), money(have), Align::Right);
        if !row.is_cash {
            table.set(line, col(4), shares(r.have), Align::Right);
        }
        if r.in_percents {
            table.set(line, col(5), format!("{:.1}%", r.source_percents), Align::Right);
        }

        if r.change != 0.0 {
            let text = if row.is_cash {
                if r.change > 0.0 {
                    format!("+{}", money(r.change))
                } else {
                    format!("-{}", money(-r.change))
                }
            } else if r.change > 0.0 {
                format!("+{}", shares(r.change))
            } else {
                shares(r.change)
            };
            table.set(line, col(6), text, Align::Right);
        }

        let result = r.result * r.bid;
        total_result += result;
        table.set(line, col(7), money(result), Align::Right);
        if !row.is_cash {
            table.set(line, col(8), shares(r.result), Align::Right);
        }
        if r.in_percents {
            table.set(line, col(9), format!("{:.1}%", r.percents), Align::Right);
        }

        if let Some((target, in_percents)) = row.target {
            let text = if in_percents {
                format!("{target:.1}%")
            } else {
                shares(target)
            };
            table.set(line, col(10), text, Align::Right);
        }

        if !row.is_cash {
            table.set(line, col(11), if row.can_buy { "Yes" } else { "No" }, Align::Left);
            table.set(line, col(12), if row.can_sell { "Yes" } else { "No" }, Align::Left);
        }

        let deal_sum = r.change * if r.change > 0.0 { r.ask } else { -r.bid };
        total_sum += deal_sum;
        total_commission += r.commission;
        if r.commission != 0.0 {
            table.set(line, col(13), money(r.commission), Align::Right);
            let share = r.commission * 100.0 / (r.commission + deal_sum);
            table.set(line, col(14), format!("({share:.1}%)"), Align::Left);
        }

        if row.is_cash {
            table.rule_after(line - 1);
            table.rule_after(line);
        }
    }

    let totals = table.add_row();
    table.set(totals, 0, "Total (average deviation)", Align::Left);
    table.set(totals, col(3), money(total_have), Align::Right);
    table.set(
        totals,
        col(4),
        format!("({:.1})", optimizer.source_quality().stddev),
        Align::Right,
    );
    table.set(totals, col(7), money(total_result), Align::Right);
    table.set(
        totals,
        col(8),
        format!("({:.1})", optimizer.result_quality().stddev),
        Align::Right,
    );

    let spread = total_result + total_commission - total_have;
    if spread < 0.0 {
        table.set(totals, col(6), format!("-{}", money(-spread)), Align::Right);
    }
    if total_commission > 0.0 {
        table.set(totals, col(13), money(total_commission), Align::Right);
        if total_commission + total_sum > 0.0 {
            let share = total_commission * 100.0 / (total_commission + total_sum);
            table.set(totals, col(14), format!("({share:.1}%)"), Align::Left);
        }
    }

    table.render()
}

/// Deal ordering: sells before buys; sells by IOPV premium (richest first)
/// falling back to dollar impact, buys by ask price descending.
fn deal_precedes(r1: &Row, r2: &Row) -> bool {
    let sign = |row: &Row| -> i32 {
        if row.result.change < 0.0 {
            -1
        } else if row.result.change > 0.0 {
            1
        } else {
            0
        }
    };
    let (s1, s2) = (sign(r1), sign(r2));

    if s1 == -1 && s2 == -1 {
        if let (Some(p1), Some(p2)) = (r1.iopv, r2.iopv) {
            return p1 > p2;
        }
        if r1.iopv.is_some_and(|p| p > 0.0) {
            return true;
        }
        if r2.iopv.is_some_and(|p| p > 0.0) {
            return false;
        }
        if r1.iopv.is_some_and(|p| p < 0.0) {
            return false;
        }
        if r2.iopv.is_some_and(|p| p < 0.0) {
            return true;
        }
        return r1.result.change * r1.result.bid < r2.result.change * r2.result.bid;
    }

    if s1 == 1 && s2 == 1 {
        return r1.result.ask > r2.result.ask;
    }

    if s1 == 0 {
        return false;
    }
    if s2 == 0 {
        return true;
    }
    s1 < s2
}

fn print_strategy(mut rows: Vec<Row>) {
    rows.pop(); // cash row takes no market deal
    rows.sort_by(|r1, r2| {
        if deal_precedes(r1, r2) {
            std::cmp::Ordering::Less
        } else if deal_precedes(r2, r1) {
            std::cmp::Ordering::Greater
        } else {
            std::cmp::Ordering::Equal
        }
    });

    let mut printed = 0usize;
    for row in &rows {
        let r = &row.result;
        if r.change == 0.0 {
            break;
        }

        if printed == 0 {
            println!();
            println!("Rebalancing strategy:");
        }
        printed += 1;

        let (verb, count, price) = if r.change > 0.0 {
            ("Buy", r.change as i64, r.ask)
        } else {
            ("Sell", -r.change as i64, r.bid)
        };
        let plural = if count > 1 { "shares" } else { "share" };
        println!(
            "  {printed}. {verb} {count} {plural} of {}, market price is ${price}, \
             total deal sum is ${:.2}",
            r.ticker,
            price * count as f64
        );
    }
}
