//! The allocation config: INI-style sections describing current positions,
//! targets, commissions, trade permissions, cash and global options.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use tracing::debug;

/// Errors produced while loading an allocation config.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io {
        path: String,
        source: std::io::Error,
    },
    /// A line could not be understood. `line` is 1-based.
    Parse { line: usize, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => write!(f, "cannot read '{path}': {source}"),
            ConfigError::Parse { line, message } => write!(f, "line {line}: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { .. } => None,
        }
    }
}

/// One asset of the allocation. Created by the first mention of its ticker
/// in `[have]`, `[want]`, `[commission]` or `[trade]`.
#[derive(Clone, Debug)]
pub struct Asset {
    pub ticker: String,
    /// Current share count; fractional positions are allowed.
    pub have: f64,
    /// Desired position: absolute shares, or percent of portfolio value
    /// when `target_in_percents` is set.
    pub target: f64,
    pub target_in_percents: bool,
    /// Fixed commission charged when this asset trades.
    pub commission: f64,
    pub can_buy: bool,
    pub can_sell: bool,
}

impl Asset {
    fn new(ticker: String) -> Self {
        Asset {
            ticker,
            have: 0.0,
            target: 0.0,
            target_in_percents: false,
            commission: 0.0,
            can_buy: true,
            can_sell: true,
        }
    }
}

/// The parsed allocation. Constructed once from config text and read-only
/// afterwards; asset order is the order of first mention.
#[derive(Clone, Debug)]
pub struct Allocation {
    assets: Vec<Asset>,

    cash: f64,
    cash_target: f64,
    cash_target_in_percents: bool,
    cash_target_set: bool,

    use_all_cash: bool,
    max_deals: usize,

    use_least_squares: bool,
    provider_name: String,
    provider_token: String,
}

impl Default for Allocation {
    fn default() -> Self {
        Allocation {
            assets: Vec::new(),
            cash: 0.0,
            cash_target: 0.0,
            cash_target_in_percents: false,
            cash_target_set: false,
            use_all_cash: false,
            max_deals: 0,
            use_least_squares: true,
            provider_name: "YAHOO FINANCE".to_string(),
            provider_token: String::new(),
        }
    }
}

impl Allocation {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse config text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Parser::default().run(text)
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Starting cash after withdrawals; may be negative.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn has_cash_target(&self) -> bool {
        self.cash_target_set
    }

    pub fn cash_target(&self) -> f64 {
        self.cash_target
    }

    pub fn cash_target_in_percents(&self) -> bool {
        self.cash_target_in_percents
    }

    /// When set, the plan must not leave enough cash to buy one more share
    /// of any buyable asset.
    pub fn use_all_cash(&self) -> bool {
        self.use_all_cash
    }

    /// Maximum number of assets allowed to trade; 0 means unlimited.
    pub fn max_deals(&self) -> usize {
        self.max_deals
    }

    /// True for the least-squares objective, false for least absolute
    /// deviations.
    pub fn use_least_squares(&self) -> bool {
        self.use_least_squares
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn provider_token(&self) -> &str {
        &self.provider_token
    }

    fn asset_mut(&mut self, ticker: &str) -> &mut Asset {
        if let Some(at) = self.assets.iter().position(|a| a.ticker == ticker) {
            return &mut self.assets[at];
        }
        self.assets.push(Asset::new(ticker.to_string()));
        self.assets.last_mut().expect("just pushed")
    }
}

#[derive(Default)]
struct Parser {
    allocation: Allocation,
    default_commission: f64,
    withdraw: f64,
    commission_set: BTreeSet<String>,
}

impl Parser {
    fn run(mut self, text: &str) -> Result<Allocation, ConfigError> {
        let mut section = String::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| parse_error(line, "malformed section header"))?;
                section = name.trim().to_uppercase();
                match section.as_str() {
                    "HAVE" | "WANT" | "COMMISSION" | "TRADE" | "CASH" | "OPTIONS" => {}
                    other => {
                        return Err(parse_error(line, format!("unknown section '[{other}]'")))
                    }
                }
                continue;
            }

            let (key, value) = trimmed
                .split_once('=')
                .ok_or_else(|| parse_error(line, "expected 'key = value'"))?;
            let key = key.trim().to_uppercase();
            let value = value.trim();

            match section.as_str() {
                "HAVE" => {
                    self.allocation.asset_mut(&key).have = number(value, line)?;
                }
                "WANT" => {
                    let (target, percents) = number_or_percent(value, line)?;
                    let asset = self.allocation.asset_mut(&key);
                    asset.target = target;
                    asset.target_in_percents = percents;
                }
                "COMMISSION" => {
                    self.allocation.asset_mut(&key).commission = number(value, line)?;
                    self.commission_set.insert(key);
                }
                "TRADE" => {
                    let asset = self.allocation.asset_mut(&key);
                    let (can_buy, can_sell) = match value.to_uppercase().as_str() {
                        "BUY" => (true, false),
                        "SELL" => (false, true),
                        "KEEP" => (false, false),
                        "TRADE" => (true, true),
                        other => {
                            return Err(parse_error(line, format!("unknown trade mode '{other}'")))
                        }
                    };
                    asset.can_buy = can_buy;
                    asset.can_sell = can_sell;
                }
                "CASH" => match key.as_str() {
                    "HAVE" => self.allocation.cash = number(value, line)?,
                    "WITHDRAW" => self.withdraw += number(value, line)?,
                    "WANT" => {
                        let (target, percents) = number_or_percent(value, line)?;
                        self.allocation.cash_target = target;
                        self.allocation.cash_target_in_percents = percents;
                        self.allocation.cash_target_set = true;
                    }
                    other => {
                        return Err(parse_error(line, format!("unknown key '{other}' in [cash]")))
                    }
                },
                "OPTIONS" => match key.as_str() {
                    "COMMISSION" => self.default_commission = number(value, line)?,
                    "NO MORE DEALS" | "USE ALL CASH" => {
                        self.allocation.use_all_cash = boolean(value, line)?
                    }
                    "MAX DEALS" => {
                        self.allocation.max_deals = value.parse().map_err(|_| {
                            parse_error(line, format!("invalid deal count '{value}'"))
                        })?
                    }
                    "MODEL" => {
                        self.allocation.use_least_squares = match value.to_uppercase().as_str() {
                            "LAD" => false,
                            "LSAPPROX" => true,
                            other => {
                                return Err(parse_error(
                                    line,
                                    format!("unknown model '{other}' (expected lad or lsapprox)"),
                                ))
                            }
                        }
                    }
                    "MARKET INFO PROVIDER" | "PROVIDER" => {
                        self.allocation.provider_name = value.to_string()
                    }
                    "API TOKEN" | "TOKEN" => self.allocation.provider_token = value.to_string(),
                    other => {
                        return Err(parse_error(
                            line,
                            format!("unknown key '{other}' in [options]"),
                        ))
                    }
                },
                _ => return Err(parse_error(line, "value outside of any section")),
            }
        }

        for asset in &mut self.allocation.assets {
            if !self.commission_set.contains(&asset.ticker) {
                asset.commission = self.default_commission;
            }
        }
        self.allocation.cash -= self.withdraw;

        debug!(
            assets = self.allocation.assets.len(),
            cash = self.allocation.cash,
            "allocation loaded"
        );
        Ok(self.allocation)
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> ConfigError {
    ConfigError::Parse {
        line,
        message: message.into(),
    }
}

/// Parse a number with an optional `%` suffix directly after the digits.
fn number_or_percent(value: &str, line: usize) -> Result<(f64, bool), ConfigError> {
    let (digits, percents) = match value.strip_suffix('%') {
        Some(rest) => (rest, true),
        None => (value, false),
    };
    let parsed = digits
        .parse()
        .map_err(|_| parse_error(line, format!("invalid number '{value}'")))?;
    Ok((parsed, percents))
}

/// Parse a number in a position where a percent suffix is not accepted.
fn number(value: &str, line: usize) -> Result<f64, ConfigError> {
    let (parsed, percents) = number_or_percent(value, line)?;
    if percents {
        return Err(parse_error(
            line,
            format!("'%' is not allowed here: '{value}'"),
        ));
    }
    Ok(parsed)
}

fn boolean(value: &str, line: usize) -> Result<bool, ConfigError> {
    match value.to_uppercase().as_str() {
        "TRUE" | "YES" | "1" => Ok(true),
        "FALSE" | "NO" | "0" => Ok(false),
        other => Err(parse_error(line, format!("invalid boolean '{other}'"))),
    }
}
