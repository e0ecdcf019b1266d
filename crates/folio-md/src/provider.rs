//! Provider boundary: the trait every market-information source implements
//! and the name-based factory the CLI selects providers with.

use std::fmt;

use crate::alphavantage::AlphaVantage;
use crate::http::HttpClient;
use crate::iex::IexCloud;
use crate::yahoo::YahooFinance;

/// Which quoted price to look up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceKind {
    Last,
    Bid,
    Ask,
    /// Indicative optimized portfolio value, where the source publishes it.
    Iopv,
}

/// Errors from providers and the HTTP layer.
#[derive(Debug)]
pub enum MdError {
    /// Network or transport failure.
    Transport(String),
    /// A response payload could not be decoded.
    Decode(String),
    /// No provider is registered under the requested name.
    UnknownProvider(String),
    /// The requested provider requires an API token and none was supplied.
    MissingToken(String),
}

impl fmt::Display for MdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MdError::Transport(msg) => write!(f, "transport error: {msg}"),
            MdError::Decode(msg) => write!(f, "decode error: {msg}"),
            MdError::UnknownProvider(name) => write!(f, "unknown provider: {name}"),
            MdError::MissingToken(name) => {
                write!(f, "API token was not specified (required for {name})")
            }
        }
    }
}

impl std::error::Error for MdError {}

/// A source of asset names and prices.
///
/// Object-safe so callers can hold a `Box<dyn MarketInfoProvider>` chosen
/// at runtime from the config.
pub trait MarketInfoProvider {
    /// Human-readable provider name, as accepted by [`provider_by_name`].
    fn name(&self) -> &'static str;

    /// Download quotes for `tickers`, replacing any previous snapshot.
    fn retrieve(&mut self, tickers: &[String], http: &HttpClient) -> Result<(), MdError>;

    /// Company/fund name for a retrieved ticker.
    fn asset_name(&self, ticker: &str) -> Option<String>;

    /// A quoted price, if the upstream reported it positive.
    fn price(&self, ticker: &str, kind: PriceKind) -> Option<f64>;
}

/// Select a provider by its (case-insensitive) configured name.
pub fn provider_by_name(
    name: &str,
    token: &str,
) -> Result<Box<dyn MarketInfoProvider>, MdError> {
    match name.to_uppercase().as_str() {
        "YAHOO FINANCE" => Ok(Box::new(YahooFinance::new())),
        "IEX TRADING" | "IEX CLOUD" => {
            if token.is_empty() {
                return Err(MdError::MissingToken(name.to_string()));
            }
            Ok(Box::new(IexCloud::new(token)))
        }
        "ALPHA VANTAGE" => {
            if token.is_empty() {
                return Err(MdError::MissingToken(name.to_string()));
            }
            Ok(Box::new(AlphaVantage::new(token)))
        }
        _ => Err(MdError::UnknownProvider(name.to_string())),
    }
}
