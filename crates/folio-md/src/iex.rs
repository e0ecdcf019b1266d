//! IEX Cloud quotes via the per-ticker CSV endpoint.

use std::collections::BTreeMap;

use crate::http::HttpClient;
use crate::provider::{MarketInfoProvider, MdError, PriceKind};

#[derive(Default)]
struct Quote {
    name: String,
    last: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
}

/// IEX Cloud market data; requires an API token.
pub struct IexCloud {
    token: String,
    quotes: BTreeMap<String, Quote>,
}

impl IexCloud {
    pub fn new(token: &str) -> Self {
        IexCloud {
            token: token.to_string(),
            quotes: BTreeMap::new(),
        }
    }

    /// Parse one CSV quote document (header row + one value row) into the
    /// snapshot entry for `ticker`.
    fn ingest(&mut self, ticker: &str, body: &str) {
        let mut lines = body.lines();
        let headers: Vec<String> = lines.next().map(split_csv).unwrap_or_default();

        let mut fields: BTreeMap<String, String> = BTreeMap::new();
        for line in lines {
            for (header, value) in headers.iter().zip(split_csv(line)) {
                fields.insert(header.clone(), value);
            }
        }

        let quote = Quote {
            name: fields.get("companyName").cloned().unwrap_or_default(),
            last: fields.get("latestPrice").and_then(|v| parse_price(v)),
            bid: fields.get("iexBidPrice").and_then(|v| parse_price(v)),
            ask: fields.get("iexAskPrice").and_then(|v| parse_price(v)),
        };
        self.quotes.insert(ticker.to_string(), quote);
    }
}

impl MarketInfoProvider for IexCloud {
    fn name(&self) -> &'static str {
        "IEX Cloud"
    }

    fn retrieve(&mut self, tickers: &[String], http: &HttpClient) -> Result<(), MdError> {
        self.quotes.clear();
        for ticker in tickers {
            let url = format!(
                "https://cloud.iexapis.com/v1/stock/{ticker}/quote?format=csv&token={}",
                self.token
            );
            let body = http.get(&url)?;
            self.ingest(ticker, &body);
        }
        Ok(())
    }

    fn asset_name(&self, ticker: &str) -> Option<String> {
        let quote = self.quotes.get(ticker)?;
        Some(quote.name.clone())
    }

    fn price(&self, ticker: &str, kind: PriceKind) -> Option<f64> {
        let quote = self.quotes.get(ticker)?;
        match kind {
            PriceKind::Last => quote.last,
            PriceKind::Bid => quote.bid,
            PriceKind::Ask => quote.ask,
            PriceKind::Iopv => None,
        }
    }
}

/// A price is only valid when the whole field parses and is positive.
fn parse_price(field: &str) -> Option<f64> {
    field.parse().ok().filter(|&p: &f64| p > 0.0)
}

/// Split one CSV line, honoring double-quoted fields (quotes may contain
/// commas; embedded escapes are not used by this endpoint).
fn split_csv(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = line;

    loop {
        if let Some(quoted) = rest.strip_prefix('"') {
            let Some(end) = quoted.find('"') else {
                parts.push(quoted.to_string());
                break;
            };
            parts.push(quoted[..end].to_string());
            match quoted[end + 1..].strip_prefix(',') {
                Some(after) => rest = after,
                None => break,
            }
        } else {
            match rest.split_once(',') {
                Some((field, after)) => {
                    parts.push(field.to_string());
                    rest = after;
                }
                None => {
                    parts.push(rest.to_string());
                    break;
                }
            }
        }
    }

    parts
}
