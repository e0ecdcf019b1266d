//! Yahoo Finance quotes via the batched v7 endpoint.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::http::HttpClient;
use crate::provider::{MarketInfoProvider, MdError, PriceKind};

/// Yahoo Finance market data. Requires no API token. For each ticker the
/// synthetic `^TICKER-IV` symbol is requested alongside to pick up the
/// fund's indicative optimized portfolio value where one is published.
#[derive(Default)]
pub struct YahooFinance {
    quotes: BTreeMap<String, Value>,
}

impl YahooFinance {
    pub fn new() -> Self {
        Self::default()
    }

    fn iopv_ticker(ticker: &str) -> String {
        format!("^{ticker}-IV")
    }

    /// Index a quote-response body by symbol. Entries without a symbol are
    /// skipped, as are malformed payloads; lookups then simply miss.
    fn ingest(&mut self, body: &str) {
        self.quotes.clear();

        let Ok(json) = serde_json::from_str::<Value>(body) else {
            return;
        };
        let Some(results) = json["quoteResponse"]["result"].as_array() else {
            return;
        };
        for quote in results {
            if let Some(symbol) = quote["symbol"].as_str() {
                self.quotes.insert(symbol.to_string(), quote.clone());
            }
        }
    }

    fn field(&self, ticker: &str, field: &str) -> Option<f64> {
        self.quotes.get(ticker)?[field].as_f64().filter(|&p| p > 0.0)
    }
}

impl MarketInfoProvider for YahooFinance {
    fn name(&self) -> &'static str {
        "Yahoo Finance"
    }

    fn retrieve(&mut self, tickers: &[String], http: &HttpClient) -> Result<(), MdError> {
        let mut symbols = String::new();
        for ticker in tickers {
            if !symbols.is_empty() {
                symbols.push(',');
            }
            symbols.push_str(ticker);
            symbols.push(',');
            symbols.push_str(&Self::iopv_ticker(ticker));
        }

        let url = format!(
            "https://query1.finance.yahoo.com/v7/finance/quote?\
             lang=en-US&region=US&corsDomain=finance.yahoo.com&symbols={symbols}"
        );
        let body = http.get(&url)?;
        self.ingest(&body);
        Ok(())
    }

    fn asset_name(&self, ticker: &str) -> Option<String> {
        self.quotes.get(ticker)?["shortName"]
            .as_str()
            .map(str::to_string)
    }

    fn price(&self, ticker: &str, kind: PriceKind) -> Option<f64> {
        match kind {
            PriceKind::Last => self.field(ticker, "regularMarketPrice"),
            PriceKind::Bid => self.field(ticker, "bid"),
            PriceKind::Ask => self.field(ticker, "ask"),
            PriceKind::Iopv => self.field(&Self::iopv_ticker(ticker), "regularMarketPrice"),
        }
    }
}
