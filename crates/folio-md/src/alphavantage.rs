//! Alpha Vantage quotes: last price from GLOBAL_QUOTE, names from
//! SYMBOL_SEARCH. Bid/ask are not available on this API.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::http::HttpClient;
use crate::provider::{MarketInfoProvider, MdError, PriceKind};

struct Quote {
    name: String,
    last: f64,
}

/// Alpha Vantage market data; requires an API key.
pub struct AlphaVantage {
    apikey: String,
    quotes: BTreeMap<String, Quote>,
}

impl AlphaVantage {
    pub fn new(apikey: &str) -> Self {
        AlphaVantage {
            apikey: apikey.to_string(),
            quotes: BTreeMap::new(),
        }
    }

    /// Combine one GLOBAL_QUOTE and one SYMBOL_SEARCH payload for `ticker`.
    /// A ticker without a usable quote is skipped; a quote without a search
    /// match keeps the placeholder name.
    fn ingest(&mut self, ticker: &str, quote_body: &str, search_body: &str) {
        let Ok(quote) = serde_json::from_str::<Value>(quote_body) else {
            return;
        };
        let quote = &quote["Global Quote"];
        if quote["01. symbol"].as_str() != Some(ticker) {
            return;
        }
        let Some(last) = quote["05. price"].as_str().and_then(|p| p.parse::<f64>().ok()) else {
            return;
        };

        let mut name = "?".to_string();
        if let Ok(search) = serde_json::from_str::<Value>(search_body) {
            if let Some(matches) = search["bestMatches"].as_array() {
                for candidate in matches {
                    if candidate["1. symbol"].as_str() == Some(ticker) {
                        if let Some(found) = candidate["2. name"].as_str() {
                            name = found.to_string();
                        }
                        break;
                    }
                }
            }
        }

        self.quotes.insert(ticker.to_string(), Quote { name, last });
    }
}

impl MarketInfoProvider for AlphaVantage {
    fn name(&self) -> &'static str {
        "Alpha Vantage"
    }

    fn retrieve(&mut self, tickers: &[String], http: &HttpClient) -> Result<(), MdError> {
        self.quotes.clear();
        for ticker in tickers {
            let quote_body = http.get(&format!(
                "https://www.alphavantage.co/query?function=GLOBAL_QUOTE&symbol={ticker}&apikey={}",
                self.apikey
            ))?;
            let search_body = http.get(&format!(
                "https://www.alphavantage.co/query?function=SYMBOL_SEARCH&keywords={ticker}&apikey={}",
                self.apikey
            ))?;
            self.ingest(ticker, &quote_body, &search_body);
        }
        Ok(())
    }

    fn asset_name(&self, ticker: &str) -> Option<String> {
        Some(self.quotes.get(ticker)?.name.clone())
    }

    fn price(&self, ticker: &str, kind: PriceKind) -> Option<f64> {
        if kind != PriceKind::Last {
            return None;
        }
        Some(self.quotes.get(ticker)?.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTE: &str = r#"{
        "Global Quote": {
            "01. symbol": "O",
            "05. price": "56.4300"
        }
    }"#;

    const SEARCH: &str = r#"{
        "bestMatches": [
            { "1. symbol": "OHI", "2. name": "Omega Healthcare" },
            { "1. symbol": "O", "2. name": "Realty Income Corp" }
        ]
    }"#;

    #[test]
    fn quote_and_search_combine() {
        let mut av = AlphaVantage::new("k");
        av.ingest("O", QUOTE, SEARCH);
        assert_eq!(av.price("O", PriceKind::Last), Some(56.43));
        assert_eq!(av.asset_name("O").as_deref(), Some("Realty Income Corp"));
    }

    #[test]
    fn only_the_last_price_is_available() {
        let mut av = AlphaVantage::new("k");
        av.ingest("O", QUOTE, SEARCH);
        assert_eq!(av.price("O", PriceKind::Bid), None);
        assert_eq!(av.price("O", PriceKind::Ask), None);
        assert_eq!(av.price("O", PriceKind::Iopv), None);
    }

    #[test]
    fn symbol_mismatch_discards_the_quote() {
        let mut av = AlphaVantage::new("k");
        av.ingest("OHI", QUOTE, SEARCH);
        assert_eq!(av.price("OHI", PriceKind::Last), None);
    }

    #[test]
    fn missing_search_match_keeps_the_placeholder() {
        let mut av = AlphaVantage::new("k");
        av.ingest("O", QUOTE, r#"{"bestMatches": []}"#);
        assert_eq!(av.asset_name("O").as_deref(), Some("?"));
    }
}
