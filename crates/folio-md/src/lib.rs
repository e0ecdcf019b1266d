//! folio-md
//!
//! Market-information boundary: the [`MarketInfoProvider`] trait, concrete
//! providers (Yahoo Finance, IEX Cloud, Alpha Vantage) and the blocking
//! [`HttpClient`] they download through.
//!
//! Providers fetch everything up front with [`MarketInfoProvider::retrieve`]
//! and answer name/price lookups from the snapshot; a price is only
//! reported when the upstream actually quoted it (and quoted it positive).

mod alphavantage;
mod http;
mod iex;
mod provider;
mod yahoo;

pub use alphavantage::AlphaVantage;
pub use http::HttpClient;
pub use iex::IexCloud;
pub use provider::{provider_by_name, MarketInfoProvider, MdError, PriceKind};
pub use yahoo::YahooFinance;
