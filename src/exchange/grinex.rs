//! Grinex REST depth adapter.
//!
//! `GET <api_url>?market=usdtrub` returns the full order book. Each side is
//! sorted best-first by the exchange, so only index 0 is read. Prices arrive
//! as decimal strings.

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result, Side};
use crate::types::Rate;

use super::DepthSource;

/// Market pair requested from the depth endpoint.
pub const MARKET: &str = "usdtrub";

/// Grinex depth client.
pub struct Grinex {
    http: reqwest::Client,
    url: String,
}

impl Grinex {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl DepthSource for Grinex {
    async fn get_depth(&self) -> Result<Rate> {
        debug!(exchange = "grinex", url = %self.url, market = MARKET, "fetching depth");

        let body = self
            .http
            .get(&self.url)
            .query(&[("market", MARKET)])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let rate = parse_depth(&body, Utc::now())?;
        debug!(exchange = "grinex", ask = rate.ask(), bid = rate.bid(), "parsed depth");
        Ok(rate)
    }
}

/// One order book level. `volume`, `amount`, `factor` and `type` are sent
/// too but never read.
#[derive(Deserialize)]
struct DepthLevel<'a> {
    #[serde(borrow)]
    price: Cow<'a, str>,
}

/// A missing side decodes as empty and is reported as [`Error::EmptyDepth`].
#[derive(Deserialize)]
struct DepthResponse<'a> {
    #[serde(borrow, default)]
    asks: Vec<DepthLevel<'a>>,
    #[serde(borrow, default)]
    bids: Vec<DepthLevel<'a>>,
}

/// Decode a depth response body into a [`Rate`] stamped with `now`.
pub fn parse_depth(body: &[u8], now: DateTime<Utc>) -> Result<Rate> {
    let depth: DepthResponse<'_> = serde_json::from_slice(body)?;

    let (Some(best_ask), Some(best_bid)) = (depth.asks.first(), depth.bids.first()) else {
        return Err(Error::EmptyDepth);
    };

    let ask = parse_price(Side::Ask, &best_ask.price)?;
    let bid = parse_price(Side::Bid, &best_bid.price)?;
    Ok(Rate::new(ask, bid, now))
}

/// Quotes must be finite and strictly positive.
fn parse_price(side: Side, raw: &str) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(price) if price.is_finite() && price > 0.0 => Ok(price),
        _ => Err(Error::PriceParse {
            side,
            value: raw.to_owned(),
        }),
    }
}
