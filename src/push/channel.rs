//! Push channels.
//!
//! Each streaming widget feed has one [`Channel`]. The channel carries the
//! default URL pattern of the endpoints it keeps fresh; the classifier's
//! push-refreshed tier is built from this table, so the bridge can only
//! touch entries the classifier treats as push-refreshed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CacheError;

/// A streaming widget feed served by the push transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    /// Retail trader positioning (DMX).
    DmxPositioning,
    /// Retail sentiment summary and history.
    RetailSentiment,
    /// Currency strength meter.
    CurrencyStrength,
    /// Order flow / order book imbalance.
    OrderFlow,
    /// Economic calendar events.
    EconomicCalendar,
    /// Commitments of Traders report.
    CotReport,
    /// Headline news feed.
    NewsFeed,
}

impl Channel {
    /// Every channel, in classifier evaluation order.
    pub const ALL: [Channel; 7] = [
        Channel::DmxPositioning,
        Channel::RetailSentiment,
        Channel::CurrencyStrength,
        Channel::OrderFlow,
        Channel::EconomicCalendar,
        Channel::CotReport,
        Channel::NewsFeed,
    ];

    /// Wire name used by the push transport.
    pub fn name(self) -> &'static str {
        match self {
            Channel::DmxPositioning => "dmx-positioning",
            Channel::RetailSentiment => "retail-sentiment",
            Channel::CurrencyStrength => "currency-strength",
            Channel::OrderFlow => "order-flow",
            Channel::EconomicCalendar => "economic-calendar",
            Channel::CotReport => "cot-report",
            Channel::NewsFeed => "news-feed",
        }
    }

    /// Built-in URL pattern (regex) for this channel's endpoints.
    pub fn default_pattern(self) -> &'static str {
        match self {
            Channel::DmxPositioning => r"/api/retail-sentiment/dmx-positioning",
            Channel::RetailSentiment => r"/api/retail-sentiment/(summary|history)",
            Channel::CurrencyStrength => r"/api/currency-strength",
            Channel::OrderFlow => r"/api/order-flow",
            Channel::EconomicCalendar => r"/api/economic-calendar",
            Channel::CotReport => r"/api/cot-report",
            Channel::NewsFeed => r"/api/news",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| CacheError::UnknownChannel(s.to_string()))
    }
}
