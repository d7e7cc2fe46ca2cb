use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// 64-bit Steam account identity. Serialized as a decimal string so JSON
/// consumers do not lose precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SteamId(pub u64);

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SteamId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(SteamId)
    }
}

impl Serialize for SteamId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Catalog record for one class/instance pair. Kept opaque; only a few
/// well-known fields get typed accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Description(pub Map<String, Value>);

impl Description {
    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Steam encodes flags as either `1`/`0` or booleans depending on the page.
    fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
            Some(Value::String(s)) => s == "1" || s == "true",
            _ => false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn market_hash_name(&self) -> Option<&str> {
        self.str_field("market_hash_name")
    }

    pub fn item_type(&self) -> Option<&str> {
        self.str_field("type")
    }

    pub fn icon_url(&self) -> Option<&str> {
        self.str_field("icon_url")
    }

    pub fn tradable(&self) -> bool {
        self.flag("tradable")
    }

    pub fn marketable(&self) -> bool {
        self.flag("marketable")
    }
}

/// `appId -> "classId_instanceId" -> description`, built once per page.
#[derive(Debug, Clone, Default)]
pub struct DescriptionCatalog {
    pub apps: HashMap<String, HashMap<String, Description>>,
}

impl DescriptionCatalog {
    pub fn get(&self, app_id: &str, class_instance: &str) -> Option<&Description> {
        self.apps.get(app_id)?.get(class_instance)
    }

    pub fn is_empty(&self) -> bool {
        self.apps.values().all(HashMap::is_empty)
    }
}

/// One item reference merged with its catalog description.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDescriptor {
    pub app_id: String,
    pub context_id: String,
    pub class_id: String,
    pub instance_id: String,
    pub amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    pub description: Description,
}

/// Counterparty identity as found in a profile link.
///
/// A profile link yields either a numeric id or a vanity name, never both.
/// Resolution later fills `steam_id` and leaves the vanity in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partner {
    #[serde(rename = "partnerSteamID")]
    pub steam_id: Option<SteamId>,
    #[serde(rename = "partnerVanityURL")]
    pub vanity_url: Option<String>,
}

impl Partner {
    /// Vanity name still waiting for a numeric identity.
    pub fn pending_vanity(&self) -> Option<&str> {
        match self.steam_id {
            Some(_) => None,
            None => self.vanity_url.as_deref(),
        }
    }
}

/// One reconstructed trade-history transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub on_hold: bool,
    pub date: DateTime<Utc>,
    pub partner_name: Option<String>,
    #[serde(flatten)]
    pub partner: Partner,
    pub plus_events: Vec<ItemDescriptor>,
    pub minus_events: Vec<ItemDescriptor>,
}

/// Explicit paging boundaries read from the previous/next links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Boundaries {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_trade_time: Option<String>,
    #[serde(rename = "firstTradeID", skip_serializing_if = "Option::is_none")]
    pub first_trade_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trade_time: Option<String>,
    #[serde(rename = "lastTradeID", skip_serializing_if = "Option::is_none")]
    pub last_trade_id: Option<String>,
}

/// Continuation data for the next trade-history request. Exactly one
/// protocol applies per page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Pagination {
    /// `None` means there is no further history.
    Cursor { cursor: Option<String> },
    Boundary(Boundaries),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeHistory {
    pub events: Vec<Event>,
    #[serde(flatten)]
    pub pagination: Pagination,
    /// Epoch seconds of the newest event on the page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VanityResolution {
    #[serde(rename = "vanityURL")]
    pub vanity_url: String,
    #[serde(rename = "steamID")]
    pub steam_id: SteamId,
}

// ── Market history ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GainOrLoss {
    Gain,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingImage {
    #[serde(rename = "1x")]
    pub x1: String,
    #[serde(rename = "2x")]
    pub x2: String,
}

/// Who the market action was with: either a profile or a plain label
/// such as "Buyer" / "Listing created".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counterparty {
    pub name: Option<String>,
    #[serde(rename = "img", skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub partner: Partner,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketEvent {
    pub id: String,
    pub price: String,
    pub with: Counterparty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ListingImage>,
    pub acted_on: String,
    pub listed_on: String,
    pub name: String,
    pub event_type: GainOrLoss,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketHistory {
    pub events: Vec<MarketEvent>,
    pub pagesize: u64,
    pub total_count: u64,
    pub start: u64,
}
