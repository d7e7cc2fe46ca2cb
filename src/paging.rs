//! Continuation data for trade history. Two protocols exist upstream: an
//! opaque `g_historyCursor` object, and previous/next links carrying
//! explicit `after_time`/`after_trade` boundaries.

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use serde_json::Value;
use url::Url;

use crate::COMMUNITY_BASE;
use crate::error::{HistoryError, Result};
use crate::types::{Boundaries, Pagination};

static PAGING_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static BASE_URL: LazyLock<Url> = LazyLock::new(|| Url::parse(COMMUNITY_BASE).unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PagingProtocol {
    /// Use the cursor when the page carries one, else the paging links.
    #[default]
    Auto,
    Cursor,
    Boundary,
}

/// Where to start reading trade history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HistoryPosition {
    #[default]
    Newest,
    /// Cursor protocol: events at or before this epoch second.
    StartTime(i64),
    /// Boundary protocol: events after (or, with `previous`, before) a trade.
    After {
        time: String,
        trade_id: String,
        previous: bool,
    },
}

/// Forward cursor from a decoded `g_historyCursor`. A null cursor, or one
/// without a `time`, means there is no further history.
pub fn cursor_from_payload(payload: &Value) -> Option<String> {
    match payload.get("time")? {
        Value::Number(n) if n.as_u64() != Some(0) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() && s != "0" => Some(s.clone()),
        _ => None,
    }
}

/// Read previous/next boundaries from the anchors in the paging row.
pub fn boundaries(paging_row: ElementRef<'_>) -> Boundaries {
    let mut out = Boundaries::default();
    for link in paging_row.select(&PAGING_LINK) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Ok(url) = BASE_URL.join(href) else {
            continue;
        };

        let mut time = None;
        let mut trade = None;
        let mut previous = false;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "after_time" => time = Some(value.into_owned()),
                "after_trade" => trade = Some(value.into_owned()),
                "prev" => previous = value == "1",
                _ => {}
            }
        }
        if time.is_none() && trade.is_none() {
            continue;
        }

        if previous {
            out.first_trade_time = time;
            out.first_trade_id = trade;
        } else {
            out.last_trade_time = time;
            out.last_trade_id = trade;
        }
    }
    out
}

/// Select the protocol for this page and extract its continuation data.
///
/// `cursor` is the decoded `g_historyCursor`, `None` when the page has no
/// such assignment.
pub fn extract(
    protocol: PagingProtocol,
    cursor: Option<&Value>,
    paging_row: ElementRef<'_>,
) -> Result<Pagination> {
    match (protocol, cursor) {
        (PagingProtocol::Auto | PagingProtocol::Cursor, Some(payload)) => Ok(Pagination::Cursor {
            cursor: cursor_from_payload(payload),
        }),
        (PagingProtocol::Cursor, None) => {
            Err(HistoryError::malformed_page("no history cursor found"))
        }
        (PagingProtocol::Auto | PagingProtocol::Boundary, None)
        | (PagingProtocol::Boundary, Some(_)) => Ok(Pagination::Boundary(boundaries(paging_row))),
    }
}

/// Position of the page after this one, if there is one.
pub fn next_position(pagination: &Pagination) -> Option<HistoryPosition> {
    match pagination {
        Pagination::Cursor { cursor } => cursor
            .as_deref()
            .and_then(|c| c.parse().ok())
            .map(HistoryPosition::StartTime),
        Pagination::Boundary(b) => match (&b.last_trade_time, &b.last_trade_id) {
            (Some(time), Some(trade_id)) => Some(HistoryPosition::After {
                time: time.clone(),
                trade_id: trade_id.clone(),
                previous: false,
            }),
            _ => None,
        },
    }
}
