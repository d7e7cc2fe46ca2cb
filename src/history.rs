//! Trade history: fetch one page, rebuild its events, resolve vanity
//! partners, and attach continuation data.

use chrono::{Datelike, Utc};
use scraper::Html;
use tracing::{debug, info};
use url::Url;

use crate::error::Result;
use crate::fetch::PageFetcher;
use crate::paging::{self, HistoryPosition, PagingProtocol};
use crate::resolver::{self, VanityQueue};
use crate::rows;
use crate::sidecar;
use crate::types::TradeHistory;

#[derive(Debug, Clone)]
pub struct TradeHistoryOptions {
    pub position: HistoryPosition,
    pub protocol: PagingProtocol,
    pub resolve_vanity_urls: bool,
    pub resolve_concurrency: usize,
    pub language: String,
}

impl Default for TradeHistoryOptions {
    fn default() -> Self {
        Self {
            position: HistoryPosition::Newest,
            protocol: PagingProtocol::Auto,
            resolve_vanity_urls: false,
            resolve_concurrency: 8,
            language: "english".to_string(),
        }
    }
}

/// `<profile>/inventoryhistory/?l=<lang>` plus the position parameters.
pub fn inventory_history_url(profile: &Url, options: &TradeHistoryOptions) -> Url {
    let mut url = profile.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(["inventoryhistory", ""]);
    }
    {
        let mut query = url.query_pairs_mut();
        query.clear().append_pair("l", &options.language);
        match &options.position {
            HistoryPosition::Newest => {}
            HistoryPosition::StartTime(t) => {
                query.append_pair("start_time", &t.to_string());
            }
            HistoryPosition::After {
                time,
                trade_id,
                previous,
            } => {
                query
                    .append_pair("after_time", time)
                    .append_pair("after_trade", trade_id);
                if *previous {
                    query.append_pair("prev", "1");
                }
            }
        }
    }
    url
}

/// Synchronous half of the pipeline: everything up to identity resolution.
///
/// Returns the page with partners unresolved, plus the distinct vanity
/// names that need a lookup (empty unless `resolve_vanity_urls` is set).
pub fn parse_trade_history(
    body: &str,
    options: &TradeHistoryOptions,
    implied_year: i32,
) -> Result<(TradeHistory, VanityQueue)> {
    let doc = Html::parse_document(body);
    let paging_row = sidecar::require_paging_row(&doc)?;
    let catalog = sidecar::description_catalog(body)?;
    let cursor = sidecar::history_cursor(body)?;
    let pagination = paging::extract(options.protocol, cursor.as_ref(), paging_row)?;

    let mut queue = VanityQueue::default();
    let mut events = Vec::new();
    for row in rows::history_rows(&doc) {
        let event = rows::build_event(row, &catalog, implied_year)?;
        if options.resolve_vanity_urls {
            queue.push_partner(&event.partner);
        }
        events.push(event);
    }

    let start_time = events.first().map(|e| e.date.timestamp().to_string());
    debug!("Parsed {} event(s), {} vanity name(s) queued", events.len(), queue.names().len());

    Ok((
        TradeHistory {
            events,
            pagination,
            start_time,
        },
        queue,
    ))
}

/// Fetch and fully assemble one page of trade history.
pub async fn get_trade_history<F>(
    fetcher: &F,
    profile: &Url,
    options: &TradeHistoryOptions,
) -> Result<TradeHistory>
where
    F: PageFetcher + ?Sized,
{
    let url = inventory_history_url(profile, options);
    let body = fetcher.get_text(&url).await?;
    let (mut history, queue) = parse_trade_history(&body, options, Utc::now().year())?;

    let resolutions = resolver::resolve_all(fetcher, &queue, options.resolve_concurrency).await?;
    let partners = history.events.iter_mut().map(|e| &mut e.partner);
    let filled = resolver::back_fill(partners, &resolutions);
    if filled > 0 {
        info!("Back-filled {filled} partner SteamID(s)");
    }

    Ok(history)
}
