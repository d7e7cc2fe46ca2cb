//! Community Market: personal market history and the list of market apps.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::error::{HistoryError, Result};
use crate::fetch::{PageFetcher, community_url};
use crate::resolver::{self, VanityQueue};
use crate::rows::{own_text, partner_from_link, text_of};
use crate::sidecar::MarketEnvelope;
use crate::types::{Counterparty, GainOrLoss, ListingImage, MarketEvent, MarketHistory, Partner};

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

static ROW: LazyLock<Selector> = LazyLock::new(|| selector(".market_listing_row"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| selector(".market_listing_price"));
static WHO: LazyLock<Selector> = LazyLock::new(|| selector(".market_listing_whoactedwith"));
static WHO_LINK: LazyLock<Selector> = LazyLock::new(|| selector(".market_listing_whoactedwith a"));
static WHO_AVATAR: LazyLock<Selector> =
    LazyLock::new(|| selector(".market_listing_whoactedwith img"));
static WHO_NAME: LazyLock<Selector> =
    LazyLock::new(|| selector(".market_listing_whoactedwith_name_block"));
static LISTED_DATE: LazyLock<Selector> = LazyLock::new(|| selector(".market_listing_listed_date"));
static ITEM_NAME: LazyLock<Selector> = LazyLock::new(|| selector(".market_listing_item_name"));
static GAIN_OR_LOSS: LazyLock<Selector> = LazyLock::new(|| selector(".market_listing_gainorloss"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img[id]"));
static APP_GROUP: LazyLock<Selector> =
    LazyLock::new(|| selector(".market_search_game_button_group"));
static APP_BUTTON: LazyLock<Selector> = LazyLock::new(|| selector("a.game_button"));
static APP_NAME: LazyLock<Selector> = LazyLock::new(|| selector(".game_button_game_name"));

static SRCSET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(.*) 1x, (.*) 2x").unwrap());

const ROW_ID_PREFIX: &str = "history_row_";

#[derive(Debug, Clone)]
pub struct MarketHistoryOptions {
    pub count: Option<u32>,
    pub start: Option<u32>,
    pub resolve_vanity_urls: bool,
    pub resolve_concurrency: usize,
}

impl Default for MarketHistoryOptions {
    fn default() -> Self {
        Self {
            count: None,
            start: None,
            resolve_vanity_urls: false,
            resolve_concurrency: 8,
        }
    }
}

/// `https://steamcommunity.com/market/myhistory/render/?count=&start=`
pub fn market_history_url(options: &MarketHistoryOptions) -> Url {
    let mut url = community_url(&["market", "myhistory", "render", ""]);
    let mut pairs = Vec::new();
    if let Some(count) = options.count {
        pairs.push(("count", count.to_string()));
    }
    if let Some(start) = options.start {
        pairs.push(("start", start.to_string()));
    }
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    url
}

/// Locate the asset record a row's hover call points at.
///
/// The hover script holds one call per row:
/// `CreateItemHoverFromContainer( g_rgAssets, '<rowId>_name', <appid>, '<contextid>', '<key>', <assetid> );`
fn hover_asset(hovers: &str, assets: &Value, row_id: &str) -> Result<Option<Map<String, Value>>> {
    let pattern = format!(
        r"CreateItemHoverFromContainer\( g_rgAssets, '{}_name', (\d+), '(\d+)', '(\d+|class_\d+_instance_\d+|class_\d+)', (\d+) \);",
        regex::escape(row_id)
    );
    let re = Regex::new(&pattern)
        .map_err(|e| HistoryError::malformed_response(format!("bad row id {row_id:?}: {e}")))?;
    let Some(caps) = re.captures(hovers) else {
        return Ok(None);
    };
    let (app_id, context_id, key) = (&caps[1], &caps[2], &caps[3]);
    assets
        .get(app_id)
        .and_then(|ctx| ctx.get(context_id))
        .and_then(|keyed| keyed.get(key))
        .and_then(Value::as_object)
        .cloned()
        .map(Some)
        .ok_or_else(|| HistoryError::MissingDescription {
            app_id: app_id.to_owned(),
            key: format!("{context_id}/{key}"),
        })
}

fn required<'a>(row: ElementRef<'a>, selector: &Selector, what: &str) -> Result<ElementRef<'a>> {
    row.select(selector)
        .next()
        .ok_or_else(|| HistoryError::malformed_response(format!("market row has no {what}")))
}

fn listing_image(row: ElementRef<'_>, row_id: &str) -> Option<ListingImage> {
    let id = format!("{row_id}_image");
    let srcset = row
        .select(&IMAGE)
        .find(|img| img.value().attr("id") == Some(id.as_str()))?
        .value()
        .attr("srcset")?;
    let caps = SRCSET_RE.captures(srcset)?;
    Some(ListingImage {
        x1: caps[1].to_owned(),
        x2: caps[2].to_owned(),
    })
}

fn counterparty(row: ElementRef<'_>) -> Result<Counterparty> {
    let Some(link) = row.select(&WHO_LINK).next() else {
        return Ok(Counterparty {
            name: row.select(&WHO).next().map(text_of),
            ..Default::default()
        });
    };

    let partner = match link.value().attr("href") {
        Some(href) => partner_from_link(href)?,
        None => Partner::default(),
    };
    // The name block is "<label>:<br>NAME"; the name is its last own text.
    let name = row.select(&WHO_NAME).next().and_then(|block| {
        block
            .children()
            .filter_map(|node| node.value().as_text())
            .map(|text| text.trim())
            .filter(|text| !text.is_empty())
            .last()
            .map(str::to_owned)
    });
    Ok(Counterparty {
        name,
        avatar: row
            .select(&WHO_AVATAR)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::to_owned),
        partner,
    })
}

fn market_event(row: ElementRef<'_>, envelope: &MarketEnvelope) -> Result<MarketEvent> {
    let row_id = row
        .value()
        .attr("id")
        .ok_or_else(|| HistoryError::malformed_response("market row has no id"))?;

    let mut dates = row.select(&LISTED_DATE);
    let acted_on = dates
        .next()
        .ok_or_else(|| HistoryError::malformed_response("market row has no listed date"))?;
    let listed_on = dates.last().unwrap_or(acted_on);

    let event_type = match row.select(&GAIN_OR_LOSS).next().map(text_of).as_deref() {
        Some("+") => GainOrLoss::Gain,
        _ => GainOrLoss::Loss,
    };

    Ok(MarketEvent {
        id: row_id.strip_prefix(ROW_ID_PREFIX).unwrap_or(row_id).to_owned(),
        price: required(row, &PRICE, "price")?.inner_html().trim().to_owned(),
        with: counterparty(row)?,
        image: listing_image(row, row_id),
        acted_on: acted_on.inner_html().trim().to_owned(),
        listed_on: listed_on.inner_html().trim().to_owned(),
        name: required(row, &ITEM_NAME, "item name")?.inner_html(),
        event_type,
        asset: hover_asset(&envelope.hovers, &envelope.assets, row_id)?,
    })
}

/// Synchronous half of the market pipeline.
pub fn parse_market_history(
    body: &Value,
    resolve_vanity_urls: bool,
) -> Result<(MarketHistory, VanityQueue)> {
    let envelope = MarketEnvelope::from_json(body)?;
    let fragment = Html::parse_fragment(&envelope.results_html);

    let mut queue = VanityQueue::default();
    let mut events = Vec::new();
    for row in fragment.select(&ROW) {
        let event = market_event(row, &envelope)?;
        if resolve_vanity_urls {
            queue.push_partner(&event.with.partner);
        }
        events.push(event);
    }
    debug!("Parsed {} market event(s)", events.len());

    Ok((
        MarketHistory {
            events,
            pagesize: envelope.pagesize,
            total_count: envelope.total_count,
            start: envelope.start,
        },
        queue,
    ))
}

/// Fetch and assemble one page of the signed-in account's market history.
pub async fn get_market_history<F>(
    fetcher: &F,
    options: &MarketHistoryOptions,
) -> Result<MarketHistory>
where
    F: PageFetcher + ?Sized,
{
    let body = fetcher.get_text(&market_history_url(options)).await?;
    let json: Value = serde_json::from_str(&body).map_err(|source| HistoryError::InvalidPayload {
        what: "market history response",
        source,
    })?;
    let (mut history, queue) = parse_market_history(&json, options.resolve_vanity_urls)?;

    let resolutions = resolver::resolve_all(fetcher, &queue, options.resolve_concurrency).await?;
    let filled = resolver::back_fill(
        history.events.iter_mut().map(|e| &mut e.with.partner),
        &resolutions,
    );
    if filled > 0 {
        info!("Back-filled {filled} market partner SteamID(s)");
    }
    Ok(history)
}

/// Map of `appid -> app name` from the market front page.
pub fn parse_market_apps(body: &str) -> Result<BTreeMap<String, String>> {
    let doc = Html::parse_document(body);
    let group = doc
        .select(&APP_GROUP)
        .next()
        .ok_or_else(|| HistoryError::malformed_response("no market app list found"))?;

    let mut apps = BTreeMap::new();
    for button in group.select(&APP_BUTTON) {
        let Some(href) = button.value().attr("href") else {
            continue;
        };
        let app_id = href.split_once('=').map(|(_, id)| id).unwrap_or(href);
        let name = button.select(&APP_NAME).next().map(text_of).unwrap_or_else(|| own_text(button));
        apps.insert(app_id.to_owned(), name);
    }
    Ok(apps)
}

pub async fn get_market_apps<F>(fetcher: &F) -> Result<BTreeMap<String, String>>
where
    F: PageFetcher + ?Sized,
{
    let body = fetcher.get_text(&community_url(&["market", ""])).await?;
    parse_market_apps(&body)
}
