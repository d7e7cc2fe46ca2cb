//! Trade-history rows: structural extraction, timestamp decoding and
//! counterparty links.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{HistoryError, Result};
use crate::items;
use crate::types::{DescriptionCatalog, Event, Partner, SteamId};

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".tradehistoryrow").unwrap());
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".tradehistory_event_description").unwrap());
static TIMESTAMP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".tradehistory_timestamp").unwrap());
static DATE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".tradehistory_date").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})(am|pm)\b").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{4}\b").unwrap());
static TRAILING_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)$").unwrap());

const HOLD_PHRASE: &str = "was placed on hold";
const PROFILE_MARKER: &str = "/profiles/";

/// Rendered dates, after the decoded clock and zone marker are appended.
const DATE_FORMATS: [&str; 4] = [
    "%b %d, %Y %H:%M:%S UTC",
    "%d %b, %Y %H:%M:%S UTC",
    "%b %d %Y %H:%M:%S UTC",
    "%d %b %Y %H:%M:%S UTC",
];

/// Every transaction row on the page, most recent first.
pub fn history_rows(doc: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    doc.select(&ROW)
}

/// Text of the element's own text nodes, ignoring child elements.
pub(crate) fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|node| node.value().as_text())
        .map(|text| &**text)
        .collect::<String>()
        .trim()
        .to_owned()
}

pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_owned()
}

/// Convert a `H:MM am|pm` clock into `HH:MM:00`.
pub fn decode_clock(raw: &str) -> Result<String> {
    let caps = CLOCK_RE
        .captures(raw)
        .ok_or_else(|| HistoryError::malformed_page(format!("unrecognized time {raw:?}")))?;
    let bad_clock = || HistoryError::malformed_page(format!("clock out of range {raw:?}"));
    let hour: u32 = caps[1].parse().map_err(|_| bad_clock())?;
    let minutes: u32 = caps[2].parse().map_err(|_| bad_clock())?;
    if !(1..=12).contains(&hour) || minutes > 59 {
        return Err(bad_clock());
    }
    let hour = match (hour, &caps[3]) {
        (12, "am") => 0,
        (h, "pm") if h < 12 => h + 12,
        (h, _) => h,
    };
    Ok(format!("{hour:02}:{minutes:02}:00"))
}

/// Combine a rendered date and 12-hour clock into an absolute timestamp.
///
/// The page renders both in the viewer's zone, which the markup does not
/// state; the result is read as UTC. Dates without a year (Steam omits it
/// for the current year) take `implied_year`.
pub fn decode_timestamp(date: &str, clock: &str, implied_year: i32) -> Result<DateTime<Utc>> {
    let time = decode_clock(clock)?;
    let date = date.trim();
    let dated = if YEAR_RE.is_match(date) {
        date.to_owned()
    } else {
        format!("{date}, {implied_year}")
    };
    let text = format!("{dated} {time} UTC");
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| HistoryError::malformed_page(format!("unrecognized date {date:?}")))
}

/// Read a counterparty profile link. `/profiles/<digits>` carries the
/// numeric identity directly; anything else ends in a vanity name.
pub fn partner_from_link(href: &str) -> Result<Partner> {
    let path = href.trim_end_matches('/');
    if href.contains(PROFILE_MARKER) {
        let id = TRAILING_DIGITS_RE
            .captures(path)
            .and_then(|caps| caps[1].parse().ok())
            .ok_or_else(|| HistoryError::malformed_page(format!("bad profile link {href:?}")))?;
        return Ok(Partner {
            steam_id: Some(SteamId(id)),
            vanity_url: None,
        });
    }
    let vanity = path
        .rsplit_once('/')
        .map(|(_, last)| last)
        .filter(|last| !last.is_empty())
        .ok_or_else(|| HistoryError::malformed_page(format!("bad profile link {href:?}")))?;
    Ok(Partner {
        steam_id: None,
        vanity_url: Some(vanity.to_owned()),
    })
}

fn row_id(row: ElementRef<'_>) -> Result<String> {
    row.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find_map(|el| el.value().attr("id"))
        .and_then(|id| id.split('_').next())
        .map(str::to_owned)
        .ok_or_else(|| HistoryError::malformed_page("row has no identifier"))
}

fn required<'a>(row: ElementRef<'a>, selector: &Selector, what: &str) -> Result<ElementRef<'a>> {
    row.select(selector)
        .next()
        .ok_or_else(|| HistoryError::malformed_page(format!("row has no {what}")))
}

/// Build one event from a row, correlating its items against `catalog`.
pub fn build_event(
    row: ElementRef<'_>,
    catalog: &DescriptionCatalog,
    implied_year: i32,
) -> Result<Event> {
    let id = row_id(row)?;

    let description = required(row, &DESCRIPTION, "event description")?;
    let event_type = text_of(description);
    let on_hold = event_type.contains(HOLD_PHRASE);

    let clock = required(row, &TIMESTAMP, "timestamp")?.inner_html();
    let date_text = own_text(required(row, &DATE, "date")?);
    let date = decode_timestamp(&date_text, &clock, implied_year)?;

    let link = description.select(&ANCHOR).next();
    let partner_name = link.map(text_of);
    let partner = match link.and_then(|a| a.value().attr("href")) {
        Some(href) => partner_from_link(href)?,
        None => Partner::default(),
    };

    let items = items::correlate_row(row, catalog)?;

    Ok(Event {
        id,
        event_type,
        on_hold,
        date,
        partner_name,
        partner,
        plus_events: items.plus,
        minus_events: items.minus,
    })
}
