//! Item correlation: each `.history_item` in a row is matched to its catalog
//! description and sorted into gained or lost.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::error::{HistoryError, Result};
use crate::types::{DescriptionCatalog, ItemDescriptor};

static ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".history_item").unwrap());
static ASSET_FRAGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)_(\d+)_(\d+)").unwrap());
static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Rows annotating a trade hold carry a fake item with these coordinates.
const HOLD_MARKER_APP: &str = "754";
const HOLD_MARKER_KEY: &str = "0_0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Plus,
    Minus,
}

#[derive(Debug, Default)]
pub struct CorrelatedItems {
    pub plus: Vec<ItemDescriptor>,
    pub minus: Vec<ItemDescriptor>,
}

pub fn is_hold_marker(app_id: &str, class_instance: &str) -> bool {
    app_id == HOLD_MARKER_APP && class_instance == HOLD_MARKER_KEY
}

fn attr<'a>(item: ElementRef<'a>, name: &str) -> Result<&'a str> {
    item.value()
        .attr(name)
        .ok_or_else(|| HistoryError::malformed_page(format!("history item has no {name}")))
}

/// Asset id from an item link. Inventory links end in
/// `#<appid>_<contextid>_<assetid>`; otherwise the third number in the link.
pub fn asset_id_from_link(href: &str) -> Option<String> {
    if let Some(caps) = ASSET_FRAGMENT_RE.captures(href) {
        return Some(caps[3].to_owned());
    }
    DIGITS_RE.find_iter(href).nth(2).map(|m| m.as_str().to_owned())
}

/// The indicator glyph is the first element of the item's group container.
pub fn direction(item: ElementRef<'_>) -> Direction {
    let indicator = item
        .parent()
        .and_then(|group| group.parent())
        .and_then(|block| block.children().find_map(ElementRef::wrap));
    match indicator {
        Some(el) if el.text().collect::<String>().trim() == "+" => Direction::Plus,
        _ => Direction::Minus,
    }
}

/// Correlate a single item element. `Ok(None)` for the hold marker.
pub fn correlate_item(
    item: ElementRef<'_>,
    catalog: &DescriptionCatalog,
) -> Result<Option<ItemDescriptor>> {
    let app_id = attr(item, "data-appid")?;
    let class_id = attr(item, "data-classid")?;
    let instance_id = attr(item, "data-instanceid")?;
    let key = format!("{class_id}_{instance_id}");
    if is_hold_marker(app_id, &key) {
        return Ok(None);
    }

    let description = catalog
        .get(app_id, &key)
        .cloned()
        .ok_or_else(|| HistoryError::MissingDescription {
            app_id: app_id.to_owned(),
            key: key.clone(),
        })?;

    let context_id = attr(item, "data-contextid")?;
    let amount = attr(item, "data-amount")?;
    let amount = amount
        .parse()
        .map_err(|_| HistoryError::malformed_page(format!("bad item amount {amount:?}")))?;

    Ok(Some(ItemDescriptor {
        app_id: app_id.to_owned(),
        context_id: context_id.to_owned(),
        class_id: class_id.to_owned(),
        instance_id: instance_id.to_owned(),
        amount,
        asset_id: item.value().attr("href").and_then(asset_id_from_link),
        description,
    }))
}

/// Correlate every item in a row, preserving document order per direction.
pub fn correlate_row(row: ElementRef<'_>, catalog: &DescriptionCatalog) -> Result<CorrelatedItems> {
    let mut out = CorrelatedItems::default();
    for item in row.select(&ITEM) {
        let Some(descriptor) = correlate_item(item, catalog)? else {
            continue;
        };
        match direction(item) {
            Direction::Plus => out.plus.push(descriptor),
            Direction::Minus => out.minus.push(descriptor),
        }
    }
    Ok(out)
}
