//! Embedded payloads: the description catalog and history cursor assigned in
//! inline scripts, the paging row, and the market-history JSON envelope.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{HistoryError, Result};
use crate::types::{Description, DescriptionCatalog};

static DESCRIPTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var g_rgDescriptions = (.*);").unwrap());
static CURSOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var g_historyCursor = (.*);").unwrap());
static PAGING_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".inventory_history_pagingrow").unwrap());

/// EResult code for a generic failure, used when `success` is a bare `false`.
const ERESULT_FAIL: i64 = 2;

fn capture<'a>(re: &Regex, body: &'a str) -> Option<&'a str> {
    re.captures(body)?.get(1).map(|m| m.as_str())
}

/// The paging row is rendered on every well-formed history page, even an
/// empty one. Its absence usually means the session expired.
pub fn require_paging_row(doc: &Html) -> Result<ElementRef<'_>> {
    doc.select(&PAGING_ROW)
        .next()
        .filter(|row| !row.inner_html().trim().is_empty())
        .ok_or_else(|| HistoryError::malformed_page("no paging row found"))
}

/// PHP renders an empty associative array as `[]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PhpMap<T> {
    Keyed(HashMap<String, T>),
    List(Vec<Value>),
}

impl<T> PhpMap<T> {
    fn into_map(self) -> std::result::Result<HashMap<String, T>, serde_json::Error> {
        match self {
            PhpMap::Keyed(map) => Ok(map),
            PhpMap::List(list) if list.is_empty() => Ok(HashMap::new()),
            PhpMap::List(_) => Err(serde::de::Error::custom(
                "expected an object keyed by id, found a non-empty array",
            )),
        }
    }
}

fn decode_catalog(raw: &str) -> std::result::Result<DescriptionCatalog, serde_json::Error> {
    let apps: PhpMap<PhpMap<Description>> = serde_json::from_str(raw)?;
    let apps = apps
        .into_map()?
        .into_iter()
        .map(|(app_id, keyed)| Ok((app_id, keyed.into_map()?)))
        .collect::<std::result::Result<_, serde_json::Error>>()?;
    Ok(DescriptionCatalog { apps })
}

/// Decode the `g_rgDescriptions` assignment.
pub fn description_catalog(body: &str) -> Result<DescriptionCatalog> {
    let raw = capture(&DESCRIPTIONS_RE, body)
        .ok_or_else(|| HistoryError::malformed_page("no item descriptions found"))?;
    decode_catalog(raw).map_err(|source| HistoryError::InvalidPayload {
        what: "g_rgDescriptions",
        source,
    })
}

/// Decode the `g_historyCursor` assignment. `Ok(None)` when the page does
/// not carry one at all; a present `null` decodes to `Value::Null`.
pub fn history_cursor(body: &str) -> Result<Option<Value>> {
    let Some(raw) = capture(&CURSOR_RE, body) else {
        return Ok(None);
    };
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|source| HistoryError::InvalidPayload {
            what: "g_historyCursor",
            source,
        })
}

/// Required fields of a `/market/myhistory/render/` response.
#[derive(Debug, Clone)]
pub struct MarketEnvelope {
    pub pagesize: u64,
    pub total_count: u64,
    pub start: u64,
    /// `appid -> contextid -> key -> asset`.
    pub assets: Value,
    pub results_html: String,
    /// Inline script with one `CreateItemHoverFromContainer` call per asset.
    pub hovers: String,
}

impl MarketEnvelope {
    pub fn from_json(body: &Value) -> Result<Self> {
        check_success(body)?;

        let number = |field: &str| {
            body.get(field)
                .and_then(Value::as_u64)
                .ok_or_else(|| HistoryError::malformed_response(format!("missing {field}")))
        };
        let string = |field: &str| {
            body.get(field)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| HistoryError::malformed_response(format!("missing {field}")))
        };

        let assets = match body.get("assets") {
            Some(v @ Value::Object(_)) => v.clone(),
            Some(Value::Array(list)) if list.is_empty() => Value::Object(Default::default()),
            _ => return Err(HistoryError::malformed_response("missing assets")),
        };

        Ok(Self {
            pagesize: number("pagesize")?,
            total_count: number("total_count")?,
            start: number("start")?,
            assets,
            results_html: string("results_html")?,
            hovers: string("hovers")?,
        })
    }
}

/// `success` may be a boolean or an EResult number. Absent means OK.
fn check_success(body: &Value) -> Result<()> {
    let code = match body.get("success") {
        None | Some(Value::Null) | Some(Value::Bool(true)) => return Ok(()),
        Some(Value::Bool(false)) => ERESULT_FAIL,
        Some(v) => v.as_i64().unwrap_or(ERESULT_FAIL),
    };
    if code == 1 {
        return Ok(());
    }
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| format!("EResult {code}"));
    Err(HistoryError::Eresult { code, message })
}
