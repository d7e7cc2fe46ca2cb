//! Vanity-URL resolution. Names are collected while rows are built, looked
//! up concurrently once parsing is done, then merged back in one pass.

use std::collections::HashSet;
use std::sync::LazyLock;

use futures_util::{StreamExt, TryStreamExt, stream};
use regex::Regex;
use tracing::{debug, info};
use url::Url;

use crate::error::{HistoryError, Result};
use crate::fetch::{PageFetcher, community_url};
use crate::types::{Partner, SteamId, VanityResolution};

static STEAMID64_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<steamID64>\s*(\d+)\s*</steamID64>").unwrap());

/// Distinct vanity names in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct VanityQueue {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl VanityQueue {
    /// Queue the partner's vanity if it still needs resolving.
    pub fn push_partner(&mut self, partner: &Partner) {
        if let Some(name) = partner.pending_vanity() {
            self.push(name);
        }
    }

    pub fn push(&mut self, name: &str) {
        if self.seen.insert(name.to_owned()) {
            self.names.push(name.to_owned());
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// `https://steamcommunity.com/id/<name>/?xml=1`
pub fn vanity_lookup_url(name: &str) -> Url {
    let mut url = community_url(&["id", name, ""]);
    url.set_query(Some("xml=1"));
    url
}

/// Pull the 64-bit id out of a profile XML document.
pub fn steam_id_from_profile(body: &str) -> Option<SteamId> {
    STEAMID64_RE
        .captures(body)
        .and_then(|caps| caps[1].parse().ok())
        .map(SteamId)
}

/// Resolve one vanity name.
pub async fn resolve_vanity_url<F>(fetcher: &F, name: &str) -> Result<VanityResolution>
where
    F: PageFetcher + ?Sized,
{
    let body = fetcher.get_text(&vanity_lookup_url(name)).await?;
    let steam_id = steam_id_from_profile(&body)
        .ok_or_else(|| HistoryError::IdentityNotFound(name.to_owned()))?;
    debug!("Resolved {name} -> {steam_id}");
    Ok(VanityResolution {
        vanity_url: name.to_owned(),
        steam_id,
    })
}

/// Resolve every queued name with at most `limit` lookups in flight.
///
/// Fails on the first lookup error; nothing is returned for the others.
pub async fn resolve_all<F>(
    fetcher: &F,
    queue: &VanityQueue,
    limit: usize,
) -> Result<Vec<VanityResolution>>
where
    F: PageFetcher + ?Sized,
{
    if queue.is_empty() {
        return Ok(Vec::new());
    }
    info!(
        "Resolving {} vanity URL(s) (concurrency {})",
        queue.names().len(),
        limit.max(1)
    );
    stream::iter(queue.names())
        .map(|name| resolve_vanity_url(fetcher, name))
        .buffer_unordered(limit.max(1))
        .try_collect()
        .await
}

/// Fill `steam_id` on every partner whose vanity matches a resolution.
/// Returns how many partners were filled.
pub fn back_fill<'a>(
    partners: impl IntoIterator<Item = &'a mut Partner>,
    resolutions: &[VanityResolution],
) -> usize {
    let mut filled = 0;
    for partner in partners {
        let Some(name) = partner.pending_vanity() else {
            continue;
        };
        if let Some(found) = resolutions.iter().find(|r| r.vanity_url == name) {
            partner.steam_id = Some(found.steam_id);
            filled += 1;
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::fetch::testing::StaticFetcher;

    fn profile_xml(id: u64) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <profile><steamID64>{id}</steamID64><steamID><![CDATA[name]]></steamID></profile>"
        )
    }

    fn vanity(name: &str) -> Partner {
        Partner {
            steam_id: None,
            vanity_url: Some(name.to_owned()),
        }
    }

    // ── VanityQueue ────────────────────────────────────────────────

    #[test]
    fn queue_dedups_in_order() {
        let mut q = VanityQueue::default();
        for name in ["b", "a", "b", "c", "a"] {
            q.push(name);
        }
        assert_eq!(q.names(), ["b", "a", "c"]);
    }

    #[test]
    fn queue_skips_known_ids() {
        let mut q = VanityQueue::default();
        q.push_partner(&Partner {
            steam_id: Some(SteamId(1)),
            vanity_url: None,
        });
        q.push_partner(&Partner::default());
        assert!(q.is_empty());
    }

    // ── lookups ────────────────────────────────────────────────────

    #[test]
    fn lookup_url_shape() {
        assert_eq!(
            vanity_lookup_url("gaben").as_str(),
            "https://steamcommunity.com/id/gaben/?xml=1"
        );
    }

    #[test]
    fn steam_id_pattern() {
        assert_eq!(
            steam_id_from_profile(&profile_xml(76561197960287930)),
            Some(SteamId(76561197960287930))
        );
        assert_eq!(
            steam_id_from_profile("<response><error>The specified profile could not be found.</error></response>"),
            None
        );
    }

    #[tokio::test]
    async fn resolves_each_name_once() {
        let fetcher = StaticFetcher::default()
            .with_page(vanity_lookup_url("a").as_str(), profile_xml(11))
            .with_page(vanity_lookup_url("b").as_str(), profile_xml(22));
        let mut q = VanityQueue::default();
        for name in ["a", "b", "a", "a"] {
            q.push(name);
        }

        let mut results = resolve_all(&fetcher, &q, 8).await.unwrap();
        results.sort_by(|x, y| x.vanity_url.cmp(&y.vanity_url));
        assert_eq!(
            results,
            vec![
                VanityResolution { vanity_url: "a".into(), steam_id: SteamId(11) },
                VanityResolution { vanity_url: "b".into(), steam_id: SteamId(22) },
            ]
        );
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn one_failure_fails_the_phase() {
        let fetcher = StaticFetcher::default()
            .with_page(vanity_lookup_url("good").as_str(), profile_xml(1))
            .with_page(vanity_lookup_url("gone").as_str(), "<response><error/></response>");
        let mut q = VanityQueue::default();
        q.push("good");
        q.push("gone");

        let err = resolve_all(&fetcher, &q, 1).await.unwrap_err();
        assert!(matches!(err, HistoryError::IdentityNotFound(ref n) if n == "gone"));
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let fetcher = StaticFetcher::default();
        let mut q = VanityQueue::default();
        q.push("nobody");
        let err = resolve_all(&fetcher, &q, 0).await.unwrap_err();
        assert!(matches!(err, HistoryError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn empty_queue_issues_no_requests() {
        let fetcher = StaticFetcher::default();
        let results = resolve_all(&fetcher, &VanityQueue::default(), 4).await.unwrap();
        assert!(results.is_empty());
        assert!(fetcher.requests().is_empty());
    }

    /// Answers every lookup after a short delay and records the peak number
    /// of lookups in flight.
    #[derive(Default)]
    struct SlowFetcher {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PageFetcher for SlowFetcher {
        async fn get_text(&self, _url: &Url) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(profile_xml(7))
        }
    }

    fn queue_of(n: usize) -> VanityQueue {
        let mut q = VanityQueue::default();
        for i in 0..n {
            q.push(&format!("user{i}"));
        }
        q
    }

    #[tokio::test]
    async fn lookups_overlap_up_to_the_limit() {
        let fetcher = SlowFetcher::default();
        let results = resolve_all(&fetcher, &queue_of(5), 3).await.unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 3);
        assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn limit_above_queue_runs_all_at_once() {
        let fetcher = SlowFetcher::default();
        resolve_all(&fetcher, &queue_of(2), 8).await.unwrap();
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_limit_runs_one_at_a_time() {
        let fetcher = SlowFetcher::default();
        let results = resolve_all(&fetcher, &queue_of(3), 0).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 1);
    }

    // ── back_fill ──────────────────────────────────────────────────

    #[test]
    fn back_fill_all_matching_partners() {
        let mut partners = vec![vanity("a"), vanity("b"), vanity("a"), Partner::default()];
        let resolutions = vec![VanityResolution {
            vanity_url: "a".into(),
            steam_id: SteamId(7),
        }];
        let filled = back_fill(partners.iter_mut(), &resolutions);
        assert_eq!(filled, 2);
        assert_eq!(partners[0].steam_id, Some(SteamId(7)));
        assert_eq!(partners[2].steam_id, Some(SteamId(7)));
        assert_eq!(partners[0].vanity_url.as_deref(), Some("a"));
        assert_eq!(partners[1].steam_id, None);
        assert_eq!(partners[3], Partner::default());
    }

    #[test]
    fn back_fill_leaves_known_ids_alone() {
        let mut partners = vec![Partner {
            steam_id: Some(SteamId(1)),
            vanity_url: Some("a".into()),
        }];
        let resolutions = vec![VanityResolution {
            vanity_url: "a".into(),
            steam_id: SteamId(2),
        }];
        assert_eq!(back_fill(partners.iter_mut(), &resolutions), 0);
        assert_eq!(partners[0].steam_id, Some(SteamId(1)));
    }
}
