//! The cycle controller: one full pass over the target list.
//!
//! A cycle re-reads the target list, shuffles it so no site sees a fixed
//! crawl position, and then runs each URL through the pipeline:
//! validate scheme → liveness probe → extract → dedup check → compose →
//! publish → record hash. Per-URL failures of any kind skip the URL and
//! never abort the cycle; only configuration-class problems (unreadable
//! target list, dedup-store errors) do.
//!
//! The controller owns all per-process mutable state — the composer's
//! platform rotation in particular — so cycle serialization reduces to
//! holding `&mut self` (the service wraps the controller in a
//! `tokio::sync::Mutex`; see [`crate::web`]).

use crate::compose::PostComposer;
use crate::dedup::{SeenStore, StoreError};
use crate::models::ContentHash;
use crate::orchestrator::Orchestrator;
use crate::publish::Publisher;
use crate::sources;
use rand::seq::SliceRandom;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// How much of the target list one cycle works through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPolicy {
    /// Process every site each cycle.
    FullSweep,
    /// Halt after the first newly published item, bounding per-cycle work.
    EarlyStop,
}

/// Outcome counters for one cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleStats {
    /// Sites loaded from the target list.
    pub sites: usize,
    /// Entries rejected for a non-http(s) or unparseable URL.
    pub skipped_invalid: usize,
    /// Sites skipped by the liveness probe.
    pub skipped_probe: usize,
    /// Sites where the whole provider chain failed.
    pub exhausted: usize,
    /// Extractions whose hash was already delivered.
    pub duplicates: usize,
    /// Records delivered and recorded this cycle.
    pub published: usize,
    /// Deliveries the sink rejected; hash left absent for a later cycle.
    pub delivery_failures: usize,
}

/// Cycle-fatal failures: configuration-class per the error taxonomy.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to load target sites: {0}")]
    TargetList(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives one full pass over the target list.
pub struct CycleController {
    orchestrator: Orchestrator,
    store: Arc<dyn SeenStore>,
    composer: PostComposer,
    publisher: Publisher,
    probe_client: reqwest::Client,
    target_sites_path: String,
    policy: SweepPolicy,
    probe_enabled: bool,
}

impl CycleController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orchestrator: Orchestrator,
        store: Arc<dyn SeenStore>,
        composer: PostComposer,
        publisher: Publisher,
        probe_client: reqwest::Client,
        target_sites_path: String,
        policy: SweepPolicy,
        probe_enabled: bool,
    ) -> Self {
        Self {
            orchestrator,
            store,
            composer,
            publisher,
            probe_client,
            target_sites_path,
            policy,
            probe_enabled,
        }
    }

    /// Run one cycle over the current target list.
    ///
    /// # Errors
    ///
    /// Only configuration-class failures: an unreadable target list or a
    /// dedup-store error. Provider, content, and delivery failures are
    /// counted in the returned [`CycleStats`] instead.
    #[instrument(level = "info", skip_all)]
    pub async fn run_cycle(&mut self) -> Result<CycleStats, CycleError> {
        let mut sites = sources::load_target_sites(&self.target_sites_path).await?;
        sites.shuffle(&mut rand::rng());

        let mut stats = CycleStats {
            sites: sites.len(),
            ..CycleStats::default()
        };
        info!(sites = stats.sites, policy = ?self.policy, "Cycle starting");

        for site in &sites {
            let Some(url) = eligible_url(site) else {
                warn!(%site, "Skipping entry without a valid http(s) URL");
                stats.skipped_invalid += 1;
                continue;
            };

            if self.probe_enabled && !self.probe(&url).await {
                stats.skipped_probe += 1;
                continue;
            }

            let extraction = match self.orchestrator.extract(&url).await {
                Ok(extraction) => extraction,
                Err(e) => {
                    warn!(error = %e, "Skipping site this cycle");
                    stats.exhausted += 1;
                    continue;
                }
            };

            let hash = ContentHash::compute(url.as_str(), &extraction.text);
            if self.store.contains(&hash).await? {
                info!(url = %url, %hash, "Duplicate content; skipping");
                stats.duplicates += 1;
                continue;
            }

            let record = self.composer.compose(&extraction, url.as_str());
            if let Err(e) = self.publisher.publish(&record).await {
                warn!(url = %url, error = %e, "Delivery failed; will retry on a later cycle");
                stats.delivery_failures += 1;
                continue;
            }

            self.store.add(&hash).await?;
            stats.published += 1;

            if self.policy == SweepPolicy::EarlyStop {
                info!("Early-stop policy satisfied; ending cycle");
                break;
            }
        }

        info!(
            sites = stats.sites,
            published = stats.published,
            duplicates = stats.duplicates,
            exhausted = stats.exhausted,
            skipped_invalid = stats.skipped_invalid,
            skipped_probe = stats.skipped_probe,
            delivery_failures = stats.delivery_failures,
            "Cycle complete"
        );
        Ok(stats)
    }

    /// Lightweight HEAD probe to skip clearly dead sites before spending a
    /// full extraction walk on them.
    async fn probe(&self, url: &Url) -> bool {
        match self.probe_client.head(url.as_str()).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(url = %url, status = response.status().as_u16(), "Liveness probe failed");
                false
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Liveness probe errored");
                false
            }
        }
    }
}

/// Parse a target entry, requiring an `http` or `https` scheme.
fn eligible_url(site: &str) -> Option<Url> {
    let url = Url::parse(site).ok()?;
    match url.scheme() {
        "http" | "https" => {
            debug!(%url, "Target eligible");
            Some(url)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::MemorySeenStore;
    use crate::orchestrator::DelayPolicy;
    use crate::providers::browser::BrowserFetch;
    use crate::providers::proxy::ScrapeProxy;
    use crate::providers::render::RenderApi;
    use crate::providers::{Provider, ProviderRegistry};
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE_TEXT: &str = "A first paragraph easily longer than the eighty character \
        minimum, describing the day's developments in enough detail to pass the filter.";

    fn article_html(text: &str) -> String {
        format!("<html><body><p>{text}</p></body></html>")
    }

    fn write_targets(targets: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for target in targets {
            writeln!(file, "{target}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    /// Controller wired against one mock server hosting the providers, the
    /// content store (`POST /records`), and any directly fetched pages.
    fn build_controller(
        server: &MockServer,
        targets_file: &NamedTempFile,
        store: Arc<MemorySeenStore>,
        policy: SweepPolicy,
        probe_enabled: bool,
        preferences: HashMap<String, String>,
        proxy_key: Option<&str>,
        render_key: Option<&str>,
    ) -> CycleController {
        let client = reqwest::Client::new();
        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(ScrapeProxy::new(
                client.clone(),
                server.uri(),
                proxy_key.map(str::to_string),
            )),
            Arc::new(RenderApi::new(
                client.clone(),
                server.uri(),
                render_key.map(str::to_string),
            )),
        ];
        let registry = ProviderRegistry::new(
            providers,
            Arc::new(BrowserFetch::new(client.clone())),
            preferences,
        );
        CycleController::new(
            Orchestrator::new(registry, DelayPolicy::no_delay()),
            store,
            PostComposer::new(Vec::new()),
            Publisher::new(client.clone(), format!("{}/records", server.uri())),
            client,
            targets_file.path().to_str().unwrap().to_string(),
            policy,
            probe_enabled,
        )
    }

    // Preferred provider fails with 500 twice, the second provider succeeds
    // with text and no image: one publish with an empty imageUrl and the
    // first text line as title, and the hash recorded.
    #[tokio::test]
    async fn test_preferred_provider_failure_falls_through_to_next() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("url", "https://a.example/x"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/extract"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"content": article_html(ARTICLE_TEXT)})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/records"))
            .and(body_partial_json(json!({
                "imageUrl": "",
                "sourceUrl": "https://a.example/x",
                "title": ARTICLE_TEXT,
                "status": "scheduled",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySeenStore::new());
        let targets = write_targets(&["https://a.example/x"]);
        let preferences =
            HashMap::from([("a.example".to_string(), "scrapeproxy".to_string())]);
        let mut controller = build_controller(
            &server,
            &targets,
            store.clone(),
            SweepPolicy::FullSweep,
            false,
            preferences,
            Some("proxy-key"),
            Some("render-key"),
        );

        let stats = controller.run_cycle().await.unwrap();
        assert_eq!(stats.published, 1);
        assert_eq!(stats.exhausted, 0);

        let hash = ContentHash::compute("https://a.example/x", ARTICLE_TEXT);
        assert!(store.contains(&hash).await.unwrap());
    }

    // A rejected delivery must leave the hash absent so the content is
    // retried on a later cycle.
    #[tokio::test]
    async fn test_delivery_failure_leaves_hash_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(article_html(ARTICLE_TEXT)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/records"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySeenStore::new());
        let targets = write_targets(&["https://a.example/x"]);
        let preferences =
            HashMap::from([("a.example".to_string(), "scrapeproxy".to_string())]);
        let mut controller = build_controller(
            &server,
            &targets,
            store.clone(),
            SweepPolicy::FullSweep,
            false,
            preferences,
            Some("proxy-key"),
            None,
        );

        let stats = controller.run_cycle().await.unwrap();
        assert_eq!(stats.published, 0);
        assert_eq!(stats.delivery_failures, 1);
        assert!(store.is_empty());
    }

    // Two cycles over an unchanged target list and store: the second one
    // extracts again but publishes nothing.
    #[tokio::test]
    async fn test_second_cycle_publishes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(article_html(ARTICLE_TEXT)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/records"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySeenStore::new());
        let targets = write_targets(&["https://a.example/x"]);
        let preferences =
            HashMap::from([("a.example".to_string(), "scrapeproxy".to_string())]);
        let mut controller = build_controller(
            &server,
            &targets,
            store.clone(),
            SweepPolicy::FullSweep,
            false,
            preferences,
            Some("proxy-key"),
            None,
        );

        let first = controller.run_cycle().await.unwrap();
        assert_eq!(first.published, 1);

        let second = controller.run_cycle().await.unwrap();
        assert_eq!(second.published, 0);
        assert_eq!(second.duplicates, 1);
        assert_eq!(store.len(), 1);
    }

    // With no provider credentials configured, every registry provider
    // fails fast and the browser fallback fetches the page directly.
    #[tokio::test]
    async fn test_fallback_fetcher_used_when_registry_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(article_html(ARTICLE_TEXT)),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/records"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySeenStore::new());
        let target = format!("{}/article", server.uri());
        let targets = write_targets(&[&target]);
        let mut controller = build_controller(
            &server,
            &targets,
            store.clone(),
            SweepPolicy::FullSweep,
            false,
            HashMap::new(),
            None,
            None,
        );

        let stats = controller.run_cycle().await.unwrap();
        assert_eq!(stats.published, 1);
        assert_eq!(stats.exhausted, 0);
    }

    // When a registry provider succeeds the fallback fetcher is never
    // attempted: the published description carries the provider's text and
    // the page itself sees no direct request.
    #[tokio::test]
    async fn test_fallback_not_attempted_when_provider_succeeds() {
        let server = MockServer::start().await;
        let provider_text = format!("{ARTICLE_TEXT} Served through the proxy provider.");
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(article_html(&provider_text)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/article2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(article_html("direct")))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/records"))
            .and(body_partial_json(json!({"description": provider_text})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySeenStore::new());
        let target = format!("{}/article2", server.uri());
        let targets = write_targets(&[&target]);
        let preferences =
            HashMap::from([("127.0.0.1".to_string(), "scrapeproxy".to_string())]);
        let mut controller = build_controller(
            &server,
            &targets,
            store.clone(),
            SweepPolicy::FullSweep,
            false,
            preferences,
            Some("proxy-key"),
            None,
        );

        let stats = controller.run_cycle().await.unwrap();
        assert_eq!(stats.published, 1);
    }

    // A failing HEAD probe skips the site before any extraction request.
    #[tokio::test]
    async fn test_probe_failure_skips_site() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/dead"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dead"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySeenStore::new());
        let target = format!("{}/dead", server.uri());
        let targets = write_targets(&[&target]);
        let mut controller = build_controller(
            &server,
            &targets,
            store.clone(),
            SweepPolicy::FullSweep,
            true,
            HashMap::new(),
            None,
            None,
        );

        let stats = controller.run_cycle().await.unwrap();
        assert_eq!(stats.skipped_probe, 1);
        assert_eq!(stats.published, 0);
    }

    // Early-stop policy: the cycle ends after the first newly published
    // item even with more extractable sites remaining.
    #[tokio::test]
    async fn test_early_stop_halts_after_first_publish() {
        let server = MockServer::start().await;
        for page in ["/p1", "/p2"] {
            Mock::given(method("GET"))
                .and(path(page))
                .respond_with(ResponseTemplate::new(200).set_body_string(article_html(
                    &format!("{ARTICLE_TEXT} Unique to page {page}."),
                )))
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/records"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySeenStore::new());
        let t1 = format!("{}/p1", server.uri());
        let t2 = format!("{}/p2", server.uri());
        let targets = write_targets(&[&t1, &t2]);
        let mut controller = build_controller(
            &server,
            &targets,
            store.clone(),
            SweepPolicy::EarlyStop,
            false,
            HashMap::new(),
            None,
            None,
        );

        let stats = controller.run_cycle().await.unwrap();
        assert_eq!(stats.published, 1);
        assert_eq!(store.len(), 1);
    }

    // Full-sweep policy processes every site.
    #[tokio::test]
    async fn test_full_sweep_processes_all_sites() {
        let server = MockServer::start().await;
        for page in ["/s1", "/s2"] {
            Mock::given(method("GET"))
                .and(path(page))
                .respond_with(ResponseTemplate::new(200).set_body_string(article_html(
                    &format!("{ARTICLE_TEXT} Unique to page {page}."),
                )))
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/records"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySeenStore::new());
        let t1 = format!("{}/s1", server.uri());
        let t2 = format!("{}/s2", server.uri());
        let targets = write_targets(&[&t1, &t2]);
        let mut controller = build_controller(
            &server,
            &targets,
            store.clone(),
            SweepPolicy::FullSweep,
            false,
            HashMap::new(),
            None,
            None,
        );

        let stats = controller.run_cycle().await.unwrap();
        assert_eq!(stats.published, 2);
        assert_eq!(store.len(), 2);
    }

    // Entries without an http(s) scheme never reach the network.
    #[tokio::test]
    async fn test_invalid_scheme_skipped() {
        let server = MockServer::start().await;
        let store = Arc::new(MemorySeenStore::new());
        let targets = write_targets(&["ftp://a.example/x", "not a url"]);
        let mut controller = build_controller(
            &server,
            &targets,
            store.clone(),
            SweepPolicy::FullSweep,
            false,
            HashMap::new(),
            None,
            None,
        );

        let stats = controller.run_cycle().await.unwrap();
        assert_eq!(stats.skipped_invalid, 2);
        assert_eq!(stats.published, 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_eligible_url_accepts_http_and_https() {
        assert!(eligible_url("https://a.example/x").is_some());
        assert!(eligible_url("http://a.example/x").is_some());
    }

    #[test]
    fn test_eligible_url_rejects_other_schemes() {
        assert!(eligible_url("ftp://a.example/x").is_none());
        assert!(eligible_url("file:///etc/passwd").is_none());
        assert!(eligible_url("not a url").is_none());
    }
}
