//! Extraction providers and the per-URL provider chain.
//!
//! Each provider is one way of getting a target page's HTML:
//!
//! | Provider | Module | Credential | Response |
//! |----------|--------|------------|----------|
//! | scrapeproxy | [`proxy`] | `api_key` query parameter | Raw HTML |
//! | renderapi | [`render`] | `apikey` header | JSON envelope with `content` field |
//! | browser | [`browser`] | none | Raw HTML, browser-fingerprint headers |
//!
//! Providers share a uniform [`Provider::attempt`] surface so the
//! orchestrator can walk any chain without knowing transport details. The
//! chain for a URL puts the domain's preferred provider first (when one is
//! configured), the remaining registry providers in randomized order, and
//! the browser fallback unconditionally last.

pub mod browser;
pub mod proxy;
pub mod render;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Why a single provider attempt failed.
///
/// Every variant is recoverable at the chain level: the orchestrator logs it
/// and moves on to the next attempt or provider.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The provider needs a credential that was not configured. Raised
    /// before any request is sent.
    #[error("missing credential {0}")]
    MissingCredential(&'static str),
    /// The provider responded with a non-success status.
    #[error("http status {0}")]
    HttpStatus(u16),
    /// The request timed out.
    #[error("request timed out")]
    Timeout,
    /// Connection-level failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The provider's response body did not decode as expected.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// The provider returned a success status with an empty body.
    #[error("empty response body")]
    EmptyContent,
}

impl AttemptError {
    /// Classify a `reqwest` error into the attempt taxonomy.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AttemptError::Timeout
        } else {
            AttemptError::Transport(e.to_string())
        }
    }
}

/// A third-party extraction provider (or the fallback fetcher).
///
/// One attempt fetches the page's HTML; readable-content extraction happens
/// afterwards in [`crate::extract`], identically for every provider.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Short provider name for chain ordering, preferences, and logging.
    fn name(&self) -> &'static str;

    /// Fetch the raw HTML of `url` through this provider.
    async fn attempt(&self, url: &str) -> Result<String, AttemptError>;
}

/// Browser User-Agent pool shared by all providers.
const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (iPhone; CPU iPhone OS 15_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_3_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36",
];

/// Pick a User-Agent at random from the pool.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Default per-domain provider preferences.
///
/// Domains that respond poorly to the render provider go to the proxy
/// provider first.
pub const DEFAULT_PREFERENCES: [(&str, &str); 4] = [
    ("cointelegraph.com", "scrapeproxy"),
    ("psychologytoday.com", "scrapeproxy"),
    ("verywellmind.com", "scrapeproxy"),
    ("fool.com", "scrapeproxy"),
];

/// Strip the `www.` prefix from a URL's host.
///
/// The result is the key used for provider preferences and heavy-domain
/// classification.
pub fn normalize_domain(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// The ordered set of extraction providers plus the fallback fetcher.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
    fallback: Arc<dyn Provider>,
    preferences: HashMap<String, String>,
}

impl ProviderRegistry {
    /// Assemble a registry from provider instances and a preference table.
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        fallback: Arc<dyn Provider>,
        preferences: HashMap<String, String>,
    ) -> Self {
        Self {
            providers,
            fallback,
            preferences,
        }
    }

    /// Registry with the default preference table.
    pub fn with_default_preferences(
        providers: Vec<Arc<dyn Provider>>,
        fallback: Arc<dyn Provider>,
    ) -> Self {
        let preferences = DEFAULT_PREFERENCES
            .iter()
            .map(|(domain, provider)| (domain.to_string(), provider.to_string()))
            .collect();
        Self::new(providers, fallback, preferences)
    }

    /// Build the attempt order for one target domain.
    ///
    /// The domain's preferred provider (if configured) goes first, the
    /// remaining registry providers follow in randomized order, and the
    /// fallback fetcher is appended unconditionally.
    pub fn chain_for(&self, domain: &str, rng: &mut impl Rng) -> Vec<Arc<dyn Provider>> {
        let preferred = self.preferences.get(domain).map(String::as_str);

        let mut chain = Vec::with_capacity(self.providers.len() + 1);
        let mut rest = Vec::new();
        for provider in &self.providers {
            if Some(provider.name()) == preferred {
                chain.push(Arc::clone(provider));
            } else {
                rest.push(Arc::clone(provider));
            }
        }
        rest.shuffle(rng);
        chain.extend(rest);
        chain.push(Arc::clone(&self.fallback));

        debug!(
            %domain,
            order = ?chain.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "Built provider chain"
        );
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct StubProvider(&'static str);

    #[async_trait::async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn attempt(&self, _url: &str) -> Result<String, AttemptError> {
            Err(AttemptError::EmptyContent)
        }
    }

    fn registry(preferences: HashMap<String, String>) -> ProviderRegistry {
        ProviderRegistry::new(
            vec![
                Arc::new(StubProvider("scrapeproxy")),
                Arc::new(StubProvider("renderapi")),
            ],
            Arc::new(StubProvider("browser")),
            preferences,
        )
    }

    #[test]
    fn test_preferred_provider_first() {
        let prefs = HashMap::from([("a.example".to_string(), "renderapi".to_string())]);
        let registry = registry(prefs);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chain = registry.chain_for("a.example", &mut rng);
            assert_eq!(chain[0].name(), "renderapi");
        }
    }

    #[test]
    fn test_fallback_always_last() {
        let registry = registry(HashMap::new());
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chain = registry.chain_for("b.example", &mut rng);
            assert_eq!(chain.last().unwrap().name(), "browser");
            assert_eq!(chain.len(), 3);
        }
    }

    #[test]
    fn test_unpreferred_domain_contains_all_providers() {
        let registry = registry(HashMap::new());
        let mut rng = StdRng::seed_from_u64(7);
        let chain = registry.chain_for("c.example", &mut rng);
        let names: Vec<_> = chain.iter().map(|p| p.name()).collect();
        assert!(names.contains(&"scrapeproxy"));
        assert!(names.contains(&"renderapi"));
    }

    #[test]
    fn test_normalize_domain_strips_www() {
        let url = Url::parse("https://www.a.example/path").unwrap();
        assert_eq!(normalize_domain(&url), "a.example");
        let url = Url::parse("http://b.example/").unwrap();
        assert_eq!(normalize_domain(&url), "b.example");
    }
}
