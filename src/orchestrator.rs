//! Chain-walking extraction orchestrator with pacing and bounded retries.
//!
//! For one target URL the orchestrator builds the provider chain, then walks
//! it attempt by attempt: each provider gets a small fixed number of tries,
//! each attempt after the first is preceded by a randomized delay (widened
//! for heavy domains), and every failure — transport, status, malformed
//! envelope, or text below the minimum — moves the walk forward rather than
//! aborting it. Only exhausting the whole chain, fallback included, is
//! terminal for the URL.
//!
//! # Pacing
//!
//! Inter-attempt delays are the rate-limit mechanism, not an accident: the
//! ranges are chosen to stay under provider-side throttling. The policy is
//! an explicit component ([`DelayPolicy`]) so tests can construct a
//! zero-delay variant and assert on range arithmetic with a seeded RNG.

use crate::extract;
use crate::models::Extraction;
use crate::providers::{AttemptError, ProviderRegistry, normalize_domain};
use rand::Rng;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Attempts per provider before moving to the next one in the chain.
const ATTEMPTS_PER_PROVIDER: usize = 2;

/// Domains that get the widened delay range. Stricter bot mitigation or
/// higher latency than the rest of the target list.
const HEAVY_DOMAINS: [&str; 3] = ["decrypt.co", "marketwatch.com", "bitcoinmagazine.com"];

/// Terminal per-URL failure: every provider in the chain, fallback included,
/// failed to produce usable content.
#[derive(Debug, Error)]
#[error("provider chain exhausted for {url}")]
pub struct ChainExhausted {
    pub url: String,
}

/// Randomized inter-attempt delay policy, per target domain.
#[derive(Debug, Clone)]
pub struct DelayPolicy {
    normal_ms: RangeInclusive<u64>,
    heavy_ms: RangeInclusive<u64>,
    heavy_domains: HashSet<String>,
}

impl DelayPolicy {
    pub fn new(
        normal_ms: RangeInclusive<u64>,
        heavy_ms: RangeInclusive<u64>,
        heavy_domains: HashSet<String>,
    ) -> Self {
        Self {
            normal_ms,
            heavy_ms,
            heavy_domains,
        }
    }

    /// Production policy: 2–4 s between attempts, 4–7 s for heavy domains.
    pub fn default_policy() -> Self {
        Self::new(
            2_000..=4_000,
            4_000..=7_000,
            HEAVY_DOMAINS.iter().map(|d| d.to_string()).collect(),
        )
    }

    /// Zero-delay policy for tests.
    pub fn no_delay() -> Self {
        Self::new(0..=0, 0..=0, HashSet::new())
    }

    pub fn is_heavy(&self, domain: &str) -> bool {
        self.heavy_domains.contains(domain)
    }

    /// Draw the next inter-attempt delay for `domain`.
    pub fn delay_for(&self, domain: &str, rng: &mut impl Rng) -> Duration {
        let range = if self.is_heavy(domain) {
            self.heavy_ms.clone()
        } else {
            self.normal_ms.clone()
        };
        Duration::from_millis(rng.random_range(range))
    }
}

/// Walks the provider chain for one URL at a time.
pub struct Orchestrator {
    registry: ProviderRegistry,
    policy: DelayPolicy,
}

impl Orchestrator {
    pub fn new(registry: ProviderRegistry, policy: DelayPolicy) -> Self {
        Self { registry, policy }
    }

    /// Extract readable content from one target page.
    ///
    /// # Returns
    ///
    /// The extraction on the first attempt whose text clears the minimum
    /// paragraph length, or [`ChainExhausted`] once every provider has
    /// failed. The caller treats exhaustion as "skip this URL this cycle".
    #[instrument(level = "info", skip_all, fields(url = %url))]
    pub async fn extract(&self, url: &Url) -> Result<Extraction, ChainExhausted> {
        let domain = normalize_domain(url);
        let chain = self.registry.chain_for(&domain, &mut rand::rng());
        let heavy = self.policy.is_heavy(&domain);
        debug!(%domain, heavy, providers = chain.len(), "Walking provider chain");

        // Delay only between attempts that actually hit the network; an
        // unconfigured provider's fail-fast consumes no pacing delay.
        let mut pending_delay = false;
        for provider in &chain {
            for attempt in 1..=ATTEMPTS_PER_PROVIDER {
                if pending_delay {
                    let delay = self.policy.delay_for(&domain, &mut rand::rng());
                    debug!(?delay, "Pausing before next attempt");
                    tokio::time::sleep(delay).await;
                    pending_delay = false;
                }

                match provider.attempt(url.as_str()).await {
                    Ok(html) => {
                        pending_delay = true;
                        let extraction = extract::extract_page(&html, url);
                        if extract::meets_minimum(&extraction.text) {
                            info!(
                                provider = provider.name(),
                                attempt,
                                text_chars = extraction.text.chars().count(),
                                has_image = extraction.image_url.is_some(),
                                "Extraction succeeded"
                            );
                            return Ok(extraction);
                        }
                        warn!(
                            provider = provider.name(),
                            attempt,
                            text_chars = extraction.text.chars().count(),
                            "Extracted text below minimum; treating as provider failure"
                        );
                    }
                    Err(AttemptError::MissingCredential(var)) => {
                        warn!(
                            provider = provider.name(),
                            credential = var,
                            "Provider not configured; skipping"
                        );
                        break;
                    }
                    Err(e) => {
                        pending_delay = true;
                        warn!(
                            provider = provider.name(),
                            attempt,
                            error = %e,
                            "Provider attempt failed"
                        );
                    }
                }
            }
        }

        warn!("Provider chain exhausted");
        Err(ChainExhausted {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_delay_ranges_respected() {
        let policy = DelayPolicy::default_policy();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let normal = policy.delay_for("a.example", &mut rng);
            assert!((2_000..=4_000).contains(&(normal.as_millis() as u64)));
            let heavy = policy.delay_for("decrypt.co", &mut rng);
            assert!((4_000..=7_000).contains(&(heavy.as_millis() as u64)));
        }
    }

    #[test]
    fn test_heavy_classification() {
        let policy = DelayPolicy::default_policy();
        assert!(policy.is_heavy("marketwatch.com"));
        assert!(!policy.is_heavy("a.example"));
    }

    #[test]
    fn test_no_delay_policy_is_zero() {
        let policy = DelayPolicy::no_delay();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(policy.delay_for("any.example", &mut rng), Duration::ZERO);
    }
}
