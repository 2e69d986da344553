//! Line-oriented input sources: the target-site list and promo fragments.
//!
//! Both files follow the same convention: each non-blank line is one entry,
//! surrounding whitespace is trimmed, and blank or whitespace-only lines are
//! ignored. The target list is required for a cycle to run; the promo list
//! may be missing or empty, which simply composes records without a
//! promotional fragment.

use std::io;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Load the target-site list from a line-oriented file.
///
/// # Arguments
///
/// * `path` - Path to the target list file
///
/// # Errors
///
/// Propagates the I/O error when the file cannot be read; a missing target
/// list is a configuration error that aborts the cycle.
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn load_target_sites(path: &str) -> Result<Vec<String>, io::Error> {
    let raw = fs::read_to_string(path).await?;
    let sites = non_blank_lines(&raw);
    info!(count = sites.len(), "Loaded target sites");
    Ok(sites)
}

/// Load promotional fragments from a line-oriented file.
///
/// A missing or empty file is valid and yields no fragments.
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn load_promo_fragments(path: &str) -> Vec<String> {
    match fs::read_to_string(path).await {
        Ok(raw) => {
            let promos = non_blank_lines(&raw);
            info!(count = promos.len(), "Loaded promo fragments");
            promos
        }
        Err(e) => {
            warn!(error = %e, "No promo fragment file; composing without promos");
            Vec::new()
        }
    }
}

fn non_blank_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
