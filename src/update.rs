use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use const_format::formatcp;
use log::debug;
use serde::Deserialize;

use crate::store::{Store, StoreFile};

const REPOSITORY: &str = "wkral/quickbill";
const LATEST_RELEASE_URL: &str =
    formatcp!("https://api.github.com/repos/{}/releases/latest", REPOSITORY);
const RELEASES_PAGE: &str = formatcp!("https://github.com/{}/releases", REPOSITORY);
const USER_AGENT: &str = formatcp!("quickbill/{}", env!("CARGO_PKG_VERSION"));

const CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Deserialize)]
struct Release {
    tag_name: String,
}

/// Warns on stderr when a newer release is published. Looks at most once a
/// day and stays quiet on any failure.
pub fn check(store: &Store, current: &str) {
    let config = match store.load() {
        Ok(config) => config,
        Err(_) => return,
    };
    if config.skip_update_check {
        return;
    }

    let cache = store.path(StoreFile::VersionCheck);
    let latest = match cached(&cache, SystemTime::now()) {
        Some(tag) => tag,
        None => match fetch() {
            Some(tag) => {
                if let Err(e) = fs::write(&cache, &tag) {
                    debug!("Caching release {}: {}", tag, e);
                }
                tag
            }
            None => return,
        },
    };

    if is_different(current, &latest) {
        eprintln!(
            "quickbill {} available (you have {}) - {}",
            latest, current, RELEASES_PAGE
        );
        eprintln!("(suppress with skip_update_check: true in config.yml)\n");
    }
}

/// Tag recorded by the last check, if that check was recent enough.
fn cached(path: &Path, now: SystemTime) -> Option<String> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let age = now.duration_since(modified).unwrap_or_default();
    if age >= CHECK_INTERVAL {
        return None;
    }
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn fetch() -> Option<String> {
    let agent = ureq::AgentBuilder::new().timeout(TIMEOUT).build();
    let release: Release = agent
        .get(LATEST_RELEASE_URL)
        .set("User-Agent", USER_AGENT)
        .set("Accept", "application/vnd.github+json")
        .call()
        .map_err(|e| debug!("Release check failed: {}", e))
        .ok()?
        .into_json()
        .map_err(|e| debug!("Release check response: {}", e))
        .ok()?;
    Some(release.tag_name)
}

fn is_different(current: &str, latest: &str) -> bool {
    let latest = latest.trim().trim_start_matches('v');
    !latest.is_empty() && latest != current.trim().trim_start_matches('v')
}
