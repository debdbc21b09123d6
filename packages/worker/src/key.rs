//! Mapping between request URLs and manifest paths.

use url::Url;

use shellcache_store::RequestKey;

/// Logical path of the root document.
pub const ROOT_KEY: &str = "/";

/// Query marker used by the build step for cache busting.
const VERSION_QUERY: &str = "?v=";

fn origin_prefix(origin: &Url) -> String {
    origin.origin().ascii_serialization()
}

/// Derive the manifest path a request URL refers to.
///
/// Returns `None` for URLs on another origin. The `?v=` cache-busting suffix
/// is dropped, and the bare origin, an `origin/#...` navigation address or an
/// empty remainder all map to [`ROOT_KEY`]. Other fragments are ignored.
pub fn logical_key(origin: &Url, url: &Url) -> Option<String> {
    if url.origin() != origin.origin() {
        return None;
    }

    let prefix = origin_prefix(origin);
    let full = url.as_str();
    if full == prefix || full.starts_with(&format!("{}/#", prefix)) {
        return Some(ROOT_KEY.to_string());
    }

    let identity = RequestKey::from_url(url);
    let rest = identity.as_str().strip_prefix(&prefix)?;
    let mut key = rest.strip_prefix('/').unwrap_or(rest).to_string();
    if let Some(idx) = key.find(VERSION_QUERY) {
        key.truncate(idx);
    }

    if key.is_empty() {
        Some(ROOT_KEY.to_string())
    } else {
        Some(key)
    }
}

/// The URL a manifest path is fetched from. [`ROOT_KEY`] is the origin root.
pub fn resource_url(origin: &Url, path: &str) -> Result<Url, url::ParseError> {
    let prefix = origin_prefix(origin);
    if path == ROOT_KEY {
        Url::parse(&format!("{}/", prefix))
    } else {
        Url::parse(&format!("{}/{}", prefix, path.trim_start_matches('/')))
    }
}

/// Manifest path of a stored entry, if the entry sits under that path's
/// canonical identity.
///
/// Entries cached under a versioned or otherwise decorated URL return `None`:
/// a plain request for the path would not find them.
pub fn stored_path(origin: &Url, key: &RequestKey) -> Option<String> {
    let path = logical_key(origin, key.url())?;
    let canonical = resource_url(origin, &path).ok()?;
    (RequestKey::from_url(&canonical) == *key).then_some(path)
}

/// Identity the manifest record is stored under.
pub fn manifest_record_key(origin: &Url) -> Result<RequestKey, url::ParseError> {
    RequestKey::parse(&format!("{}/manifest", origin_prefix(origin)))
}
