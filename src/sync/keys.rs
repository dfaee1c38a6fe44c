//! Mapping between local relative paths and remote object keys
//!
//! Upload keys and the local key set used for the deletion diff are both
//! derived through [`map_key`]; using anything else for either side would let
//! a local file's key show up as "remote only".

/// Strip leading and trailing path separators from a prefix
pub fn normalize_prefix(prefix: &str) -> &str {
    prefix.trim_matches(|c| c == '/' || c == '\\')
}

/// Remote key for a relative path under `prefix`
pub fn map_key(relative_path: &str, prefix: &str) -> String {
    let prefix = normalize_prefix(prefix);
    if prefix.is_empty() {
        relative_path.to_string()
    } else {
        format!("{}/{}", prefix, relative_path)
    }
}

/// Inverse of [`map_key`]: the relative path of `key`, if it lies under `prefix`
pub fn strip_key<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = normalize_prefix(prefix);
    if prefix.is_empty() {
        return Some(key);
    }
    key.strip_prefix(prefix)?.strip_prefix('/')
}

/// Whether `key` belongs to the namespace of `prefix`
///
/// A prefix `site` owns `site/index.html` but not `site-old/index.html`.
pub fn in_namespace(key: &str, prefix: &str) -> bool {
    strip_key(key, prefix).is_some()
}

/// Prefix to pass to a remote listing so it only returns keys in the namespace
pub fn listing_prefix(prefix: &str) -> Option<String> {
    let prefix = normalize_prefix(prefix);
    if prefix.is_empty() {
        None
    } else {
        Some(format!("{}/", prefix))
    }
}
