//! Repository address normalization.
//!
//! Child paths in an index are relative to the directory holding that
//! index. A repository address is kept in directory form (no trailing
//! `index.json`, no trailing slash) and children are joined with a
//! single `/`.

/// Name of the index document at every level of a repository.
pub const INDEX_FILE: &str = "index.json";

/// Strip a trailing `/index.json` from `url`.
///
/// Only a whole path segment is removed, so `.../myindex.json` is left as is.
pub fn remove_index_file(url: &str) -> &str {
    match url.strip_suffix(INDEX_FILE) {
        Some(base) if base.is_empty() => base,
        Some(base) => base.strip_suffix('/').unwrap_or(url),
        None => url,
    }
}

/// Join `child` onto `base` with exactly one `/` between them.
pub fn append_url(base: &str, child: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), child.trim_start_matches('/'))
}

/// URL of the index document for a repository address.
pub fn index_url(repository: &str) -> String {
    append_url(remove_index_file(repository), INDEX_FILE)
}
