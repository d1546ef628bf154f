// --- File: crates/bookify_common/src/http.rs ---

pub mod client;

/// Joins an API base URL and an endpoint path with exactly one slash between them.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
