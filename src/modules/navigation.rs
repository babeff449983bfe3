// Input normalisation for the address bar. Pure string logic, no I/O.

use url::Url;
use crate::settings::Settings;

const NAVIGABLE_SCHEMES: [&str; 5] = ["http", "https", "file", "about", "data"];

/// Turns whatever the user typed (or pasted) into something the engine can load.
///
/// Nothing here resolves hosts or touches the network; input that does not
/// look like an address becomes a search on the configured engine.
pub fn smart_parse_url(input: &str, settings: &Settings) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return "about:blank".to_string();
    }

    if let Some(url) = parse_navigable(trimmed, settings.https_only) {
        return url;
    }

    settings.search_engine.query_url(trimmed)
}

/// True when `input` would be loaded as an address rather than searched for.
pub fn looks_like_url(input: &str) -> bool {
    let trimmed = input.trim();
    !trimmed.is_empty() && parse_navigable(trimmed, true).is_some()
}

fn parse_navigable(trimmed: &str, https_only: bool) -> Option<String> {
    // Implicit localhost/IP gets plain http
    let has_scheme_separator = trimmed.contains("://");
    let is_localhost = trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1");
    let is_ip = trimmed.parse::<std::net::IpAddr>().is_ok();

    if (is_localhost || is_ip) && !has_scheme_separator {
        if let Ok(u) = Url::parse(&format!("http://{}", trimmed)) {
            return Some(u.to_string());
        }
    }

    // Known schemes only, so "google.com" is not read as scheme "google"
    if let Ok(u) = Url::parse(trimmed) {
        if NAVIGABLE_SCHEMES.contains(&u.scheme()) {
            return Some(u.to_string());
        }
    }

    if !trimmed.contains(' ') && trimmed.contains('.') && !trimmed.ends_with('.') {
        let scheme = if https_only { "https" } else { "http" };
        if let Ok(u) = Url::parse(&format!("{}://{}", scheme, trimmed)) {
            if u.host().is_some() {
                return Some(u.to_string());
            }
        }
    }

    None
}
