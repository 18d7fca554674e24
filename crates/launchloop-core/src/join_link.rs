//! Campaign join links.
//!
//! A join link has the form `https://<host>/applaunchloop/join/<campaignId>`.
//! Creators share it; opening it on a tester's device starts onboarding.

use url::Url;

/// Path prefix every join link carries.
pub const JOIN_PATH_PREFIX: &str = "/applaunchloop/join/";

/// Build the share link for `campaign_id`.
pub fn join_link(host: &str, campaign_id: &str) -> String {
    format!("https://{host}{JOIN_PATH_PREFIX}{campaign_id}")
}

/// Extract the campaign id from a join link.
///
/// Returns `None` for other schemes, other hosts, other paths, or an empty
/// id. Trailing slashes after the id are ignored.
pub fn parse_join_link(link: &str, host: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    if !matches!(url.scheme(), "https" | "http") {
        return None;
    }
    if !url
        .host_str()
        .is_some_and(|h| h.eq_ignore_ascii_case(host))
    {
        return None;
    }

    let id = url
        .path()
        .strip_prefix(JOIN_PATH_PREFIX)?
        .trim_end_matches('/')
        .trim();
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some(id.to_string())
}
