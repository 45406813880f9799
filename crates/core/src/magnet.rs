//! Magnet URI display names.
//!
//! Flow replies identify an added torrent by the `dn` (display name) query
//! parameter of its magnet URI; when that is missing or undecodable the raw
//! URI is truncated instead.

/// Number of raw characters kept when no display name can be extracted.
const FALLBACK_PREFIX_CHARS: usize = 30;

/// Derive a human-readable name from a magnet URI.
pub fn display_name(uri: &str) -> String {
    match dn_param(uri) {
        Some(name) => name,
        None => {
            let prefix: String = uri.chars().take(FALLBACK_PREFIX_CHARS).collect();
            format!("{} ...", prefix)
        }
    }
}

/// Extract and decode the `dn` query parameter, if present.
fn dn_param(uri: &str) -> Option<String> {
    let (_, query) = uri.split_once('?')?;

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key != "dn" {
            continue;
        }
        // Query-string encoding: '+' is a space, the rest is percent-encoded.
        let value = value.replace('+', " ");
        return urlencoding::decode(&value).ok().map(|v| v.into_owned());
    }

    None
}
