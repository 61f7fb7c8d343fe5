//! Query string normalization for order-independent matching.

/// Parse a query string into URL-decoded pairs, sorted so that two query
/// strings with the same pairs in different order compare equal.
///
/// Keys without `=` get an empty value. Empty segments are dropped.
pub fn query_pairs(query: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect();
    pairs.sort();
    pairs
}

/// Canonical form of a query string: decoded, sorted, re-encoded.
///
/// `b=2&a=1` and `a=1&b=2` both normalize to `a=1&b=2`.
pub fn normalize_query(query: &str) -> String {
    query_pairs(query)
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn decode(s: &str) -> String {
    // `+` is a space in form-encoded query strings
    let spaced = s.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| s.replace('+', " "))
}
