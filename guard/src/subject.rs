//! Subject key extraction.
//!
//! The subject key is the first half of a rate-limit key. The guard treats
//! it as an opaque string: it is never parsed as an address or validated.
//!
//! # Priority
//!
//! 1. `X-Forwarded-For` (first entry in the list)
//! 2. `X-Real-IP`
//! 3. `127.0.0.1`
//!
//! Only trust these headers when the service sits behind a proxy that
//! overwrites them.

use crate::constants::defaults::LOOPBACK_SUBJECT;
use http::HeaderMap;

/// Derive the subject key for a request from its headers.
///
/// # Examples
///
/// ```
/// use bulwark_guard::subject::subject_key;
/// use http::HeaderMap;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
/// assert_eq!(subject_key(&headers), "203.0.113.7");
///
/// assert_eq!(subject_key(&HeaderMap::new()), "127.0.0.1");
/// ```
#[must_use]
pub fn subject_key(headers: &HeaderMap) -> String {
    // Try X-Forwarded-For (take first entry)
    if let Some(first) = header_str(headers, "x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
    {
        return first.to_string();
    }

    // Try X-Real-IP
    if let Some(real_ip) = header_str(headers, "x-real-ip")
        .map(str::trim)
        .filter(|real_ip| !real_ip.is_empty())
    {
        return real_ip.to_string();
    }

    LOOPBACK_SUBJECT.to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_forwarded_for_wins() {
        let map = headers(&[
            ("x-forwarded-for", " 198.51.100.2 ,10.0.0.1"),
            ("x-real-ip", "192.0.2.9"),
        ]);
        assert_eq!(subject_key(&map), "198.51.100.2");
    }

    #[test]
    fn test_real_ip_fallback() {
        let map = headers(&[("x-real-ip", "192.0.2.9")]);
        assert_eq!(subject_key(&map), "192.0.2.9");
    }

    #[test]
    fn test_empty_forwarded_for_falls_through() {
        let map = headers(&[("x-forwarded-for", " , 10.0.0.1"), ("x-real-ip", "192.0.2.9")]);
        assert_eq!(subject_key(&map), "192.0.2.9");
    }

    #[test]
    fn test_subject_is_not_parsed() {
        let map = headers(&[("x-forwarded-for", "not-an-address")]);
        assert_eq!(subject_key(&map), "not-an-address");
    }

    #[test]
    fn test_loopback_default() {
        assert_eq!(subject_key(&HeaderMap::new()), "127.0.0.1");
    }
}
