use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Longest hostname accepted, in bytes (RFC 1035 presentation form).
const MAX_NAME_LEN: usize = 253;

/// Longest single label.
const MAX_LABEL_LEN: usize = 63;

/// Key used by the in-flight query table.
///
/// Hashed over the case-folded bytes so "Example.com" and "example.com" land
/// in the same slot; the table still compares the literal hostname to guard
/// against collisions.
pub fn host_key(hostname: &str) -> u64 {
    let mut hasher = FxHasher::default();
    for b in hostname.bytes() {
        hasher.write_u8(b.to_ascii_lowercase());
    }
    hasher.finish()
}

/// Validate a hostname before any wire traffic.
///
/// Labels are 1..=63 chars of `[A-Za-z0-9-]` with no leading or trailing
/// hyphen; a punycode top-level label (`xn--`) needs at least four chars
/// after the prefix; no leading or trailing dot; total length capped at 253.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > MAX_NAME_LEN {
        return false;
    }

    let mut labels = hostname.split('.').peekable();
    while let Some(label) = labels.next() {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return false;
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return false;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }
        let is_last = labels.peek().is_none();
        if is_last && label.len() < 8 && label.to_ascii_lowercase().starts_with("xn--") {
            return false;
        }
    }

    true
}
