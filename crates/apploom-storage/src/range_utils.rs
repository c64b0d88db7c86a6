//! Key-range helpers for prefix scans over string-keyed tables.

/// Bounds `(start, end)` such that a `start..end` scan covers exactly the
/// keys beginning with `prefix`. The end bound bumps the final byte of the
/// prefix; keys here are ASCII ids joined by separators, so the bump never
/// crosses a UTF-8 boundary.
pub fn prefix_range(prefix: &str) -> (String, String) {
    let mut end = prefix.as_bytes().to_vec();
    match end.last_mut() {
        Some(last) if *last < 0x7F => *last += 1,
        _ => end.push(0x7F),
    }
    let end = String::from_utf8(end).unwrap_or_else(|_| format!("{prefix}\u{7F}"));
    (prefix.to_string(), end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_bound_bumps_the_last_byte() {
        assert_eq!(prefix_range("proj:"), ("proj:".into(), "proj;".into()));
        assert_eq!(
            prefix_range("user:alice:"),
            ("user:alice:".into(), "user:alice;".into())
        );
    }

    #[test]
    fn bounds_bracket_matching_keys() {
        let (start, end) = prefix_range("p1:");
        assert!("p1:000042:abc" > start.as_str());
        assert!("p1:999999:zzz" < end.as_str());
        assert!("p2:000001:abc" > end.as_str());
    }
}
