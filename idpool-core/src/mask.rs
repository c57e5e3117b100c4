//! Helpers for rendering sensitive strings in logs.

/// Number of characters kept visible at each end of a masked value.
pub const DEFAULT_RETAINING_COUNT: usize = 2;

/// Number of mask characters used for credential fields in debug output.
pub const CREDENTIAL_INTERIOR_COUNT: usize = 5;

/// Return a masked version of `value`.
///
/// Keeps `retaining` characters at both ends and replaces the interior with
/// at most `interior` copies of `mask`. Values too short to keep both ends
/// without revealing the whole string are masked entirely.
///
/// ```
/// use idpool_core::mask::masked;
///
/// assert_eq!(masked("ASIAEXAMPLEKEY", '*', 5, 2), "AS*****EY");
/// assert_eq!(masked("AKIA", '*', 5, 2), "****");
/// ```
pub fn masked(value: &str, mask: char, interior: usize, retaining: usize) -> String {
    let count = value.chars().count();
    if count <= retaining * 2 {
        return std::iter::repeat_n(mask, count).collect();
    }

    let mask_len = (count - retaining * 2).min(interior);
    let prefix: String = value.chars().take(retaining).collect();
    let suffix: String = value.chars().skip(count - retaining).collect();

    let mut out = String::with_capacity(prefix.len() + mask_len + suffix.len());
    out.push_str(&prefix);
    out.extend(std::iter::repeat_n(mask, mask_len));
    out.push_str(&suffix);
    out
}

/// Mask a credential field the way debug output renders it.
pub fn mask_credential(value: &str) -> String {
    masked(value, '*', CREDENTIAL_INTERIOR_COUNT, DEFAULT_RETAINING_COUNT)
}

/// Fully redact a value.
pub fn redacted(_value: &str) -> &'static str {
    "<REDACTED>"
}
