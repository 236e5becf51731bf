//! Phone number normalization to international format.

/// Normalize a contact number for the messaging transport.
///
/// Strips everything but digits, then converts a local leading `0` to the
/// configured country calling code. Already-international numbers pass
/// through unchanged.
pub fn normalize_phone(raw: &str, country_code: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if let Some(rest) = digits.strip_prefix('0') {
        format!("{}{}", country_code, rest)
    } else {
        digits
    }
}
