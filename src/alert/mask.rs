const FALLBACK_MASK: &str = "***@***";

/// Redact an e-mail address for logging, keeping the first character of the
/// local part and the last character of the domain: `alice@example.com`
/// becomes `a***@***m`.
pub fn mask_email(email: &str) -> String {
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return FALLBACK_MASK.to_string(),
    };

    match (local.chars().next(), domain.chars().next_back()) {
        (Some(first), Some(last)) => format!("{}***@***{}", first, last),
        _ => FALLBACK_MASK.to_string(),
    }
}
