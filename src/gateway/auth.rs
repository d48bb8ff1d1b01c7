use subtle::ConstantTimeEq;

/// Check an `Authorization` header value against the configured token.
/// Returns true if no token is required (loopback) or if the bearer token matches.
pub fn verify_bearer(header: Option<&str>, expected: &Option<String>) -> bool {
    let expected = match expected {
        Some(t) => t,
        None => return true, // No auth required (loopback mode)
    };

    let token = header.and_then(|h| h.strip_prefix("Bearer ")).map(str::trim);

    match token {
        Some(t) => constant_time_eq(t.as_bytes(), expected.as_bytes()),
        None => false,
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
