use once_cell::sync::Lazy;

/// Address the HTTP server should bind to. Defaults to `0.0.0.0`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()));

/// Port the HTTP server should listen on. Defaults to `3000`.
pub static BIND_PORT: Lazy<u16> = Lazy::new(|| {
    std::env::var("BIND_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000)
});

/// Seconds a cached payment-provider token is kept before a fresh login.
/// The provider issues ~30 minute tokens; ours are retired earlier.
pub static PAYMENT_TOKEN_TTL_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("PAYMENT_TOKEN_TTL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(25 * 60)
});

/// Lead time subtracted from the cached payment token's lifetime so the
/// token is refreshed before it actually expires.
pub static PAYMENT_TOKEN_REFRESH_LEAD_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("PAYMENT_TOKEN_REFRESH_LEAD_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(60)
});

/// Fallback checkout return URL when a purchase request omits one.
pub static PAYMENT_RETURN_URL: Lazy<String> = Lazy::new(|| {
    std::env::var("PAYMENT_RETURN_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "https://postwise.app/#payment-success".to_string())
});

pub fn read_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
