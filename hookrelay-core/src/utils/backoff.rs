use std::time::Duration;

/// Largest exponent used for backoff (2^11 = 2048 seconds).
pub const MAX_BACKOFF_EXPONENT: u32 = 11;

/// Delay before the retry that follows failed attempt number `attempt`.
///
/// `2^attempt` seconds: 2s after the first failure, 4s after the second, and
/// so on, capped at `2^MAX_BACKOFF_EXPONENT`.
pub fn retry_delay(attempt: u32) -> Duration {
    let seconds = 2u64.pow(attempt.min(MAX_BACKOFF_EXPONENT));
    Duration::from_secs(seconds)
}
