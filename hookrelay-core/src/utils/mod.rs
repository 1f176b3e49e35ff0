pub mod backoff;
pub mod event_pattern;
