//! Throttled multi-source fetch layer (C3) and headless-browser-driven
//! date resolution (C5).

pub mod circuit;
pub mod client;
pub mod date_resolver;
pub mod headless;
pub mod retry;
pub mod throttle;

pub use circuit::{CircuitBreaker, CircuitState};
pub use client::{FetchResponse, Fetcher};
pub use date_resolver::{extract_italian_date, NormattivaDateResolver};
pub use headless::{HeadlessBrowser, NullBrowser};
pub use retry::BackoffPolicy;
