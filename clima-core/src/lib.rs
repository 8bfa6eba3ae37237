//! Core library for the `clima` weather dashboard.
//!
//! This crate defines:
//! - Configuration and the city catalogue
//! - Weather fetching with stale-response protection
//! - The 24-hour display window and weather icons
//! - The chat assistant and its client-side rate limit
//!
//! It is used by `clima-cli`, but can also be reused by other front-ends.

pub mod chat;
pub mod city;
pub mod config;
pub mod fetcher;
pub mod model;
pub mod provider;
pub mod rate_limit;
pub mod store;
pub mod window;

pub use chat::{ChatError, ChatMessage, ChatProvider, ChatRole, ChatSession, CohereClient};
pub use city::CityConfig;
pub use config::Config;
pub use fetcher::{FetchOutcome, FetchState, WeatherFetcher};
pub use model::{CurrentConditions, HourlySeries, WeatherSnapshot};
pub use provider::{FetchError, OpenMeteoProvider, WeatherProvider};
pub use rate_limit::{ChatRateLimiter, RateDecision};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use window::{HourlyWindow, WeatherIcon, derive_window};
