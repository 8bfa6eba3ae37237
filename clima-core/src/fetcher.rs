//! Tri-state weather loading with supersession.
//!
//! Every call to [`WeatherFetcher::fetch`] takes a ticket from a generation
//! counter. A result is published only while its ticket is still the newest,
//! so a slow response for a previously selected city can never overwrite the
//! state of a later selection.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{city::CityConfig, model::WeatherSnapshot, provider::WeatherProvider};

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Loading,
    Error(String),
    Data(Arc<WeatherSnapshot>),
}

impl FetchState {
    pub fn snapshot(&self) -> Option<&Arc<WeatherSnapshot>> {
        match self {
            FetchState::Data(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The result became the published state.
    Applied,
    /// A newer fetch started before this one finished; the result was dropped.
    Superseded,
}

#[derive(Debug)]
pub struct WeatherFetcher<P> {
    provider: P,
    generation: AtomicU64,
    state: watch::Sender<FetchState>,
}

impl<P: WeatherProvider> WeatherFetcher<P> {
    pub fn new(provider: P) -> Self {
        let (state, _) = watch::channel(FetchState::Loading);
        Self { provider, generation: AtomicU64::new(0), state }
    }

    pub async fn fetch_city(&self, city: &CityConfig) -> FetchOutcome {
        self.fetch(city.latitude, city.longitude).await
    }

    pub async fn fetch(&self, latitude: f64, longitude: f64) -> FetchOutcome {
        let mut ticket = 0;
        self.state.send_modify(|state| {
            ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = FetchState::Loading;
        });

        let next = match self.provider.fetch_snapshot(latitude, longitude).await {
            Ok(snapshot) => FetchState::Data(Arc::new(snapshot)),
            Err(err) => {
                warn!(error = %err, ticket, "Weather fetch failed");
                FetchState::Error(err.to_string())
            }
        };

        // Checked under the channel lock so a fetch starting concurrently
        // cannot interleave between the comparison and the write.
        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != ticket {
                return false;
            }
            *state = next;
            true
        });

        if applied {
            info!(ticket, lat = %latitude, lon = %longitude, "Weather state updated");
            FetchOutcome::Applied
        } else {
            debug!(ticket, "Discarding superseded weather response");
            FetchOutcome::Superseded
        }
    }

    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    /// Latest snapshot, if the most recent fetch succeeded.
    pub fn snapshot(&self) -> Option<Arc<WeatherSnapshot>> {
        self.state.borrow().snapshot().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }
}
