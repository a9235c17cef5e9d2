use log::{debug, warn};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};
use thiserror::Error;

use crate::data::{CountryId, ObservedRecord, PredictionRecord, SeriesSource, SourceError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeriesHalf {
    Observed,
    Predictions,
}

impl fmt::Display for SeriesHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesHalf::Observed => write!(f, "time series"),
            SeriesHalf::Predictions => write!(f, "prediction"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Failed to load {half} data: {message}")]
    Fetch {
        country: CountryId,
        half: SeriesHalf,
        message: String,
    },
    #[error("Request for country {country} was superseded")]
    Superseded { country: CountryId },
}

/// Immutable records of one country. Both halves always belong to `country`.
#[derive(Clone, Debug)]
pub struct CountrySeries {
    pub country: CountryId,
    pub observed: Arc<[ObservedRecord]>,
    pub predictions: Arc<[PredictionRecord]>,
}

impl CountrySeries {
    pub fn empty(country: CountryId) -> Self {
        Self { country, observed: Arc::from(Vec::new()), predictions: Arc::from(Vec::new()) }
    }
}

#[derive(Default)]
struct CacheEntry {
    observed: Option<Arc<[ObservedRecord]>>,
    predictions: Option<Arc<[PredictionRecord]>>,
}

impl CacheEntry {
    fn is_complete(&self) -> bool {
        self.observed.is_some() && self.predictions.is_some()
    }

    fn is_empty(&self) -> bool {
        self.observed.is_none() && self.predictions.is_none()
    }

    /// Missing halves read as empty
    fn snapshot(&self, country: CountryId) -> CountrySeries {
        let empty = CountrySeries::empty(country);
        CountrySeries {
            country,
            observed: self.observed.clone().unwrap_or(empty.observed),
            predictions: self.predictions.clone().unwrap_or(empty.predictions),
        }
    }
}

/// Which halves of a country still have to be fetched
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub country: CountryId,
    observed: bool,
    predictions: bool,
}

#[derive(Debug)]
pub struct FetchOutcome {
    ticket: FetchTicket,
    observed: Option<Result<Vec<ObservedRecord>, SourceError>>,
    predictions: Option<Result<Vec<PredictionRecord>, SourceError>>,
}

impl FetchOutcome {
    pub fn country(&self) -> CountryId {
        self.ticket.country
    }
}

#[derive(Debug)]
pub enum Lookup {
    /// Fully cached; no fetch needed
    Ready(CountrySeries),
    /// Caller must run the ticket and hand the outcome back to `apply`
    Fetch(FetchTicket),
    /// A fetch for this country is already running
    InFlight,
}

#[derive(Clone, Debug)]
pub struct Fetched {
    pub series: CountrySeries,
    /// Non-fatal: one half failed, the other was cached
    pub warnings: Vec<StoreError>,
}

#[derive(Debug)]
pub enum Applied {
    /// Response for a country the user has since left
    Stale,
    Ready(Fetched),
    Failed(Vec<StoreError>),
}

/// Per-country session cache of observed and prediction records
pub struct SeriesStore {
    source: Arc<dyn SeriesSource>,
    cache: HashMap<CountryId, CacheEntry>,
    in_flight: HashSet<CountryId>,
    latest: Option<CountryId>,
}

impl SeriesStore {
    pub fn new(source: Arc<dyn SeriesSource>) -> Self {
        Self { source, cache: HashMap::new(), in_flight: HashSet::new(), latest: None }
    }

    pub fn source(&self) -> Arc<dyn SeriesSource> {
        Arc::clone(&self.source)
    }

    /// Most recently requested country; only its responses are applied
    pub fn latest(&self) -> Option<CountryId> {
        self.latest
    }

    pub fn is_cached(&self, country: CountryId) -> bool {
        self.cache.get(&country).is_some_and(CacheEntry::is_complete)
    }

    /// Marks `country` as the current one and says whether it has to be fetched.
    pub fn request(&mut self, country: CountryId) -> Lookup {
        self.latest = Some(country);
        let entry = self.cache.get(&country);
        if let Some(entry) = entry.filter(|e| e.is_complete()) {
            debug!("country {} served from cache", country);
            return Lookup::Ready(entry.snapshot(country));
        }
        if !self.in_flight.insert(country) {
            return Lookup::InFlight;
        }
        let ticket = FetchTicket {
            country,
            observed: entry.is_none_or(|e| e.observed.is_none()),
            predictions: entry.is_none_or(|e| e.predictions.is_none()),
        };
        debug!("fetching country {}: {:?}", country, ticket);
        Lookup::Fetch(ticket)
    }

    /// Runs the queries of a ticket concurrently. Holds no store state, so it can be spawned.
    pub async fn run(source: Arc<dyn SeriesSource>, ticket: FetchTicket) -> FetchOutcome {
        let country = ticket.country;
        let observed = async {
            if ticket.observed { Some(source.list_observed(country).await) } else { None }
        };
        let predictions = async {
            if ticket.predictions { Some(source.list_predictions(country).await) } else { None }
        };
        let (observed, predictions) = tokio::join!(observed, predictions);
        FetchOutcome { ticket, observed, predictions }
    }

    /// Folds a finished fetch into the cache, unless the user has moved to another country.
    pub fn apply(&mut self, outcome: FetchOutcome) -> Applied {
        let country = outcome.ticket.country;
        self.in_flight.remove(&country);

        if self.latest != Some(country) {
            warn!(
                "discarding stale response for country {} (current: {:?})",
                country, self.latest
            );
            return Applied::Stale;
        }

        let mut errors = Vec::new();
        let entry = self.cache.entry(country).or_default();

        match outcome.observed {
            Some(Ok(rows)) => entry.observed = Some(rows.into()),
            Some(Err(e)) => errors.push(fetch_error(country, SeriesHalf::Observed, e)),
            None => {}
        }
        match outcome.predictions {
            Some(Ok(rows)) => entry.predictions = Some(rows.into()),
            Some(Err(e)) => errors.push(fetch_error(country, SeriesHalf::Predictions, e)),
            None => {}
        }

        if entry.is_empty() {
            self.cache.remove(&country);
            return Applied::Failed(errors);
        }
        let series = entry.snapshot(country);
        for e in &errors {
            warn!("partial load for country {}: {}", country, e);
        }
        Applied::Ready(Fetched { series, warnings: errors })
    }

    /// Request, fetch and apply in one step.
    pub async fn fetch_country_data(&mut self, country: CountryId) -> Result<Fetched, StoreError> {
        let ticket = match self.request(country) {
            Lookup::Ready(series) => return Ok(Fetched { series, warnings: Vec::new() }),
            Lookup::Fetch(ticket) => ticket,
            Lookup::InFlight => return Err(StoreError::Superseded { country }),
        };
        let outcome = Self::run(self.source(), ticket).await;
        match self.apply(outcome) {
            Applied::Ready(fetched) => Ok(fetched),
            Applied::Stale => Err(StoreError::Superseded { country }),
            Applied::Failed(mut errors) => Err(errors.swap_remove(0)),
        }
    }
}

fn fetch_error(country: CountryId, half: SeriesHalf, e: SourceError) -> StoreError {
    warn!("{} fetch failed for country {}: {}", half, country, e);
    StoreError::Fetch { country, half, message: e.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelId;
    use crate::data::Country;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockSource {
        fail_observed: Mutex<HashSet<CountryId>>,
        fail_predictions: Mutex<HashSet<CountryId>>,
        observed_calls: AtomicUsize,
        prediction_calls: AtomicUsize,
    }

    fn io_fail() -> SourceError {
        SourceError::Csv { line: 0, reason: "store unreachable".to_string() }
    }

    #[async_trait]
    impl SeriesSource for MockSource {
        async fn list_countries(&self) -> Result<Vec<Country>, SourceError> {
            Ok(Vec::new())
        }

        async fn list_observed(&self, country: CountryId) -> Result<Vec<ObservedRecord>, SourceError> {
            self.observed_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_observed.lock().unwrap().contains(&country) {
                return Err(io_fail());
            }
            Ok(vec![ObservedRecord {
                country_id: country,
                indicator_code: "gdp".to_string(),
                year: 2020,
                value: Some(country as f64),
            }])
        }

        async fn list_predictions(&self, country: CountryId) -> Result<Vec<PredictionRecord>, SourceError> {
            self.prediction_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_predictions.lock().unwrap().contains(&country) {
                return Err(io_fail());
            }
            Ok(vec![PredictionRecord {
                country_id: country,
                model: ModelId::Linear,
                indicator_code: "gdp".to_string(),
                year: 2021,
                predicted_value: Some(country as f64),
                actual_value: None,
                is_test: false,
                is_forecast: true,
            }])
        }
    }

    fn store_with(source: Arc<MockSource>) -> SeriesStore {
        SeriesStore::new(source)
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let source = Arc::new(MockSource::default());
        let mut store = store_with(source.clone());

        let first = store.fetch_country_data(1).await.unwrap();
        assert!(first.warnings.is_empty());
        assert_eq!(first.series.observed.len(), 1);

        let again = store.fetch_country_data(1).await.unwrap();
        assert_eq!(again.series.predictions.len(), 1);
        assert_eq!(source.observed_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.prediction_calls.load(Ordering::SeqCst), 1);
        assert!(store.is_cached(1));
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let source = Arc::new(MockSource::default());
        let mut store = store_with(source.clone());

        let Lookup::Fetch(ticket_a) = store.request(1) else { panic!("expected fetch") };
        let Lookup::Fetch(ticket_b) = store.request(2) else { panic!("expected fetch") };

        // B finishes first, then the late A response arrives
        let outcome_b = SeriesStore::run(store.source(), ticket_b).await;
        let outcome_a = SeriesStore::run(store.source(), ticket_a).await;
        assert!(matches!(store.apply(outcome_b), Applied::Ready(_)));
        assert!(matches!(store.apply(outcome_a), Applied::Stale));

        assert_eq!(store.latest(), Some(2));
        assert!(store.is_cached(2));
        assert!(!store.is_cached(1));
    }

    #[tokio::test]
    async fn test_series_never_mixes_countries() {
        let source = Arc::new(MockSource::default());
        let mut store = store_with(source);

        let Lookup::Fetch(ticket_a) = store.request(1) else { panic!("expected fetch") };
        let outcome_a = SeriesStore::run(store.source(), ticket_a).await;
        let Lookup::Fetch(ticket_b) = store.request(2) else { panic!("expected fetch") };
        let outcome_b = SeriesStore::run(store.source(), ticket_b).await;

        assert!(matches!(store.apply(outcome_a), Applied::Stale));
        let Applied::Ready(fetched) = store.apply(outcome_b) else { panic!("expected ready") };
        assert!(fetched.series.observed.iter().all(|r| r.country_id == 2));
        assert!(fetched.series.predictions.iter().all(|r| r.country_id == 2));
    }

    #[tokio::test]
    async fn test_partial_failure_caches_succeeding_half() {
        let source = Arc::new(MockSource::default());
        source.fail_predictions.lock().unwrap().insert(1);
        let mut store = store_with(source.clone());

        let fetched = store.fetch_country_data(1).await.unwrap();
        assert_eq!(fetched.series.observed.len(), 1);
        assert!(fetched.series.predictions.is_empty());
        assert_eq!(fetched.warnings.len(), 1);
        assert!(matches!(
            fetched.warnings[0],
            StoreError::Fetch { half: SeriesHalf::Predictions, .. }
        ));
        assert!(!store.is_cached(1));

        // only the missing half is fetched again
        source.fail_predictions.lock().unwrap().clear();
        let fetched = store.fetch_country_data(1).await.unwrap();
        assert!(fetched.warnings.is_empty());
        assert_eq!(fetched.series.predictions.len(), 1);
        assert_eq!(source.observed_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.prediction_calls.load(Ordering::SeqCst), 2);
        assert!(store.is_cached(1));
    }

    #[tokio::test]
    async fn test_total_failure_keeps_other_cache() {
        let source = Arc::new(MockSource::default());
        let mut store = store_with(source.clone());
        store.fetch_country_data(1).await.unwrap();

        source.fail_observed.lock().unwrap().insert(2);
        source.fail_predictions.lock().unwrap().insert(2);
        let err = store.fetch_country_data(2).await.unwrap_err();
        assert!(matches!(err, StoreError::Fetch { country: 2, half: SeriesHalf::Observed, .. }));
        assert!(err.to_string().starts_with("Failed to load time series data"));

        assert!(store.is_cached(1));
        assert!(!store.is_cached(2));
    }

    #[tokio::test]
    async fn test_duplicate_request_while_in_flight() {
        let source = Arc::new(MockSource::default());
        let mut store = store_with(source);

        let Lookup::Fetch(ticket) = store.request(3) else { panic!("expected fetch") };
        assert!(matches!(store.request(3), Lookup::InFlight));
        let outcome = SeriesStore::run(store.source(), ticket).await;
        assert_eq!(outcome.country(), 3);
        assert!(matches!(store.apply(outcome), Applied::Ready(_)));
        assert!(matches!(store.request(3), Lookup::Ready(_)));
    }
}
