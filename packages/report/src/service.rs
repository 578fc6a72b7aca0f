//! Per-ward report assembly.
//!
//! The service owns the full request pipeline: fast-cache check, ward
//! lookup, upstream fan-out, index resolution, narrative resolution,
//! and assembly of the response payload.

use std::sync::Arc;

use aqi_monitor_ai::providers::TextGenerator;
use aqi_monitor_air_models::{
    AqiCategory, NarrativeAnalysis, PollutantReading, TimeSeriesPoint,
};
use aqi_monitor_aqi::{cigarettes_per_day, resolve};
use aqi_monitor_database::NarrativeStore;
use aqi_monitor_geometry::WardRegistry;
use aqi_monitor_upstream::gather::{forecast_series, gather, history_series};
use aqi_monitor_upstream::{LiveFeedSource, PollutantSource};
use chrono::Utc;
use serde::Serialize;

use crate::fast_cache::FastCache;
use crate::narrative::resolve_narrative;
use crate::{FreshnessPolicy, ReportError};

/// The assembled per-ward report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WardReport {
    /// Human-readable ward name.
    pub ward: String,
    /// Canonical ward identifier.
    pub ward_id: String,
    /// Resolved index, or -1 when no pathway produced one.
    pub current_aqi: i64,
    pub aqi_category: AqiCategory,
    /// Equivalent daily cigarette exposure.
    pub cigarettes_count: f64,
    pub raw_pollutants: PollutantReading,
    pub history_24h: Vec<TimeSeriesPoint>,
    pub forecast_24h: Vec<TimeSeriesPoint>,
    pub analysis: NarrativeAnalysis,
}

/// Dependencies wired once at startup and shared across requests.
pub struct WardReportService {
    registry: Arc<WardRegistry>,
    live_feed: Arc<dyn LiveFeedSource>,
    pollutants: Arc<dyn PollutantSource>,
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn NarrativeStore>,
    cache: FastCache,
    policy: FreshnessPolicy,
}

impl WardReportService {
    #[must_use]
    pub fn new(
        registry: Arc<WardRegistry>,
        live_feed: Arc<dyn LiveFeedSource>,
        pollutants: Arc<dyn PollutantSource>,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn NarrativeStore>,
    ) -> Self {
        Self {
            registry,
            live_feed,
            pollutants,
            generator,
            store,
            cache: FastCache::default(),
            policy: FreshnessPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: FastCache) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: FreshnessPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &WardRegistry {
        &self.registry
    }

    /// Builds the report for one ward.
    ///
    /// Upstream and generation failures degrade the payload rather than
    /// failing the request; the only error paths are an invalid or
    /// unknown ward id and a store failure while reading state.
    ///
    /// # Errors
    ///
    /// * `ReportError::InvalidWard` when `ward_id` is blank.
    /// * `ReportError::WardNotFound` when the id is not in the registry.
    pub async fn ward_report(&self, ward_id: &str) -> Result<WardReport, ReportError> {
        let ward_id = ward_id.trim();
        if ward_id.is_empty() {
            return Err(ReportError::InvalidWard);
        }

        if let Some(report) = self.cache.get(ward_id, Utc::now()) {
            log::debug!("Fast cache hit for ward {ward_id}");
            return Ok(report);
        }

        let ward = self
            .registry
            .lookup(ward_id)
            .ok_or_else(|| ReportError::WardNotFound {
                ward_id: ward_id.to_string(),
            })?
            .clone();

        let outcome = gather(
            self.live_feed.as_ref(),
            self.pollutants.as_ref(),
            ward.latitude,
            ward.longitude,
        )
        .await;

        let reading = outcome.current.unwrap_or_default();
        if !reading.is_empty() {
            if let Err(e) = self
                .store
                .upsert_pollutants(&ward.ward_id, &reading, Utc::now())
                .await
            {
                log::error!("Failed to record pollutant snapshot for ward {ward_id}: {e}");
            }
        }

        let live_index = outcome.live.as_ref().ok().and_then(|feed| feed.aqi);
        let current_aqi = resolve(live_index, &reading);
        let cigarettes_count = cigarettes_per_day(reading.pm2_5, current_aqi);

        let history_24h = outcome
            .history
            .as_ref()
            .map(|samples| history_series(samples))
            .unwrap_or_default();
        let forecast_24h = outcome
            .forecast
            .as_ref()
            .map(|samples| forecast_series(samples))
            .unwrap_or_default();

        let analysis = resolve_narrative(
            self.store.as_ref(),
            self.generator.as_ref(),
            self.policy,
            &ward,
            current_aqi,
            &reading,
        )
        .await;

        let report = WardReport {
            ward: ward.ward_name,
            ward_id: ward.ward_id.clone(),
            current_aqi,
            aqi_category: AqiCategory::from_index(current_aqi),
            cigarettes_count,
            raw_pollutants: reading,
            history_24h,
            forecast_24h,
            analysis,
        };

        self.cache
            .insert(ward.ward_id, report.clone(), Utc::now());

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use aqi_monitor_ai::AiError;
    use aqi_monitor_air_models::{CachedNarrative, WardIdentity};
    use aqi_monitor_database::DbError;
    use aqi_monitor_upstream::{LiveFeed, RawSample, UpstreamError};
    use async_trait::async_trait;
    use chrono::DateTime;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        narratives: Mutex<BTreeMap<String, CachedNarrative>>,
        pollutants: Mutex<BTreeMap<String, PollutantReading>>,
    }

    #[async_trait]
    impl NarrativeStore for MemoryStore {
        async fn get_narrative(&self, ward_id: &str) -> Result<Option<CachedNarrative>, DbError> {
            Ok(self.narratives.lock().unwrap().get(ward_id).cloned())
        }

        async fn upsert_narrative(
            &self,
            ward_id: &str,
            analysis: &NarrativeAnalysis,
            timestamp: DateTime<chrono::Utc>,
        ) -> Result<(), DbError> {
            self.narratives.lock().unwrap().insert(
                ward_id.to_string(),
                CachedNarrative {
                    ward_id: ward_id.to_string(),
                    analysis: analysis.clone(),
                    last_updated: timestamp,
                },
            );
            Ok(())
        }

        async fn bulk_upsert_narratives(
            &self,
            entries: &[(String, NarrativeAnalysis)],
            timestamp: DateTime<chrono::Utc>,
        ) -> Result<(), DbError> {
            for (ward_id, analysis) in entries {
                self.upsert_narrative(ward_id, analysis, timestamp).await?;
            }
            Ok(())
        }

        async fn get_latest_pollutants(
            &self,
            ward_id: &str,
        ) -> Result<Option<PollutantReading>, DbError> {
            Ok(self.pollutants.lock().unwrap().get(ward_id).cloned())
        }

        async fn upsert_pollutants(
            &self,
            ward_id: &str,
            reading: &PollutantReading,
            _timestamp: DateTime<chrono::Utc>,
        ) -> Result<(), DbError> {
            self.pollutants
                .lock()
                .unwrap()
                .insert(ward_id.to_string(), reading.clone());
            Ok(())
        }
    }

    struct FakeLiveFeed {
        calls: AtomicUsize,
        aqi: Option<i64>,
    }

    #[async_trait]
    impl LiveFeedSource for FakeLiveFeed {
        async fn fetch(&self, _lat: f64, _lon: f64) -> Result<LiveFeed, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.aqi {
                Some(aqi) => Ok(LiveFeed {
                    aqi: Some(aqi),
                    station: Some("Test Station".to_string()),
                    observed_at: None,
                    reading: PollutantReading::default(),
                }),
                None => Err(UpstreamError::Timeout),
            }
        }
    }

    struct FakePollutants {
        calls: AtomicUsize,
        current: PollutantReading,
    }

    #[async_trait]
    impl PollutantSource for FakePollutants {
        async fn current(&self, _lat: f64, _lon: f64) -> Result<PollutantReading, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.current.clone())
        }

        async fn history(
            &self,
            _lat: f64,
            _lon: f64,
            _from: i64,
            _to: i64,
        ) -> Result<Vec<RawSample>, UpstreamError> {
            Ok(Vec::new())
        }

        async fn forecast(&self, _lat: f64, _lon: f64) -> Result<Vec<RawSample>, UpstreamError> {
            Ok(Vec::new())
        }
    }

    struct FakeGenerator;

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, AiError> {
            Ok(r#"{"impact_summary": "generated"}"#.to_string())
        }
    }

    fn registry() -> Arc<WardRegistry> {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"ward_id": "42", "ward_name": "Anand Vihar"},
                "geometry": {"type": "Point", "coordinates": [77.3, 28.65]}
            }]
        }"#;
        Arc::new(WardRegistry::from_geojson(geojson).unwrap())
    }

    fn service(
        live_feed: Arc<FakeLiveFeed>,
        pollutants: Arc<FakePollutants>,
    ) -> WardReportService {
        WardReportService::new(
            registry(),
            live_feed,
            pollutants,
            Arc::new(FakeGenerator),
            Arc::new(MemoryStore::default()),
        )
    }

    fn reading_pm25(value: f64) -> PollutantReading {
        PollutantReading {
            pm2_5: Some(value),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn resolves_index_from_pollutants_when_live_feed_down() {
        let live = Arc::new(FakeLiveFeed {
            calls: AtomicUsize::new(0),
            aqi: None,
        });
        let pollutants = Arc::new(FakePollutants {
            calls: AtomicUsize::new(0),
            current: reading_pm25(65.0),
        });
        let svc = service(live.clone(), pollutants);

        let report = svc.ward_report("42").await.unwrap();

        // PM2.5 of 65 falls in the (60, 90] band: 100 + (65-60)/30 * 100.
        assert_eq!(report.current_aqi, 117);
        assert_eq!(report.aqi_category, AqiCategory::Moderate);
        assert!((report.cigarettes_count - 3.0).abs() < f64::EPSILON);
        assert_eq!(report.ward, "Anand Vihar");
        assert_eq!(report.analysis.impact_summary, "generated");
    }

    #[tokio::test]
    async fn live_feed_index_takes_precedence() {
        let live = Arc::new(FakeLiveFeed {
            calls: AtomicUsize::new(0),
            aqi: Some(250),
        });
        let pollutants = Arc::new(FakePollutants {
            calls: AtomicUsize::new(0),
            current: reading_pm25(65.0),
        });
        let svc = service(live, pollutants);

        let report = svc.ward_report("42").await.unwrap();
        assert_eq!(report.current_aqi, 250);
        assert_eq!(report.aqi_category, AqiCategory::Poor);
    }

    #[tokio::test]
    async fn unknown_ward_never_reaches_upstream() {
        let live = Arc::new(FakeLiveFeed {
            calls: AtomicUsize::new(0),
            aqi: Some(100),
        });
        let pollutants = Arc::new(FakePollutants {
            calls: AtomicUsize::new(0),
            current: PollutantReading::default(),
        });
        let svc = service(live.clone(), pollutants.clone());

        let result = svc.ward_report("nope").await;
        assert!(matches!(
            result,
            Err(ReportError::WardNotFound { ward_id }) if ward_id == "nope"
        ));
        assert_eq!(live.calls.load(Ordering::SeqCst), 0);
        assert_eq!(pollutants.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_ward_id_is_invalid() {
        let live = Arc::new(FakeLiveFeed {
            calls: AtomicUsize::new(0),
            aqi: None,
        });
        let pollutants = Arc::new(FakePollutants {
            calls: AtomicUsize::new(0),
            current: PollutantReading::default(),
        });
        let svc = service(live, pollutants);

        assert!(matches!(
            svc.ward_report("   ").await,
            Err(ReportError::InvalidWard)
        ));
    }

    #[tokio::test]
    async fn repeated_requests_hit_the_fast_cache() {
        let live = Arc::new(FakeLiveFeed {
            calls: AtomicUsize::new(0),
            aqi: Some(88),
        });
        let pollutants = Arc::new(FakePollutants {
            calls: AtomicUsize::new(0),
            current: reading_pm25(20.0),
        });
        let svc = service(live.clone(), pollutants.clone());

        let first = svc.ward_report("42").await.unwrap();
        let second = svc.ward_report("42").await.unwrap();

        assert_eq!(first.current_aqi, second.current_aqi);
        assert_eq!(live.calls.load(Ordering::SeqCst), 1);
        assert_eq!(pollutants.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn snapshot_persisted_on_successful_current_fetch() {
        let store = Arc::new(MemoryStore::default());
        let svc = WardReportService::new(
            registry(),
            Arc::new(FakeLiveFeed {
                calls: AtomicUsize::new(0),
                aqi: None,
            }),
            Arc::new(FakePollutants {
                calls: AtomicUsize::new(0),
                current: reading_pm25(42.0),
            }),
            Arc::new(FakeGenerator),
            store.clone(),
        );

        svc.ward_report("42").await.unwrap();

        let snapshot = store.get_latest_pollutants("42").await.unwrap().unwrap();
        assert_eq!(snapshot.pm2_5, Some(42.0));
    }
}
