//! gRPC server implementing the `rates.RateService` service.

use std::sync::Arc;
use std::sync::atomic::Ordering::Relaxed;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use tonic::{Request, Response, Status};
use tracing::warn;

use crate::metrics::Metrics;
use crate::service::RatesProvider;
use crate::types::Rate;

#[allow(clippy::pedantic)] // Generated code.
pub mod proto {
    tonic::include_proto!("rates");
}

use proto::rate_service_server::{RateService, RateServiceServer};

/// Status string returned by `HealthCheck`.
pub const HEALTHY: &str = "OK";

/// Adapts gRPC calls onto a [`RatesProvider`].
pub struct RateHandler {
    provider: Option<Arc<dyn RatesProvider>>,
    metrics: Arc<Metrics>,
}

impl RateHandler {
    pub fn new(provider: Arc<dyn RatesProvider>, metrics: Arc<Metrics>) -> Self {
        Self {
            provider: Some(provider),
            metrics,
        }
    }

    /// Handler without a pipeline behind it. Only `HealthCheck` succeeds.
    pub fn unconfigured(metrics: Arc<Metrics>) -> Self {
        Self {
            provider: None,
            metrics,
        }
    }

    #[must_use]
    pub fn into_service(self) -> RateServiceServer<Self> {
        RateServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl RateService for RateHandler {
    async fn get_rates(
        &self,
        _request: Request<proto::Empty>,
    ) -> Result<Response<proto::RateResponse>, Status> {
        self.metrics.get_rates_requests.fetch_add(1, Relaxed);
        let Some(provider) = &self.provider else {
            return Err(Status::unavailable("rate service is not configured"));
        };

        let t0 = Instant::now();
        let result = provider.get_and_store_rates().await;
        self.metrics.pipeline_latency.record(t0.elapsed());

        match result {
            Ok(rate) => {
                self.metrics.rates_served.fetch_add(1, Relaxed);
                Ok(Response::new(to_proto(&rate)))
            }
            // Every cause maps to the same code; only the message differs.
            Err(e) => {
                self.metrics.record_failure(e.kind());
                warn!(kind = e.kind(), error = %e, "GetRates failed");
                Err(Status::unknown(e.to_string()))
            }
        }
    }

    async fn health_check(
        &self,
        _request: Request<proto::Empty>,
    ) -> Result<Response<proto::HealthStatus>, Status> {
        self.metrics.health_checks.fetch_add(1, Relaxed);
        Ok(Response::new(proto::HealthStatus {
            status: HEALTHY.to_owned(),
        }))
    }
}

/// RFC 3339 in UTC with whole seconds, e.g. `2025-07-24T00:00:00Z`.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn to_proto(rate: &Rate) -> proto::RateResponse {
    proto::RateResponse {
        ask: rate.ask(),
        bid: rate.bid(),
        timestamp: format_timestamp(rate.timestamp()),
    }
}
