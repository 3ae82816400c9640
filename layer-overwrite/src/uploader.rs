//! Truncate-and-reload of one remote layer.
//!
//! Flow of [`LayerOverwriteUploader::run`]:
//!   1) resolve the layer (fatal if unknown)
//!   2) truncate it once (fatal unless the service reports success)
//!   3) for each filtered source row, in order:
//!      - no geometry: skip, no pause
//!      - attempt 1 with the geometry as read
//!      - attempt k >= 2 with the ORIGINAL geometry simplified at
//!        `tolerance * (k - 1)`, attributes untouched
//!      - pause once, whatever the outcome
//!   4) report the ids that failed every attempt
//!
//! Cancellation is checked before each row; an in-flight call is never
//! abandoned, only the pause is cut short.

use std::borrow::Cow;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    errors::{Result, UploadError},
    filter::RowFilter,
    policy::UploadPolicy,
    ports::{GeometrySimplifier, LayerResolver, RemoteLayer, SourceTable},
    record::{Record, UploadOutcome, render_unique_id, select_fields},
    report::UploadReport,
};

/// What to overwrite and how to pick the rows.
#[derive(Debug, Clone)]
pub struct OverwriteRequest {
    /// Catalog (item) id of the destination layer.
    pub item_id: String,
    pub filter: RowFilter,
    /// Field whose value identifies a record in logs and in the report.
    pub unique_id_field: String,
}

pub struct LayerOverwriteUploader<R, S> {
    resolver: R,
    simplifier: S,
    policy: UploadPolicy,
}

impl<R, S> LayerOverwriteUploader<R, S>
where
    R: LayerResolver,
    S: GeometrySimplifier,
{
    pub fn new(resolver: R, simplifier: S, policy: UploadPolicy) -> Self {
        Self {
            resolver,
            simplifier,
            policy,
        }
    }

    #[instrument(skip_all, fields(item_id = %request.item_id, filter = %request.filter))]
    pub async fn run<T: SourceTable>(
        &self,
        request: &OverwriteRequest,
        source: &T,
        cancel: &CancellationToken,
    ) -> Result<UploadReport> {
        self.policy.validate()?;

        let mut report = UploadReport::default();
        if cancel.is_cancelled() {
            warn!("cancelled before start, layer left untouched");
            report.cancelled = true;
            return Ok(report);
        }

        let fields = select_fields(&source.list_fields());
        if !fields.iter().any(|f| *f == request.unique_id_field) {
            return Err(UploadError::Config(format!(
                "unique id field '{}' is not an uploadable source field",
                request.unique_id_field
            )));
        }

        let layer = self.resolver.resolve_layer(&request.item_id).await?;
        let target = layer.describe();

        match layer.truncate().await {
            Ok(true) => info!(layer = %target, "layer truncated"),
            Ok(false) => {
                return Err(UploadError::Truncate {
                    layer: target,
                    reason: "service did not report success".into(),
                });
            }
            Err(e) => {
                return Err(UploadError::Truncate {
                    layer: target,
                    reason: e.to_string(),
                });
            }
        }

        for row in source.rows(&fields, &request.filter) {
            if cancel.is_cancelled() {
                warn!(attempted = report.attempted(), "cancelled, stopping before next row");
                report.cancelled = true;
                break;
            }

            let unique_id = render_unique_id(&row.attributes, &request.unique_id_field);
            let Some(record) = Record::from_row(row, &request.unique_id_field) else {
                info!(%unique_id, "skipping row without geometry");
                report.record_skip();
                continue;
            };

            let outcome = self.upload_record(&layer, &record).await;
            report.record(&record.unique_id, &outcome);
            self.pause(cancel).await;
        }

        report.log_summary();
        Ok(report)
    }

    async fn upload_record<L: RemoteLayer>(&self, layer: &L, record: &Record) -> UploadOutcome {
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            let candidate = if attempt == 1 {
                Cow::Borrowed(record)
            } else {
                let tolerance = self.policy.tolerance_for_attempt(attempt);
                match self.simplifier.simplify(&record.geometry, tolerance) {
                    Ok(g) => {
                        debug!(
                            unique_id = %record.unique_id,
                            attempt,
                            tolerance,
                            vertices_before = record.geometry.vertex_count(),
                            vertices_after = g.vertex_count(),
                            "geometry simplified"
                        );
                        Cow::Owned(record.with_geometry(g))
                    }
                    Err(e) => {
                        warn!(unique_id = %record.unique_id, attempt, error = %e, "simplification failed");
                        last_error = e.to_string();
                        continue;
                    }
                }
            };

            match try_add(layer, &candidate).await {
                Ok(()) if attempt == 1 => {
                    debug!(unique_id = %record.unique_id, "added");
                    return UploadOutcome::Succeeded;
                }
                Ok(()) => {
                    info!(unique_id = %record.unique_id, attempt, "added after simplification");
                    return UploadOutcome::SucceededAfterSimplification;
                }
                Err(detail) => {
                    warn!(unique_id = %record.unique_id, attempt, error = %detail, "add failed");
                    last_error = detail;
                }
            }
        }

        error!(
            unique_id = %record.unique_id,
            attempts = self.policy.max_attempts,
            error = %last_error,
            "record failed after all attempts"
        );
        UploadOutcome::Failed { last_error }
    }

    async fn pause(&self, cancel: &CancellationToken) {
        if self.policy.pause.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.policy.pause) => {}
            _ = cancel.cancelled() => debug!("pause cut short by cancellation"),
        }
    }
}

/// One add call, folded into success or a failure detail.
async fn try_add<L: RemoteLayer>(layer: &L, record: &Record) -> std::result::Result<(), String> {
    match layer.add_feature(record).await {
        Ok(result) => result.classify(),
        Err(e) => Err(e.to_string()),
    }
}
