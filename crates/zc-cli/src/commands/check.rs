use anyhow::Result;
use tracing::{info, warn};
use zc_config::Settings;
use zc_reconcile::{wire::WireReport, ZoneState};
use zc_store::{CheckRequest, S3Store, ZoneChecker};

/// One reconciliation against the live stores.
///
/// Request errors (no bucket, unknown zone, empty key) fail the command;
/// unreachable zones show up as `Unknown` in the report.
pub async fn run(
    settings: &Settings,
    key: &str,
    current_zone: &str,
    bucket: Option<&str>,
) -> Result<WireReport> {
    let stores = S3Store::connect_all(&settings.registry, &settings.credentials, &settings.region);
    let checker = ZoneChecker::from_settings(settings, stores);
    info!(key, current_zone, zones = settings.registry.len(), "checking");

    let report = checker
        .check(CheckRequest {
            key,
            current_zone,
            bucket,
        })
        .await?;

    for z in report.per_zone.iter().filter(|z| z.state == ZoneState::Unknown) {
        warn!(
            zone = %z.zone_name,
            error = z.error.as_deref().unwrap_or("-"),
            "zone unreachable"
        );
    }
    info!(
        consistent = report.consistent,
        recommended = report.recommended_zone.as_deref().unwrap_or("-"),
        "check finished"
    );
    Ok(WireReport::from(&report))
}
