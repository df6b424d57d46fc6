//! Per-region service quota audit and increase requests
//!
//! Publishing public images runs into the provider's per-region "Public
//! AMIs" quota. The audit lists the current quota and the most recent
//! increase-request state for every region; request mode files an increase
//! everywhere the current value is below the target.

use std::sync::Mutex;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Quota name the toolkit cares about
pub const PUBLIC_AMI_QUOTA_NAME: &str = "Public AMIs";

/// A past or pending quota increase request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRequest {
    pub desired: f64,
    pub status: String,
    pub case_id: Option<String>,
}

/// Quota state for one region
#[derive(Debug, Clone, Serialize)]
pub struct RegionQuota {
    pub region: String,

    /// Currently granted quota value
    pub current: f64,

    /// Most recent increase request, if any was ever filed
    pub last_request: Option<QuotaRequest>,
}

impl RegionQuota {
    /// Support-case column for the audit table: pending requests have no
    /// case yet, approved ones no longer need one.
    pub fn case_column(&self) -> Result<String, QuotaError> {
        let request = match &self.last_request {
            Some(request) => request,
            None => return Ok(String::new()),
        };

        match (request.status.as_str(), &request.case_id) {
            ("PENDING", _) => Ok("N/A".to_string()),
            ("APPROVED", _) => Ok("APPROVED".to_string()),
            (_, Some(case_id)) => Ok(case_id.clone()),
            (status, None) => Err(QuotaError::UnhandledRequestStatus {
                region: self.region.clone(),
                status: status.to_string(),
            }),
        }
    }
}

/// Outcome of one region in request mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IncreaseOutcome {
    /// Current quota already meets the target; nothing filed
    AlreadySufficient { region: String, current: f64 },

    /// An increase request was filed
    Requested { region: String, desired: f64 },
}

/// Cloud-provider quota operations, per region
pub trait QuotaClient: Sync {
    /// Resolve a quota name to its code; `None` when the service has no
    /// quota by that name.
    fn find_quota_code(&self, quota_name: &str) -> Result<Option<String>, QuotaError>;

    fn regions(&self) -> Result<Vec<String>, QuotaError>;

    /// Current quota value in a region; `None` when the region does not
    /// support the quota API at all.
    fn quota_value(&self, region: &str, quota_code: &str) -> Result<Option<f64>, QuotaError>;

    /// Increase-request history for a region, oldest first
    fn request_history(
        &self,
        region: &str,
        quota_code: &str,
    ) -> Result<Vec<QuotaRequest>, QuotaError>;

    fn request_increase(
        &self,
        region: &str,
        quota_code: &str,
        desired: f64,
    ) -> Result<(), QuotaError>;
}

/// Errors from quota operations
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error("No quota named {0:?} exists for the service")]
    QuotaCodeNotFound(String),

    #[error("Quota lookup in {region} failed: {reason}")]
    Lookup { region: String, reason: String },

    #[error("Quota increase request in {region} failed: {reason}")]
    Request { region: String, reason: String },

    #[error("Unhandled quota request status {status:?} in {region}")]
    UnhandledRequestStatus { region: String, status: String },
}

/// Resolve the quota code once, then audit every region in parallel.
/// Regions without quota API support are skipped; any other failure aborts
/// the audit. Rows come back sorted by region.
pub fn audit_quotas(
    client: &dyn QuotaClient,
    quota_name: &str,
    regions: &[String],
) -> Result<Vec<RegionQuota>, QuotaError> {
    let quota_code = resolve_quota_code(client, quota_name)?;

    let results: Mutex<Vec<Result<Option<RegionQuota>, QuotaError>>> = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for region in regions {
            let quota_code = &quota_code;
            let results = &results;
            scope.spawn(move || {
                let row = region_quota(client, region, quota_code);
                results.lock().unwrap().push(row);
            });
        }
    });

    let mut rows = Vec::with_capacity(regions.len());
    for result in results.into_inner().unwrap() {
        if let Some(row) = result? {
            rows.push(row);
        }
    }
    rows.sort_by(|a, b| a.region.cmp(&b.region));

    Ok(rows)
}

/// Request an increase to `target` in every region below it. Regions
/// already at or above the target are reported, not re-requested.
pub fn request_increases(
    client: &dyn QuotaClient,
    quota_name: &str,
    regions: &[String],
    target: f64,
) -> Result<Vec<IncreaseOutcome>, QuotaError> {
    let quota_code = resolve_quota_code(client, quota_name)?;

    let results: Mutex<Vec<Result<Option<IncreaseOutcome>, QuotaError>>> = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for region in regions {
            let quota_code = &quota_code;
            let results = &results;
            scope.spawn(move || {
                let outcome = region_increase(client, region, quota_code, target);
                results.lock().unwrap().push(outcome);
            });
        }
    });

    let mut outcomes = Vec::with_capacity(regions.len());
    for result in results.into_inner().unwrap() {
        if let Some(outcome) = result? {
            outcomes.push(outcome);
        }
    }
    outcomes.sort_by(|a, b| region_of(a).cmp(region_of(b)));

    Ok(outcomes)
}

fn resolve_quota_code(client: &dyn QuotaClient, quota_name: &str) -> Result<String, QuotaError> {
    match client.find_quota_code(quota_name)? {
        Some(code) => {
            info!(quota = quota_name, code = %code, "resolved quota code");
            Ok(code)
        }
        None => Err(QuotaError::QuotaCodeNotFound(quota_name.to_string())),
    }
}

fn region_quota(
    client: &dyn QuotaClient,
    region: &str,
    quota_code: &str,
) -> Result<Option<RegionQuota>, QuotaError> {
    let current = match client.quota_value(region, quota_code)? {
        Some(value) => value,
        None => {
            warn!(%region, "region does not support the quota API, skipping");
            return Ok(None);
        }
    };

    let mut history = client.request_history(region, quota_code)?;
    let last_request = history.pop();

    Ok(Some(RegionQuota {
        region: region.to_string(),
        current,
        last_request,
    }))
}

fn region_increase(
    client: &dyn QuotaClient,
    region: &str,
    quota_code: &str,
    target: f64,
) -> Result<Option<IncreaseOutcome>, QuotaError> {
    let current = match client.quota_value(region, quota_code)? {
        Some(value) => value,
        None => {
            warn!(%region, "region does not support the quota API, skipping");
            return Ok(None);
        }
    };

    if current >= target {
        return Ok(Some(IncreaseOutcome::AlreadySufficient {
            region: region.to_string(),
            current,
        }));
    }

    client.request_increase(region, quota_code, target)?;
    info!(%region, desired = target, "filed quota increase request");

    Ok(Some(IncreaseOutcome::Requested {
        region: region.to_string(),
        desired: target,
    }))
}

fn region_of(outcome: &IncreaseOutcome) -> &str {
    match outcome {
        IncreaseOutcome::AlreadySufficient { region, .. } => region,
        IncreaseOutcome::Requested { region, .. } => region,
    }
}
