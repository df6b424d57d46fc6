//! Cloud collaborators backed by the `aws` CLI
//!
//! The toolkit deliberately carries no cloud SDK. Every provider call goes
//! through the `aws` command with `--output json`, inheriting credentials,
//! profile, and retry behavior from the operator's environment, and the
//! CLI's built-in pagination exhausts listings before results come back.
//! These adapters only build argv, run the subprocess, and decode JSON;
//! everything interesting happens in the pure modules they feed.

use std::process::Command;

use serde_json::Value;
use tracing::debug;

use crate::listing::{ListingError, ObjectLister};
use crate::quota::{QuotaClient, QuotaError, QuotaRequest};
use crate::regions::{ImageInventory, InventoryError, PublicImage};

/// Errors from running the `aws` CLI
#[derive(Debug, thiserror::Error)]
pub enum AwsCliError {
    #[error("Could not run aws CLI: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("aws {command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("aws {1} returned unparseable JSON: {0}")]
    BadJson(#[source] serde_json::Error, String),
}

/// `aws` CLI handle: one service code and one default region for the
/// storage-side calls
#[derive(Debug, Clone)]
pub struct AwsCli {
    /// Region used for object-storage calls (buckets are regional)
    pub storage_region: String,

    /// Service the quota calls are scoped to
    pub service_code: String,
}

impl AwsCli {
    pub fn new(storage_region: impl Into<String>) -> Self {
        Self {
            storage_region: storage_region.into(),
            service_code: "ec2".to_string(),
        }
    }

    /// Run one `aws` invocation and decode its JSON output.
    ///
    /// `Value::Null` is returned for empty output; `--query` expressions
    /// that select nothing produce that or a JSON `null`.
    fn run(&self, args: &[&str]) -> Result<Value, AwsCliError> {
        let command = args.join(" ");
        debug!(%command, "running aws CLI");

        let output = Command::new("aws")
            .args(args)
            .args(["--output", "json"])
            .output()?;

        if !output.status.success() {
            return Err(AwsCliError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&stdout).map_err(|err| AwsCliError::BadJson(err, command))
    }

    fn string_array(value: Value) -> Vec<String> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl ObjectLister for AwsCli {
    fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, ListingError> {
        let value = self
            .run(&[
                "s3api",
                "list-objects-v2",
                "--bucket",
                bucket,
                "--prefix",
                prefix,
                "--region",
                &self.storage_region,
                "--query",
                "Contents[].Key",
            ])
            .map_err(|err| ListingError::Retrieval {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                reason: err.to_string(),
            })?;

        Ok(Self::string_array(value))
    }
}

impl ImageInventory for AwsCli {
    fn regions(&self) -> Result<Vec<String>, InventoryError> {
        let value = self
            .run(&["ec2", "describe-regions", "--query", "Regions[].RegionName"])
            .map_err(|err| InventoryError::Regions {
                reason: err.to_string(),
            })?;

        Ok(Self::string_array(value))
    }

    fn public_images(&self, region: &str) -> Result<Vec<PublicImage>, InventoryError> {
        let value = self
            .run(&[
                "ec2",
                "describe-images",
                "--owners",
                "self",
                "--filters",
                "Name=is-public,Values=true",
                "--region",
                region,
                "--query",
                "Images[].{id: ImageId, name: Name}",
            ])
            .map_err(|err| InventoryError::Fetch {
                region: region.to_string(),
                reason: err.to_string(),
            })?;

        if value.is_null() {
            return Ok(Vec::new());
        }

        serde_json::from_value(value).map_err(|err| InventoryError::Fetch {
            region: region.to_string(),
            reason: format!("unexpected image list shape: {err}"),
        })
    }
}

impl QuotaClient for AwsCli {
    fn find_quota_code(&self, quota_name: &str) -> Result<Option<String>, QuotaError> {
        let query = format!("Quotas[?QuotaName=='{quota_name}'].QuotaCode");
        let value = self
            .run(&[
                "service-quotas",
                "list-service-quotas",
                "--service-code",
                &self.service_code,
                "--query",
                &query,
            ])
            .map_err(|err| QuotaError::Lookup {
                region: "default".to_string(),
                reason: err.to_string(),
            })?;

        Ok(Self::string_array(value).into_iter().next())
    }

    fn regions(&self) -> Result<Vec<String>, QuotaError> {
        ImageInventory::regions(self).map_err(|err| QuotaError::Lookup {
            region: "default".to_string(),
            reason: err.to_string(),
        })
    }

    fn quota_value(&self, region: &str, quota_code: &str) -> Result<Option<f64>, QuotaError> {
        let result = self.run(&[
            "service-quotas",
            "get-service-quota",
            "--service-code",
            &self.service_code,
            "--quota-code",
            quota_code,
            "--region",
            region,
            "--query",
            "Quota.Value",
        ]);

        match result {
            Ok(value) => Ok(value.as_f64()),
            // Some regions have no Service Quotas endpoint at all
            Err(AwsCliError::Failed { ref stderr, .. })
                if stderr.contains("UnknownOperationException") =>
            {
                Ok(None)
            }
            Err(err) => Err(QuotaError::Lookup {
                region: region.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    fn request_history(
        &self,
        region: &str,
        quota_code: &str,
    ) -> Result<Vec<QuotaRequest>, QuotaError> {
        let value = self
            .run(&[
                "service-quotas",
                "list-requested-service-quota-change-history-by-quota",
                "--service-code",
                &self.service_code,
                "--quota-code",
                quota_code,
                "--region",
                region,
                "--query",
                "RequestedQuotas[].{desired: DesiredValue, status: Status, case_id: CaseId}",
            ])
            .map_err(|err| QuotaError::Lookup {
                region: region.to_string(),
                reason: err.to_string(),
            })?;

        if value.is_null() {
            return Ok(Vec::new());
        }

        serde_json::from_value(value).map_err(|err| QuotaError::Lookup {
            region: region.to_string(),
            reason: format!("unexpected request history shape: {err}"),
        })
    }

    fn request_increase(
        &self,
        region: &str,
        quota_code: &str,
        desired: f64,
    ) -> Result<(), QuotaError> {
        let desired = desired.to_string();
        self.run(&[
            "service-quotas",
            "request-service-quota-increase",
            "--service-code",
            &self.service_code,
            "--quota-code",
            quota_code,
            "--desired-value",
            &desired,
            "--region",
            region,
        ])
        .map_err(|err| QuotaError::Request {
            region: region.to_string(),
            reason: err.to_string(),
        })?;

        Ok(())
    }
}
