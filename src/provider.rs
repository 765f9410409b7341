//! Batch record operations for DNS-management hosts (ACME DNS-01 solvers and
//! the like). Every mutating batch follows the same protocol: mutate record
//! by record, then commit the zone exactly once.
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::corenetworks::client::CoreNetworksClient;
use crate::corenetworks::types::{Record, Zone, ZoneDetails};
use crate::error::{ClientError, Result};
use crate::validation::normalize_zone;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOp {
    Append,
    Set,
    Delete,
}

impl fmt::Display for BatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOp::Append => write!(f, "append"),
            BatchOp::Set => write!(f, "set"),
            BatchOp::Delete => write!(f, "delete"),
        }
    }
}

/// A batch stopped early or failed to commit. `applied` holds the records the
/// API accepted before that; they may or may not be live, so re-fetch.
#[derive(Debug, Error)]
#[error("{operation} on zone {zone} failed after {} applied record(s): {source}", .applied.len())]
pub struct BatchError {
    pub operation: BatchOp,
    pub zone: String,
    pub applied: Vec<Record>,
    #[source]
    pub source: ClientError,
}

/// The four verbs a record-management host needs.
#[async_trait]
pub trait RecordProvider: Send + Sync {
    async fn get_records(&self, zone: &str, cancel: &CancellationToken) -> Result<Vec<Record>>;

    /// Create records whose (name, type) is not present yet. Returns the
    /// records created.
    async fn append_records(
        &self,
        zone: &str,
        records: &[Record],
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, BatchError>;

    /// Create or update records. Returns the records applied.
    async fn set_records(
        &self,
        zone: &str,
        records: &[Record],
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, BatchError>;

    /// Delete records. Returns the records the API accepted for deletion.
    async fn delete_records(
        &self,
        zone: &str,
        records: &[Record],
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, BatchError>;
}

/// Collects per-record successes of one batch.
struct Batch<'a> {
    operation: BatchOp,
    zone: &'a str,
    applied: Vec<Record>,
}

impl<'a> Batch<'a> {
    fn new(operation: BatchOp, zone: &'a str) -> Self {
        Self {
            operation,
            zone,
            applied: Vec::new(),
        }
    }

    fn fail(self, source: ClientError) -> BatchError {
        BatchError {
            operation: self.operation,
            zone: self.zone.to_string(),
            applied: self.applied,
            source,
        }
    }

    /// Record the outcome of one mutation. Transport failures and
    /// cancellation end the batch; anything else only drops the record.
    fn settle(&mut self, record: &Record, outcome: Result<Record>) -> Result<(), ClientError> {
        match outcome {
            Ok(applied) => {
                self.applied.push(applied);
                Ok(())
            }
            Err(err) if err.is_transport() => Err(err),
            Err(err) => {
                warn!(
                    operation = %self.operation,
                    zone = self.zone,
                    name = %record.name,
                    rtype = %record.rtype,
                    "skipping record: {err}"
                );
                Ok(())
            }
        }
    }
}

/// Reconciles desired records against one core-networks account.
#[derive(Clone, Debug)]
pub struct Provider {
    client: CoreNetworksClient,
}

impl Provider {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: CoreNetworksClient::new(config)?,
        })
    }

    pub fn from_client(client: CoreNetworksClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CoreNetworksClient {
        &self.client
    }

    pub async fn zones(&self, cancel: &CancellationToken) -> Result<Vec<Zone>> {
        self.client.list_zones(cancel).await
    }

    pub async fn zone(&self, zone: &str, cancel: &CancellationToken) -> Result<ZoneDetails> {
        self.client.zone_details(zone, cancel).await
    }

    fn zone_name<'z>(operation: BatchOp, zone: &'z str) -> Result<&'z str, BatchError> {
        normalize_zone(zone).map_err(|err| Batch::new(operation, zone).fail(err.into()))
    }

    /// Commit once and hand back what was applied.
    async fn finish(
        &self,
        batch: Batch<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, BatchError> {
        match self.client.commit(batch.zone, cancel).await {
            Ok(()) => Ok(batch.applied),
            Err(err) => Err(batch.fail(err)),
        }
    }
}

#[async_trait]
impl RecordProvider for Provider {
    async fn get_records(&self, zone: &str, cancel: &CancellationToken) -> Result<Vec<Record>> {
        let zone = normalize_zone(zone)?;
        self.client.list_records(zone, cancel).await
    }

    async fn append_records(
        &self,
        zone: &str,
        records: &[Record],
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, BatchError> {
        let zone = Self::zone_name(BatchOp::Append, zone)?;
        let mut batch = Batch::new(BatchOp::Append, zone);

        let existing = match self.client.list_records(zone, cancel).await {
            Ok(existing) => existing,
            Err(err) => return Err(batch.fail(err)),
        };

        for record in records {
            if existing.iter().any(|e| e.same_name_and_type(record)) {
                debug!(zone, name = %record.name, rtype = %record.rtype, "record exists, not appending");
                continue;
            }
            let outcome = self.client.create_record(zone, record, cancel).await;
            if let Err(err) = batch.settle(record, outcome) {
                return Err(batch.fail(err));
            }
        }

        self.finish(batch, cancel).await
    }

    async fn set_records(
        &self,
        zone: &str,
        records: &[Record],
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, BatchError> {
        let zone = Self::zone_name(BatchOp::Set, zone)?;
        let mut batch = Batch::new(BatchOp::Set, zone);

        for record in records {
            let outcome = self.client.create_record(zone, record, cancel).await;
            if let Err(err) = batch.settle(record, outcome) {
                return Err(batch.fail(err));
            }
        }

        self.finish(batch, cancel).await
    }

    async fn delete_records(
        &self,
        zone: &str,
        records: &[Record],
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, BatchError> {
        let zone = Self::zone_name(BatchOp::Delete, zone)?;
        let mut batch = Batch::new(BatchOp::Delete, zone);

        for record in records {
            let outcome = self.client.delete_record(zone, record, cancel).await;
            if let Err(err) = batch.settle(record, outcome) {
                return Err(batch.fail(err));
            }
        }

        self.finish(batch, cancel).await
    }
}
