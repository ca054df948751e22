//! Harvest loop
//!
//! Pulls records from a [`RecordSource`], resolves each through the
//! [`Resolver`] and collects the accepted outputs. A record that yields no
//! output at all is logged and counted as skipped; single rejected fields
//! are only counted, the resolver already logged them.

use airsense_core::{OutputValue, Record, Resolver};
use log::{debug, info, warn};

use crate::{ConnectorError, RecordSource};

/// Counters of one harvester
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HarvestStats {
    /// Records pulled from sources
    pub records: u64,
    /// Accepted output values
    pub outputs: u64,
    /// Rejected fields over all records
    pub rejections: u64,
    /// Records that produced no output
    pub skipped: u64,
}

/// Drives records through a resolver
pub struct Harvester<'r> {
    resolver: &'r Resolver,
    stats: HarvestStats,
}

impl<'r> Harvester<'r> {
    /// Harvester resolving with `resolver`
    pub fn new(resolver: &'r Resolver) -> Self {
        Self {
            resolver,
            stats: HarvestStats::default(),
        }
    }

    /// Counters so far
    pub fn stats(&self) -> HarvestStats {
        self.stats
    }

    /// Resolve one record, returning its accepted outputs
    ///
    /// Records of an unknown device type are skipped, not failed: a feed
    /// may carry stations this deployment has no registry for.
    pub fn harvest(&mut self, record: &Record) -> Vec<OutputValue> {
        self.stats.records += 1;

        let outcome = match self.resolver.resolve_record(record) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Skipping record of {}: {}", record.device_id, e);
                self.stats.skipped += 1;
                return Vec::new();
            }
        };

        self.stats.rejections += outcome.rejected().count() as u64;

        let outputs = outcome.outputs();
        if outputs.is_empty() {
            info!("No values produced for device {}, skipping record", record.device_id);
            self.stats.skipped += 1;
        } else {
            debug!("Device {}: {} values", record.device_id, outputs.len());
            self.stats.outputs += outputs.len() as u64;
        }
        outputs
    }

    /// Harvest until `source` is exhausted
    pub fn drain<S: RecordSource + ?Sized>(&mut self, source: &mut S) -> Result<Vec<OutputValue>, ConnectorError> {
        let mut outputs = Vec::new();
        while let Some(record) = source.next_record()? {
            outputs.extend(self.harvest(&record));
        }
        info!(
            "Harvest done: {} records, {} values, {} skipped",
            self.stats.records, self.stats.outputs, self.stats.skipped
        );
        Ok(outputs)
    }
}
