//! HTTP fetch of the Luftdaten feed
//!
//! ## Overview
//!
//! [`LuftdatenHttpSource`] walks the configured bounding boxes in name
//! order. For each box it fetches the last-values endpoint once, maps the
//! items and hands out the records one by one before moving on.
//!
//! A box that cannot be fetched or parsed is logged and skipped; the
//! source only ends once every box was tried.
//!
//! ## Example Usage
//!
//! ```no_run
//! use airsense_connectors::{luftdaten::LuftdatenConfig, HttpConfig, Harvester, LuftdatenHttpSource};
//! use airsense_core::Resolver;
//!
//! let config = LuftdatenConfig::default().bbox("Nijmegen", [51.7, 5.6, 51.9, 6.0]);
//! let mut source = LuftdatenHttpSource::new(config, HttpConfig::default().timeout_secs(10));
//!
//! let resolver = Resolver::new()?;
//! let outputs = Harvester::new(&resolver).drain(&mut source)?;
//! println!("{} values", outputs.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use airsense_core::Record;
use log::{error, info};

use crate::luftdaten::{BBox, LuftdatenConfig};
use crate::{ConnectorError, RecordSource};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("AirSense/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Set request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Luftdaten last values over HTTP, one bounding box at a time
pub struct LuftdatenHttpSource {
    config: LuftdatenConfig,
    agent: ureq::Agent,
    bboxes: VecDeque<(String, BBox)>,
    records: VecDeque<Record>,
}

impl LuftdatenHttpSource {
    /// Source over all bounding boxes of `config`
    pub fn new(config: LuftdatenConfig, http: HttpConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(http.timeout)
            .user_agent(&http.user_agent)
            .build();
        let bboxes = config.bboxes.iter().map(|(name, bbox)| (name.clone(), *bbox)).collect();

        Self {
            config,
            agent,
            bboxes,
            records: VecDeque::new(),
        }
    }

    /// Bounding boxes not fetched yet
    pub fn remaining_bboxes(&self) -> usize {
        self.bboxes.len()
    }

    /// GET `url` as text
    pub fn fetch(&self, url: &str) -> Result<String, ConnectorError> {
        match self.agent.get(url).set("Accept", "application/json").call() {
            Ok(resp) => resp.into_string().map_err(|e| ConnectorError::Fetch(e.to_string())),
            Err(ureq::Error::Status(code, resp)) => Err(ConnectorError::Fetch(format!(
                "{} answered {}: {}",
                url,
                code,
                resp.into_string().unwrap_or_default()
            ))),
            Err(ureq::Error::Transport(e)) => Err(ConnectorError::Fetch(e.to_string())),
        }
    }

    fn load_bbox(&mut self, name: &str, bbox: &BBox) -> Result<(), ConnectorError> {
        let url = self.config.bbox_url(bbox);
        info!("Fetch bbox {} from {}", name, url);

        let body = self.fetch(&url)?;
        let records = self.config.parse_items(&body)?;
        info!("Bbox {}: {} records", name, records.len());

        self.records.extend(records);
        Ok(())
    }
}

impl RecordSource for LuftdatenHttpSource {
    fn next_record(&mut self) -> Result<Option<Record>, ConnectorError> {
        loop {
            if let Some(record) = self.records.pop_front() {
                return Ok(Some(record));
            }
            let Some((name, bbox)) = self.bboxes.pop_front() else {
                info!("All bboxes done");
                return Ok(None);
            };
            if let Err(e) = self.load_bbox(&name, &bbox) {
                error!("Error fetching bbox {}: {}, skipping", name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = HttpConfig::default().timeout_secs(5).user_agent("test");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test");
    }

    #[test]
    fn unreachable_boxes_are_skipped() {
        let config = LuftdatenConfig::new("http://127.0.0.1:9")
            .bbox("a", [0.0, 0.0, 1.0, 1.0])
            .bbox("b", [1.0, 1.0, 2.0, 2.0]);
        let mut source = LuftdatenHttpSource::new(config, HttpConfig::default().timeout_secs(2));
        assert_eq!(source.remaining_bboxes(), 2);

        assert!(source.next_record().unwrap().is_none());
        assert_eq!(source.remaining_bboxes(), 0);
    }
}
