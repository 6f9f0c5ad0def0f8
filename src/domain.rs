//! ==============================================================================
//! domain.rs - readings, history and caller authorities
//! ==============================================================================
//!
//! purpose:
//!     the plain data types shared by the fetch loop, the store and the api.
//!     nothing in here touches the network or the filesystem.
//!
//! relationships:
//!     - used by: store.rs (persists History), fetcher.rs (builds Readings),
//!       api.rs (serves Readings), auth.rs / config.rs (Authority)
//!
//! ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// one timestamped temperature sample
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// instant the sample was taken (utc, rfc 3339 on the wire)
    pub timestamp: DateTime<Utc>,
    /// temperature in celsius, as reported by the provider
    pub temperature: f64,
    /// any other fields found on a stored record; written back untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, temperature: f64) -> Self {
        Self {
            timestamp,
            temperature,
            extra: serde_json::Map::new(),
        }
    }

    /// a reading stamped with the current instant
    pub fn now(temperature: f64) -> Self {
        Self::new(Utc::now(), temperature)
    }
}

/// the capped, insertion-ordered sequence of readings
///
/// serialized as a bare json array so the file format stays
/// `[ {..}, {..} ]` with the latest reading last.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<Reading>);

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// append a reading, then drop from the front until at most `max_entries`
    /// remain. returns how many readings were evicted.
    pub fn push_capped(&mut self, reading: Reading, max_entries: usize) -> usize {
        self.0.push(reading);
        let excess = self.0.len().saturating_sub(max_entries);
        if excess > 0 {
            self.0.drain(..excess);
        }
        excess
    }

    /// the most recently appended reading
    pub fn latest(&self) -> Option<&Reading> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn readings(&self) -> &[Reading] {
        &self.0
    }
}

impl From<Vec<Reading>> for History {
    fn from(readings: Vec<Reading>) -> Self {
        Self(readings)
    }
}

/// capability attached to an authenticated caller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Authority {
    Admin,
    User,
    Anonymous,
}

impl Authority {
    /// authorities allowed to read sensor data
    pub const READERS: [Authority; 2] = [Authority::Admin, Authority::User];

    pub fn can_read_sensors(self) -> bool {
        Self::READERS.contains(&self)
    }
}
