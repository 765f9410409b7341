use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Canonical in-memory record. The only record shape handed to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    pub name: String, // relative to the zone, "@" for the apex
    pub rtype: String,
    pub data: String,
    pub ttl: Duration,
}

impl Record {
    pub fn new(
        name: impl Into<String>,
        rtype: impl Into<String>,
        data: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            rtype: rtype.into(),
            data: data.into(),
            ttl,
        }
    }

    /// Existence check used by append: same name and type, data ignored.
    pub fn same_name_and_type(&self, other: &Record) -> bool {
        self.name == other.name && self.rtype == other.rtype
    }

    /// Parse a record from the list endpoint. A TTL that is not an integer
    /// number of seconds is an error, never a silent zero.
    pub fn from_wire_read(wire: WireRecordRead, zone: &str) -> Result<Record> {
        let ttl = wire
            .ttl
            .trim()
            .parse::<u64>()
            .map_err(|_| ClientError::InvalidTtl {
                zone: zone.to_string(),
                name: wire.name.clone(),
                value: wire.ttl.clone(),
            })?;

        Ok(Record {
            name: wire.name,
            rtype: wire.rtype,
            data: wire.data,
            ttl: Duration::from_secs(ttl),
        })
    }

    pub fn from_wire_write(wire: WireRecordWrite) -> Record {
        Record {
            name: wire.name,
            rtype: wire.rtype,
            data: wire.data,
            ttl: Duration::from_secs(wire.ttl),
        }
    }

    /// Body for the create and delete endpoints. Sub-second TTL is dropped.
    pub fn to_wire_write(&self) -> WireRecordWrite {
        WireRecordWrite {
            name: self.name.clone(),
            ttl: self.ttl.as_secs(),
            rtype: self.rtype.clone(),
            data: self.data.clone(),
        }
    }
}

impl From<WireRecordWrite> for Record {
    fn from(wire: WireRecordWrite) -> Self {
        Record::from_wire_write(wire)
    }
}

impl From<&Record> for WireRecordWrite {
    fn from(record: &Record) -> Self {
        record.to_wire_write()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.name,
            self.ttl.as_secs(),
            self.rtype,
            self.data
        )
    }
}

/// Record body accepted by create/delete. Empty fields are left out of the
/// JSON one by one; the API reads a missing field as "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecordWrite {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub ttl: u64,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub rtype: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
}

/// Record as returned by the list endpoint, TTL encoded as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WireRecordRead {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ttl: String,
    #[serde(rename = "type", default)]
    pub rtype: String,
    #[serde(default)]
    pub data: String,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    #[serde(rename = "type")]
    pub zone_type: String, // "master" / "slave"
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDetails {
    pub name: String,
    #[serde(rename = "type")]
    pub zone_type: String,
    #[serde(default)]
    pub active: bool,
    #[serde(rename = "dnssec", alias = "dnssecEnabled", default)]
    pub dnssec_enabled: bool,
    /// Primary server address, only set for secondary zones.
    #[serde(default)]
    pub master: Option<String>,
    #[serde(default)]
    pub tsig: Option<Tsig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tsig {
    #[serde(rename = "algo", alias = "algorithm", default)]
    pub algorithm: String,
    #[serde(default)]
    pub secret: String,
}
