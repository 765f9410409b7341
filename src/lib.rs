//! Client for the core-networks DNS zone API: bearer-token sessions, record
//! CRUD, and batched changes published by a single commit.

pub mod auth;
pub mod config;
pub mod corenetworks;
pub mod error;
pub mod provider;
pub mod validation;

pub use auth::{Credentials, Session, SessionManager};
pub use config::ClientConfig;
pub use corenetworks::client::CoreNetworksClient;
pub use corenetworks::types::{Record, Tsig, Zone, ZoneDetails};
pub use error::{ClientError, Result};
pub use provider::{BatchError, BatchOp, Provider, RecordProvider};
pub use tokio_util::sync::CancellationToken;
