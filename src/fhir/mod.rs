//! Remote FHIR R4 collaborator: record sync (read path) and publish (write path).

pub mod adapter;
pub mod client;
pub mod codes;
pub mod normalize;
pub mod publish;
pub mod resources;

pub use adapter::*;
pub use client::*;
pub use codes::*;
pub use normalize::*;
pub use publish::*;
pub use resources::*;

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("FHIR server is not reachable at {0}")]
    Connection(String),

    #[error("FHIR request timed out after {0}s")]
    Timeout(u64),

    #[error("FHIR server returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed FHIR response: {0}")]
    Malformed(String),

    #[error("Patient {0} is unknown to the FHIR server")]
    NotFound(String),

    #[error("Every lookup for patient {0} failed")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
