pub mod auth;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod record_id;
pub mod settings;
pub mod telemetry;

pub use record_id::RecordId;
