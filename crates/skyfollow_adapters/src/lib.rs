pub mod auth;
pub mod configuration;
pub mod credentials;
pub mod csv_files;
pub mod network;
pub mod sleeper;
pub mod telemetry;
pub mod xrpc;

#[cfg(test)]
mod test_server;

// Re-exports for convenience
pub use auth::XrpcAuthenticator;
pub use credentials::KeyringCredentialStore;
pub use csv_files::{CsvOutcomeSink, CsvRecordSource};
pub use sleeper::TokioSleeper;
pub use xrpc::XrpcTransport;
