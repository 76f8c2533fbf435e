pub mod client;
pub mod engine;
pub mod error;
pub mod instance;
pub mod schema;

// Re-export the pieces a host needs to drive a reconciliation
pub use client::{ClientSettings, HttpXsoarClient, XsoarApi};
pub use engine::{InstanceReconciler, ReadOutcome};
pub use error::{Diagnostic, Operation, ReconcileError};
pub use instance::{InstanceLoader, IntegrationInstance};
