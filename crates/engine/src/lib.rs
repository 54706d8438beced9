//! `fieldtally-engine` — harvest-scan verification engine.
//!
//! Reconciles creator (data-entry) scan rows against verifier re-scans by
//! business transaction number, detects field-level discrepancies, and rolls
//! verification/quality metrics up per employee, division, and estate.
//!
//! Pure engine crate: records arrive through the [`gateway`] traits, results
//! leave as typed, serializable summaries. No file IO, no SQL, no CLI.

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod detect;
pub mod error;
pub mod gateway;
pub mod model;
pub mod orchestrate;
pub mod period;
pub mod policy;
pub mod role;

pub use compare::DifferencePolicy;
pub use config::EngineConfig;
pub use error::EngineError;
pub use gateway::{CachedDirectory, EmployeeDirectory, GatewayError, RecordGateway};
pub use model::{DivisionSummary, EmployeeMetrics, EstateRunResult, RawRecord, Role, RunResult};
pub use orchestrate::{run_estates, CancelFlag, EstateUnit};
pub use period::{plan_periods, PeriodKey};
pub use role::RoleResolver;
