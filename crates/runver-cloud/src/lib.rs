//! gcloud-backed cloud operations for runver.
//!
//! Everything goes through [`GcloudExecutor`], so the orchestration logic in
//! [`readiness`], [`iam`] and [`secret`] is tested against mocks.

pub mod client;
pub mod executor;
pub mod gcloud;
pub mod iam;
pub mod readiness;
pub mod secret;

pub use client::{BuildOutput, CloudBuildError, DeployError, GcloudClient};
pub use executor::{GcloudExecutor, RealExecutor};
pub use gcloud::GcloudError;
pub use iam::{Grant, IamError, IamPolicy, IamResource};
pub use readiness::{PollPolicy, ReadinessError, ResourceKind};
pub use secret::SecretError;
