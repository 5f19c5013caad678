// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Build and submit [Cloud Run] jobs.
//!
//! This crate creates a single Cloud Run job from a small configuration:
//! the container image, its arguments, the service account the job runs as,
//! the task timeout, and the task retry policy. The job is created with the
//! [Cloud Run Admin API], and the crate waits until the creation completes.
//!
//! Creating the job does not execute it. Executions, retries, and scheduling
//! are handled by Cloud Run.
//!
//! # Example
//! ```no_run
//! use cloud_run_job::{CancellationToken, EnvSecret, JobSpec};
//! # async fn sample() -> cloud_run_job::Result<()> {
//! let name = JobSpec::new(
//!     "nightly-report",
//!     "my-project",
//!     "us-central1",
//!     "us-docker.pkg.dev/cloudrun/container/job:latest",
//!     "runner@my-project.iam.gserviceaccount.com",
//! )
//! .with_timeout("30m")
//! .with_args(["--date", "today"])
//! .submit(&EnvSecret::new("DEPLOYER_KEY"), &CancellationToken::new())
//! .await?;
//! println!("created {name}");
//! # Ok(()) }
//! ```
//!
//! [Cloud Run]: https://cloud.google.com/run
//! [Cloud Run Admin API]: https://cloud.google.com/run/docs/reference/rest

/// An alias of [std::result::Result] where the error is always [Error].
pub type Result<T> = std::result::Result<T, Error>;

pub use tokio_util::sync::CancellationToken;

mod connector;
pub use connector::{Connector, DefaultConnector};

mod error;
pub use error::Error;

mod job;
pub use job::{Capability, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT, JobSpec};

pub mod secret;
pub use secret::{EnvSecret, FileSecret, Secret, SecretManagerSecret, SecretSource};

mod submit;
pub use submit::{Stage, Submitter, SubmitterBuilder};

pub mod timeout;

/// The error type returned by [SecretSource] and [Connector] implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
