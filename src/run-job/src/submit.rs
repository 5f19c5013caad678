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

use crate::connector::{Connector, DefaultConnector};
use crate::error::Error;
use crate::job::JobSpec;
use crate::secret::SecretSource;
use crate::{CancellationToken, Result};
use google_cloud_longrunning::model::Operation;
use google_cloud_longrunning::model::operation::Result as OperationResult;
use google_cloud_run_v2::client::Jobs;
use google_cloud_run_v2::model::Job;
use std::future::Future;
use std::time::Duration;

const DEFAULT_INITIAL_POLL_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAXIMUM_POLL_DELAY: Duration = Duration::from_secs(10);

/// The stages of a job submission.
///
/// A submission starts in `Unsubmitted` and moves through the stages in order
/// until it reaches `Succeeded` or `Failed`. Errors report the stage where
/// they happened, see [Error::stage].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Stage {
    /// The job configuration is being validated.
    Unsubmitted,
    /// The credential is being resolved and the client created.
    Authenticating,
    /// The client is ready, the request has not been sent.
    ClientReady,
    /// The `CreateJob` request is in flight.
    RequestSent,
    /// The service accepted the request, waiting for the operation.
    AwaitingOperation,
    /// The job was created.
    Succeeded,
    /// The submission failed.
    Failed,
}

impl Stage {
    /// Returns true for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unsubmitted => "unsubmitted",
            Self::Authenticating => "authenticating",
            Self::ClientReady => "client ready",
            Self::RequestSent => "request sent",
            Self::AwaitingOperation => "awaiting operation",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Creates Cloud Run jobs and waits for their creation to complete.
///
/// # Example
/// ```no_run
/// # use cloud_run_job::{CancellationToken, FileSecret, JobSpec, Submitter};
/// # async fn sample() -> cloud_run_job::Result<()> {
/// let submitter = Submitter::builder()
///     .with_wait_timeout(std::time::Duration::from_secs(300))
///     .build();
/// let spec = JobSpec::new(
///     "nightly-report",
///     "my-project",
///     "us-central1",
///     "us-docker.pkg.dev/cloudrun/container/job:latest",
///     "runner@my-project.iam.gserviceaccount.com",
/// );
/// let secret = FileSecret::new("deployer-key.json");
/// let name = submitter.submit(spec, &secret, &CancellationToken::new()).await?;
/// println!("created {name}");
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct Submitter<C = DefaultConnector> {
    connector: C,
    initial_poll_delay: Duration,
    maximum_poll_delay: Duration,
    wait_timeout: Option<Duration>,
}

impl Submitter {
    /// Returns a builder to configure a submitter.
    pub fn builder() -> SubmitterBuilder {
        SubmitterBuilder::default()
    }
}

impl Default for Submitter {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<C> Submitter<C>
where
    C: Connector,
{
    /// Creates the job described by `spec` and waits until the creation
    /// completes.
    ///
    /// Returns the full resource name of the job, in the form
    /// `projects/{project}/locations/{location}/jobs/{name}`.
    ///
    /// The timeout is validated before the secret is resolved, so invalid
    /// configurations fail without any network requests. The Cloud Run client
    /// is created for this call only, and released before the function
    /// returns.
    ///
    /// If `cancel` is cancelled, any pending request is abandoned and the
    /// function returns an error with [Error::is_cancelled]. Note that if the
    /// request was already sent the job may still be created, see
    /// [Error::resource_may_exist].
    ///
    /// This function does not retry. Creating the same job twice fails with
    /// an `ALREADY_EXISTS` error from the service.
    #[tracing::instrument(skip_all, fields(job = %spec.name(), project = %spec.project(), location = %spec.location()))]
    pub async fn submit<S>(&self, spec: JobSpec, secret: &S, cancel: &CancellationToken) -> Result<String>
    where
        S: SecretSource,
    {
        let result = self.run(spec, secret, cancel).await;
        match &result {
            Ok(name) => tracing::info!(stage = %Stage::Succeeded, "created job {name}"),
            Err(e) => tracing::warn!(stage = %Stage::Failed, failed_in = %e.stage(), "cannot create job: {e}"),
        }
        result
    }

    async fn run<S>(&self, spec: JobSpec, secret: &S, cancel: &CancellationToken) -> Result<String>
    where
        S: SecretSource,
    {
        let request = spec.to_request()?;
        let fallback_name = spec.resource_name();

        tracing::info!(stage = %Stage::Authenticating, "resolving credential");
        let credential = cancellable(cancel, Stage::Authenticating, secret.plaintext())
            .await?
            .map_err(Error::credential)?;
        let client = cancellable(cancel, Stage::Authenticating, self.connector.connect(credential))
            .await?
            .map_err(Error::client_init)?;

        // `client` is dropped on every path out of this function.
        tracing::info!(stage = %Stage::ClientReady, "client ready");
        if cancel.is_cancelled() {
            return Err(Error::cancelled(Stage::ClientReady));
        }
        let send = client.create_job().with_request(request).send();
        tracing::info!(stage = %Stage::RequestSent, "sending create job request");
        let operation = cancellable(cancel, Stage::RequestSent, send)
            .await?
            .map_err(Error::submission)?;

        tracing::info!(stage = %Stage::AwaitingOperation, operation = %operation.name, "waiting for operation");
        let job = cancellable(cancel, Stage::AwaitingOperation, self.wait(&client, operation)).await??;
        if job.name.is_empty() {
            tracing::debug!("the operation response has no job name, using {fallback_name}");
            return Ok(fallback_name);
        }
        Ok(job.name)
    }

    async fn wait(&self, client: &Jobs, operation: Operation) -> Result<Job> {
        let Some(limit) = self.wait_timeout else {
            return self.poll_until_done(client, operation).await;
        };
        match tokio::time::timeout(limit, self.poll_until_done(client, operation)).await {
            Ok(result) => result,
            Err(_) => Err(Error::operation(format!(
                "the operation did not complete within {limit:?}"
            ))),
        }
    }

    async fn poll_until_done(&self, client: &Jobs, mut operation: Operation) -> Result<Job> {
        let mut delay = self.initial_poll_delay;
        loop {
            if operation.done {
                return job_from_operation(operation);
            }
            if operation.name.is_empty() {
                return Err(Error::operation(
                    "the service returned an operation in progress without a name",
                ));
            }
            tracing::debug!(operation = %operation.name, "operation in progress, polling again in {delay:?}");
            tokio::time::sleep(delay).await;
            delay = next_delay(delay, self.maximum_poll_delay);
            let name = operation.name.clone();
            operation = client
                .get_operation()
                .set_name(name)
                .send()
                .await
                .map_err(Error::operation)?;
        }
    }
}

fn next_delay(delay: Duration, maximum: Duration) -> Duration {
    std::cmp::min(delay.saturating_mul(2), maximum)
}

async fn cancellable<F, T>(cancel: &CancellationToken, stage: Stage, future: F) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::cancelled(stage)),
        v = future => Ok(v),
    }
}

fn job_from_operation(operation: Operation) -> Result<Job> {
    use google_cloud_gax::error::rpc::Status;
    match operation.result {
        Some(OperationResult::Response(any)) => any.to_msg::<Job>().map_err(Error::operation),
        Some(OperationResult::Error(status)) => Err(Error::operation(
            google_cloud_gax::error::Error::service(Status::from(*status)),
        )),
        _ => Err(Error::operation(
            "the operation completed without a response or an error",
        )),
    }
}

/// Configures a [Submitter].
#[derive(Clone, Debug)]
pub struct SubmitterBuilder<C = DefaultConnector> {
    connector: C,
    initial_poll_delay: Duration,
    maximum_poll_delay: Duration,
    wait_timeout: Option<Duration>,
}

impl Default for SubmitterBuilder {
    fn default() -> Self {
        Self {
            connector: DefaultConnector::default(),
            initial_poll_delay: DEFAULT_INITIAL_POLL_DELAY,
            maximum_poll_delay: DEFAULT_MAXIMUM_POLL_DELAY,
            wait_timeout: None,
        }
    }
}

impl SubmitterBuilder<DefaultConnector> {
    /// Overrides the Cloud Run endpoint.
    pub fn with_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.connector = self.connector.with_endpoint(v);
        self
    }

    /// Enables tracing of the Cloud Run requests.
    pub fn with_tracing(mut self) -> Self {
        self.connector = self.connector.with_tracing();
        self
    }
}

impl<C> SubmitterBuilder<C>
where
    C: Connector,
{
    /// Sets the delay between polls of the create operation.
    ///
    /// The delay starts at `initial` and doubles after each poll, up to
    /// `maximum`. The defaults are 1 and 10 seconds.
    pub fn with_polling_interval(mut self, initial: Duration, maximum: Duration) -> Self {
        self.initial_poll_delay = initial;
        self.maximum_poll_delay = std::cmp::max(initial, maximum);
        self
    }

    /// Limits how long to wait for the create operation.
    ///
    /// By default there is no limit beyond the one the service enforces.
    pub fn with_wait_timeout(mut self, v: Duration) -> Self {
        self.wait_timeout = Some(v);
        self
    }

    /// Uses `connector` to create the Cloud Run clients.
    pub fn with_connector<D: Connector>(self, connector: D) -> SubmitterBuilder<D> {
        SubmitterBuilder {
            connector,
            initial_poll_delay: self.initial_poll_delay,
            maximum_poll_delay: self.maximum_poll_delay,
            wait_timeout: self.wait_timeout,
        }
    }

    /// Creates the configured submitter.
    pub fn build(self) -> Submitter<C> {
        Submitter {
            connector: self.connector,
            initial_poll_delay: self.initial_poll_delay,
            maximum_poll_delay: self.maximum_poll_delay,
            wait_timeout: self.wait_timeout,
        }
    }
}
