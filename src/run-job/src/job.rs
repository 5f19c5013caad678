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

use crate::error::Error;
use crate::secret::SecretSource;
use crate::submit::Submitter;
use crate::{CancellationToken, Result};
use google_cloud_run_v2::model::{Container, CreateJobRequest, ExecutionTemplate, Job, TaskTemplate};

/// The task timeout used unless [JobSpec::with_timeout] is called.
pub const DEFAULT_TIMEOUT: &str = "600s";

/// The task retry limit used unless [JobSpec::with_max_retries] is called.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The configuration of a Cloud Run job.
///
/// The name, project, location, image, and service account are set when the
/// value is created and cannot change. The remaining fields have defaults and
/// are changed with the `with_*()` functions. Each call replaces the previous
/// value.
///
/// Nothing is validated until the job is [submitted][JobSpec::submit].
///
/// # Example
/// ```
/// # use cloud_run_job::JobSpec;
/// let spec = JobSpec::new(
///     "nightly-report",
///     "my-project",
///     "us-central1",
///     "us-docker.pkg.dev/cloudrun/container/job:latest",
///     "runner@my-project.iam.gserviceaccount.com",
/// )
/// .with_timeout("30m")
/// .with_max_retries(1)
/// .with_args(["--date", "today"]);
/// assert_eq!(spec.parent(), "projects/my-project/locations/us-central1");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct JobSpec {
    name: String,
    project: String,
    location: String,
    image: String,
    service_account: String,
    args: Vec<String>,
    timeout: String,
    max_retries: u32,
}

impl JobSpec {
    /// Creates a new job configuration with the default timeout and retries,
    /// and no arguments.
    pub fn new(
        name: impl Into<String>,
        project: impl Into<String>,
        location: impl Into<String>,
        image: impl Into<String>,
        service_account: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            location: location.into(),
            image: image.into(),
            service_account: service_account.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets how many times a failed task is retried by Cloud Run.
    ///
    /// The service enforces the upper bound.
    pub fn with_max_retries(mut self, v: u32) -> Self {
        self.max_retries = v;
        self
    }

    /// Sets the task timeout, for example `"600s"` or `"1h 30m"`.
    ///
    /// The value is parsed when the job is submitted, see [crate::timeout].
    pub fn with_timeout(mut self, v: impl Into<String>) -> Self {
        self.timeout = v.into();
        self
    }

    /// Replaces the container arguments.
    pub fn with_args<I, V>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.args = v.into_iter().map(Into::into).collect();
        self
    }

    /// Volumes are not supported yet, see [Capability::Volumes].
    ///
    /// Calling this function has no effect on the job.
    pub fn with_volumes(self) -> Self {
        tracing::warn!(
            job = %self.name,
            "{} are not supported, the job is created without them",
            Capability::Volumes
        );
        self
    }

    /// The job name, without the parent.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The project that owns the job.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// The Cloud Run region, for example `us-central1`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The container image run by each task.
    pub fn image(&self) -> &str {
        &self.image
    }

    /// The service account the tasks run as.
    pub fn service_account(&self) -> &str {
        &self.service_account
    }

    /// The container arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The timeout as configured, before parsing.
    pub fn timeout(&self) -> &str {
        &self.timeout
    }

    /// How many times a failed task is retried.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The parent resource for the job: `projects/{project}/locations/{location}`.
    pub fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project, self.location)
    }

    /// The full resource name of the job once it is created.
    pub fn resource_name(&self) -> String {
        format!("{}/jobs/{}", self.parent(), self.name)
    }

    /// Builds the `CreateJob` request for this job.
    ///
    /// This does not make any network requests. It fails if the timeout
    /// cannot be parsed, or if the retry limit cannot be represented in the
    /// request.
    pub fn to_request(&self) -> Result<CreateJobRequest> {
        let timeout = crate::timeout::parse(&self.timeout).map_err(Error::config)?;
        let max_retries = i32::try_from(self.max_retries).map_err(|_| {
            Error::config(format!(
                "max retries {} exceeds the largest supported value",
                self.max_retries
            ))
        })?;
        // Environment variables are not supported yet, see Capability::EnvVars.
        let container = Container::new()
            .set_image(self.image.clone())
            .set_args(self.args.clone());
        let task = TaskTemplate::new()
            .set_containers([container])
            .set_service_account(self.service_account.clone())
            .set_timeout(timeout)
            .set_max_retries(max_retries);
        let job = Job::new().set_template(ExecutionTemplate::new().set_template(task));
        Ok(CreateJobRequest::new()
            .set_parent(self.parent())
            .set_job_id(self.name.clone())
            .set_job(job))
    }

    /// Creates the job using a [Submitter] with the default configuration.
    ///
    /// See [Submitter::submit] for details.
    pub async fn submit<S>(self, secret: &S, cancel: &CancellationToken) -> Result<String>
    where
        S: SecretSource,
    {
        Submitter::default().submit(self, secret, cancel).await
    }
}

/// Job features reserved for future versions.
///
/// None of these are supported. They are listed so the gaps are explicit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Capability {
    /// Storage volumes mounted in the job container.
    Volumes,
    /// Environment variables for the job container. The container in the
    /// request has no environment variables.
    EnvVars,
}

impl Capability {
    /// Returns true if the capability is implemented.
    pub fn is_supported(&self) -> bool {
        match self {
            Self::Volumes | Self::EnvVars => false,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Volumes => write!(f, "volumes"),
            Self::EnvVars => write!(f, "environment variables"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use google_cloud_run_v2::model::task_template::Retries;

    type TestResult = anyhow::Result<()>;

    fn test_spec() -> JobSpec {
        JobSpec::new(
            "job-a",
            "p",
            "us-central1",
            "us-docker.pkg.dev/cloudrun/container/job:latest",
            "sa@p.iam.gserviceaccount.com",
        )
    }

    #[test]
    fn defaults() {
        let spec = test_spec();
        assert_eq!(spec.name(), "job-a");
        assert_eq!(spec.project(), "p");
        assert_eq!(spec.location(), "us-central1");
        assert_eq!(
            spec.image(),
            "us-docker.pkg.dev/cloudrun/container/job:latest"
        );
        assert_eq!(spec.service_account(), "sa@p.iam.gserviceaccount.com");
        assert_eq!(spec.timeout(), "600s");
        assert_eq!(spec.max_retries(), 3);
        assert!(spec.args().is_empty(), "{spec:?}");
    }

    #[test]
    fn last_write_wins() {
        let spec = test_spec()
            .with_timeout("30s")
            .with_max_retries(7)
            .with_args(["a", "b", "c"])
            .with_timeout("1h")
            .with_max_retries(0)
            .with_args(["d"]);
        assert_eq!(spec.timeout(), "1h");
        assert_eq!(spec.max_retries(), 0);
        assert_eq!(spec.args(), ["d"]);
    }

    #[test]
    fn with_args_accepts_owned_strings() {
        let args = vec!["--flag".to_string(), "value".to_string()];
        let spec = test_spec().with_args(args.clone());
        assert_eq!(spec.args(), args.as_slice());
        let spec = spec.with_args(Vec::<String>::new());
        assert!(spec.args().is_empty(), "{spec:?}");
    }

    #[test]
    fn names() {
        let spec = test_spec();
        assert_eq!(spec.parent(), "projects/p/locations/us-central1");
        assert_eq!(
            spec.resource_name(),
            "projects/p/locations/us-central1/jobs/job-a"
        );
    }

    #[test]
    fn request() -> TestResult {
        let spec = test_spec()
            .with_args(["--verbose", "run"])
            .with_max_retries(5)
            .with_timeout("600s");
        let request = spec.to_request()?;
        assert_eq!(request.parent, "projects/p/locations/us-central1");
        assert_eq!(request.job_id, "job-a");
        assert!(!request.validate_only, "{request:?}");

        let task = request
            .job
            .as_ref()
            .and_then(|j| j.template.as_ref())
            .and_then(|e| e.template.as_ref())
            .expect("request has a task template");
        assert_eq!(task.containers.len(), 1, "{task:?}");
        let container = &task.containers[0];
        assert_eq!(
            container.image,
            "us-docker.pkg.dev/cloudrun/container/job:latest"
        );
        assert_eq!(container.args, ["--verbose", "run"]);
        assert!(container.env.is_empty(), "{container:?}");
        assert_eq!(task.service_account, "sa@p.iam.gserviceaccount.com");
        assert_eq!(task.timeout, Some(google_cloud_wkt::Duration::clamp(600, 0)));
        assert_eq!(task.retries, Some(Retries::MaxRetries(5)));
        Ok(())
    }

    #[test]
    fn request_default_retries() -> TestResult {
        let request = test_spec().to_request()?;
        let task = request
            .job
            .and_then(|j| j.template)
            .and_then(|e| e.template)
            .expect("request has a task template");
        assert_eq!(task.retries, Some(Retries::MaxRetries(3)));
        Ok(())
    }

    #[test]
    fn request_bad_timeout() {
        let got = test_spec().with_timeout("6x").to_request();
        let error = got.unwrap_err();
        assert!(error.is_config(), "{error:?}");
    }

    #[test]
    fn request_retries_out_of_range() {
        let got = test_spec().with_max_retries(u32::MAX).to_request();
        let error = got.unwrap_err();
        assert!(error.is_config(), "{error:?}");
    }

    #[test]
    fn volumes_have_no_effect() -> TestResult {
        let spec = test_spec().with_args(["x"]);
        let with_volumes = spec.clone().with_volumes();
        assert_eq!(with_volumes, spec);
        assert_eq!(with_volumes.to_request()?, spec.to_request()?);
        Ok(())
    }

    #[test]
    fn capabilities() {
        assert!(!Capability::Volumes.is_supported());
        assert!(!Capability::EnvVars.is_supported());
        assert_eq!(Capability::Volumes.to_string(), "volumes");
    }
}
