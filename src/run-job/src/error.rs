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

use crate::BoxError;
use crate::submit::Stage;
use google_cloud_gax::error::rpc::Status;
use std::error::Error as StdError;

/// The error returned when a job submission fails.
///
/// Submitting a job goes through several stages: resolving the credential,
/// creating an authenticated client, sending the `CreateJob` request, and
/// waiting for the resulting long-running operation. Each stage fails in its
/// own way, and this type offers a predicate for each kind of failure. The
/// original cause, if any, is available via
/// [source][std::error::Error::source].
///
/// # Example
/// ```
/// use cloud_run_job::Error;
/// fn report(e: &Error) {
///     if e.is_submission() {
///         println!("the service rejected the job: {e}, status={:?}", e.status());
///     } else if e.resource_may_exist() {
///         println!("the job may exist in a partially created state: {e}");
///     } else {
///         println!("submission failed: {e}");
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    stage: Stage,
    source: Option<BoxError>,
}

impl Error {
    /// The credential secret could not be resolved to plaintext.
    pub fn is_credential(&self) -> bool {
        matches!(self.kind, ErrorKind::Credential)
    }

    /// The authenticated Cloud Run client could not be created.
    ///
    /// # Troubleshooting
    ///
    /// The most common cause is a credential that is not valid JSON, or JSON
    /// of a credential type the client libraries do not support.
    pub fn is_client_init(&self) -> bool {
        matches!(self.kind, ErrorKind::ClientInit)
    }

    /// The job configuration is invalid, for example, the timeout cannot be
    /// parsed.
    ///
    /// These errors are detected before any network request.
    pub fn is_config(&self) -> bool {
        matches!(self.kind, ErrorKind::Config)
    }

    /// The service rejected the `CreateJob` request.
    ///
    /// Typical causes are missing permissions, invalid fields, or a job with
    /// the same name already existing in the project and location.
    pub fn is_submission(&self) -> bool {
        matches!(self.kind, ErrorKind::Submission)
    }

    /// The long-running operation completed with an error, or waiting for it
    /// failed.
    ///
    /// The service accepted the request before this error happened. The job
    /// may exist in a partially created state.
    pub fn is_operation(&self) -> bool {
        matches!(self.kind, ErrorKind::Operation)
    }

    /// The caller cancelled the submission.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// The stage the submission was in when the error happened.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Returns true if the job may exist in the service despite the error.
    ///
    /// Creating a job is a two-phase protocol. Once the `CreateJob` request is
    /// sent it is not possible to determine locally whether the job exists:
    /// the operation may fail after the job is partially created, or the
    /// caller may stop waiting before the operation completes.
    pub fn resource_may_exist(&self) -> bool {
        match self.kind {
            ErrorKind::Operation => true,
            ErrorKind::Cancelled => {
                matches!(self.stage, Stage::RequestSent | Stage::AwaitingOperation)
            }
            _ => false,
        }
    }

    /// The error status returned by the service, if any.
    ///
    /// This is set for [Submission][Error::is_submission] errors, and for
    /// [Operation][Error::is_operation] errors where the operation completed
    /// with an error status.
    pub fn status(&self) -> Option<&Status> {
        self.source
            .as_ref()
            .and_then(|e| e.downcast_ref::<google_cloud_gax::error::Error>())
            .and_then(|e| e.status())
    }

    pub(crate) fn credential<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::Credential, Stage::Authenticating, source)
    }

    pub(crate) fn client_init<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::ClientInit, Stage::Authenticating, source)
    }

    pub(crate) fn config<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::Config, Stage::Unsubmitted, source)
    }

    pub(crate) fn submission(source: google_cloud_gax::error::Error) -> Self {
        Self::new(ErrorKind::Submission, Stage::RequestSent, source)
    }

    pub(crate) fn operation<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::Operation, Stage::AwaitingOperation, source)
    }

    pub(crate) fn cancelled(stage: Stage) -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            stage,
            source: None,
        }
    }

    fn new<T: Into<BoxError>>(kind: ErrorKind, stage: Stage, source: T) -> Self {
        Self {
            kind,
            stage,
            source: Some(source.into()),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source) {
            (ErrorKind::Credential, Some(e)) => {
                write!(f, "cannot resolve the credential secret: {e}")
            }
            (ErrorKind::ClientInit, Some(e)) => {
                write!(f, "cannot create the Cloud Run client: {e}")
            }
            (ErrorKind::Config, Some(e)) => write!(f, "invalid job configuration: {e}"),
            (ErrorKind::Submission, Some(e)) => {
                write!(f, "the Cloud Run create job request failed: {e}")
            }
            (ErrorKind::Operation, Some(e)) => {
                write!(f, "the Cloud Run create job operation failed: {e}")
            }
            (ErrorKind::Cancelled, _) => {
                write!(f, "the submission was cancelled in stage {}", self.stage)
            }
            (kind, None) => write!(f, "{kind:?} error in stage {}", self.stage),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ErrorKind {
    Credential,
    ClientInit,
    Config,
    Submission,
    Operation,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use google_cloud_gax::error::rpc::Code;

    #[test]
    fn credential() {
        let error = Error::credential("missing variable");
        assert!(error.is_credential(), "{error:?}");
        assert!(!error.is_client_init(), "{error:?}");
        assert_eq!(error.stage(), Stage::Authenticating);
        assert!(!error.resource_may_exist(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(error.to_string().contains("missing variable"), "{error}");
    }

    #[test]
    fn client_init() {
        let error = Error::client_init("bad json");
        assert!(error.is_client_init(), "{error:?}");
        assert_eq!(error.stage(), Stage::Authenticating);
        assert!(error.status().is_none(), "{error:?}");
    }

    #[test]
    fn config() {
        let error = Error::config("bad timeout");
        assert!(error.is_config(), "{error:?}");
        assert_eq!(error.stage(), Stage::Unsubmitted);
        assert!(!error.resource_may_exist(), "{error:?}");
    }

    #[test]
    fn submission() {
        let status = Status::default()
            .set_code(Code::AlreadyExists)
            .set_message("job already exists");
        let error = Error::submission(google_cloud_gax::error::Error::service(status.clone()));
        assert!(error.is_submission(), "{error:?}");
        assert_eq!(error.stage(), Stage::RequestSent);
        assert_eq!(error.status(), Some(&status));
        assert!(!error.resource_may_exist(), "{error:?}");
        assert!(error.to_string().contains("job already exists"), "{error}");
    }

    #[test]
    fn operation() {
        let status = Status::default()
            .set_code(Code::Internal)
            .set_message("container failed");
        let error = Error::operation(google_cloud_gax::error::Error::service(status.clone()));
        assert!(error.is_operation(), "{error:?}");
        assert_eq!(error.stage(), Stage::AwaitingOperation);
        assert_eq!(error.status(), Some(&status));
        assert!(error.resource_may_exist(), "{error:?}");

        let error = Error::operation("timed out");
        assert!(error.status().is_none(), "{error:?}");
    }

    #[test]
    fn cancelled() {
        let error = Error::cancelled(Stage::Authenticating);
        assert!(error.is_cancelled(), "{error:?}");
        assert!(error.source().is_none(), "{error:?}");
        assert!(!error.resource_may_exist(), "{error:?}");

        let error = Error::cancelled(Stage::AwaitingOperation);
        assert!(error.resource_may_exist(), "{error:?}");
        assert!(error.to_string().contains("awaiting"), "{error}");
    }
}
