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

//! Sources for the credential used to create jobs.
//!
//! The credential is a JSON document, typically a [service account key]. The
//! submitter never sees where the credential is stored, it only asks a
//! [SecretSource] for the plaintext.
//!
//! [service account key]: https://cloud.google.com/iam/docs/keys-create-delete#creating

use crate::BoxError;
use google_cloud_secretmanager_v1::client::SecretManagerService;
use std::future::Future;
use std::path::PathBuf;

/// Plaintext credential material.
///
/// The `Debug` output does not include the plaintext.
#[derive(Clone, PartialEq)]
pub struct Secret(String);

impl Secret {
    /// Wraps the plaintext of a secret.
    pub fn new<V: Into<String>>(plaintext: V) -> Self {
        Self(plaintext.into())
    }

    /// Returns the plaintext.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Secret").field(&"[censored]").finish()
    }
}

/// Resolves an opaque secret handle into plaintext.
///
/// Applications may implement this trait to fetch credentials from their own
/// storage.
pub trait SecretSource: std::fmt::Debug + Send + Sync {
    /// Returns the plaintext of the secret.
    fn plaintext(&self) -> impl Future<Output = Result<Secret, BoxError>> + Send;
}

impl SecretSource for Secret {
    async fn plaintext(&self) -> Result<Secret, BoxError> {
        Ok(self.clone())
    }
}

/// A secret stored in an environment variable.
#[derive(Clone, Debug)]
pub struct EnvSecret {
    var: String,
}

impl EnvSecret {
    /// Reads the secret from the environment variable `var`.
    pub fn new<V: Into<String>>(var: V) -> Self {
        Self { var: var.into() }
    }
}

impl SecretSource for EnvSecret {
    async fn plaintext(&self) -> Result<Secret, BoxError> {
        match std::env::var(&self.var) {
            Ok(v) => Ok(Secret(v)),
            Err(e) => Err(format!("cannot read environment variable `{}`: {e}", self.var).into()),
        }
    }
}

/// A secret stored in a file.
#[derive(Clone, Debug)]
pub struct FileSecret {
    path: PathBuf,
}

impl FileSecret {
    /// Reads the secret from the file at `path`.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl SecretSource for FileSecret {
    async fn plaintext(&self) -> Result<Secret, BoxError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| format!("cannot read secret file {}: {e}", self.path.display()))?;
        Ok(Secret(contents))
    }
}

/// A secret version in [Secret Manager].
///
/// The version name has the form
/// `projects/{project}/secrets/{secret}/versions/{version}`, where
/// `{version}` may be `latest`.
///
/// # Example
/// ```no_run
/// # use cloud_run_job::{JobSpec, CancellationToken, SecretManagerSecret};
/// # async fn sample(spec: JobSpec) -> cloud_run_job::Result<()> {
/// let secret = SecretManagerSecret::new("projects/my-project/secrets/deployer-key/versions/latest");
/// let name = spec.submit(&secret, &CancellationToken::new()).await?;
/// println!("created {name}");
/// # Ok(()) }
/// ```
///
/// [Secret Manager]: https://cloud.google.com/secret-manager/docs
#[derive(Clone, Debug)]
pub struct SecretManagerSecret {
    name: String,
    client: Option<SecretManagerService>,
}

impl SecretManagerSecret {
    /// Access the secret version using a client with the default
    /// configuration. The client is created on each access, using the
    /// [Application Default Credentials].
    ///
    /// [Application Default Credentials]: https://cloud.google.com/docs/authentication/application-default-credentials
    pub fn new<V: Into<String>>(name: V) -> Self {
        Self {
            name: name.into(),
            client: None,
        }
    }

    /// Access the secret version using an existing client.
    pub fn with_client<V: Into<String>>(client: SecretManagerService, name: V) -> Self {
        Self {
            name: name.into(),
            client: Some(client),
        }
    }

    async fn client(&self) -> Result<SecretManagerService, BoxError> {
        match &self.client {
            Some(c) => Ok(c.clone()),
            None => Ok(SecretManagerService::builder().build().await?),
        }
    }
}

impl SecretSource for SecretManagerSecret {
    async fn plaintext(&self) -> Result<Secret, BoxError> {
        let client = self.client().await?;
        let response = client
            .access_secret_version()
            .set_name(self.name.clone())
            .send()
            .await?;
        let payload = response
            .payload
            .ok_or_else(|| format!("secret version {} has no payload", self.name))?;
        let plaintext = String::from_utf8(payload.data.to_vec())
            .map_err(|e| format!("secret version {} is not valid UTF-8: {e}", self.name))?;
        Ok(Secret(plaintext))
    }
}
