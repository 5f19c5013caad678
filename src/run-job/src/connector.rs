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
use crate::secret::Secret;
use google_cloud_auth::credentials::{
    Credentials, external_account, impersonated, service_account, user_account,
};
use google_cloud_run_v2::client::Jobs;
use serde_json::Value;
use std::future::Future;

/// Creates authenticated Cloud Run clients from credential JSON.
///
/// Most applications use [DefaultConnector]. Applications with custom
/// transports, and tests, may provide their own implementation. The returned
/// client is used for a single submission and dropped when it completes.
pub trait Connector: std::fmt::Debug + Send + Sync {
    /// Creates a client authenticated with `credential`.
    fn connect(&self, credential: Secret) -> impl Future<Output = Result<Jobs, BoxError>> + Send;
}

/// Creates clients using the Cloud Run client library.
///
/// The credential JSON must be one of the formats supported by the Google
/// Cloud client libraries: a service account key, an authorized user, an
/// impersonated service account, or an external account (workload identity
/// federation) configuration.
#[derive(Clone, Debug, Default)]
pub struct DefaultConnector {
    endpoint: Option<String>,
    tracing: bool,
}

impl DefaultConnector {
    /// Creates a connector with the default endpoint and no tracing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the Cloud Run endpoint, for example, to use a regional or
    /// private endpoint.
    pub fn with_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.endpoint = Some(v.into());
        self
    }

    /// Enables tracing of the Cloud Run requests in the client library.
    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }
}

impl Connector for DefaultConnector {
    async fn connect(&self, credential: Secret) -> Result<Jobs, BoxError> {
        let credentials = credentials_from_json(credential.expose())?;
        let mut builder = Jobs::builder().with_credentials(credentials);
        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint.clone());
        }
        if self.tracing {
            builder = builder.with_tracing();
        }
        Ok(builder.build().await?)
    }
}

/// Builds the credentials described by `json`, using its `type` field.
pub(crate) fn credentials_from_json(json: &str) -> Result<Credentials, BoxError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| format!("the credential is not valid JSON: {e}"))?;
    let credential_type = value
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or("the credential JSON does not have a `type` field")?;
    let credentials = match credential_type.as_str() {
        "service_account" => service_account::Builder::new(value).build()?,
        "authorized_user" => user_account::Builder::new(value).build()?,
        "impersonated_service_account" => impersonated::Builder::new(value).build()?,
        "external_account" => external_account::Builder::new(value).build()?,
        other => return Err(format!("unsupported credential type `{other}`").into()),
    };
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("not json", "not valid JSON")]
    #[test_case("[1, 2, 3]", "`type`")]
    #[test_case(r#"{"client_email": "a@b.com"}"#, "`type`")]
    #[test_case(r#"{"type": 42}"#, "`type`")]
    #[test_case(r#"{"type": "gdch_service_account"}"#, "unsupported credential type")]
    fn invalid_credential(json: &str, want: &str) {
        let got = credentials_from_json(json);
        let error = got.err().expect("credential should be rejected");
        assert!(error.to_string().contains(want), "{error}");
    }

    #[test]
    fn service_account_missing_fields() {
        let got = credentials_from_json(r#"{"type": "service_account"}"#);
        assert!(got.is_err(), "{got:?}");
    }

    #[tokio::test]
    async fn connect_rejects_bad_credential() {
        let connector = DefaultConnector::new()
            .with_endpoint("https://run.example.com")
            .with_tracing();
        let got = connector.connect(Secret::new("{")).await;
        assert!(got.is_err(), "{got:?}");
    }

    #[test]
    fn options() {
        let connector = DefaultConnector::new();
        assert!(connector.endpoint.is_none(), "{connector:?}");
        assert!(!connector.tracing, "{connector:?}");
        let connector = connector
            .with_endpoint("https://run.example.com")
            .with_tracing();
        assert_eq!(
            connector.endpoint.as_deref(),
            Some("https://run.example.com")
        );
        assert!(connector.tracing, "{connector:?}");
    }
}
