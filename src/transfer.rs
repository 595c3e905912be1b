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

//! Authenticated transfers against a repository endpoint.
//!
//! [TransferClient] issues GET, HEAD, and PUT requests with a bearer token
//! attached, and classifies HTTP failures into
//! [TransferError][crate::errors::TransferError]. Credential failures at
//! construction degrade the client to anonymous requests, so repositories
//! that allow unauthenticated reads keep working without any setup.

use crate::constants::DEFAULT_READ_TIMEOUT;
use crate::credentials::CredentialResolver;
use crate::errors::TransferError;
use crate::request::RequestInitializer;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// The root URL all transfer operations are issued against.
///
/// Derived from a caller-supplied repository URL: the scheme is forced to
/// `https`, authority and base path are preserved. Resource paths are
/// appended with a single `/` and no further normalization; duplicate
/// slashes or `..` segments are the caller's contract to avoid.
#[derive(Clone, Debug, PartialEq)]
pub struct RepositoryEndpoint {
    root: String,
}

impl RepositoryEndpoint {
    /// Derives the endpoint from a repository URL. Any scheme is accepted,
    /// including the `artifactregistry://` form build tools use in their
    /// repository declarations.
    pub fn new(repository_url: &str) -> Result<Self, TransferError> {
        let url = parse_repository_url(repository_url)?;
        let Some(host) = url.host_str() else {
            return Err(TransferError::InvalidRepository {
                message: format!("repository URL `{repository_url}` has no host"),
            });
        };
        let mut root = format!("https://{host}");
        if let Some(port) = url.port() {
            root.push_str(&format!(":{port}"));
        }
        root.push_str(url.path().trim_end_matches('/'));
        Ok(Self { root })
    }

    /// Uses `endpoint` verbatim, without forcing the scheme. Intended for
    /// tests and local proxies.
    pub fn verbatim(endpoint: &str) -> Result<Self, TransferError> {
        let url = parse_repository_url(endpoint)?;
        Ok(Self {
            root: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn resource_url(&self, resource_path: &str) -> String {
        format!("{}/{}", self.root, resource_path)
    }
}

fn parse_repository_url(repository_url: &str) -> Result<Url, TransferError> {
    Url::parse(repository_url).map_err(|e| TransferError::InvalidRepository {
        message: format!("cannot parse repository URL `{repository_url}`: {e}"),
    })
}

/// Issues authenticated GET/HEAD/PUT requests against one repository.
#[derive(Debug)]
pub struct TransferClient {
    endpoint: RepositoryEndpoint,
    http: Client,
    initializer: Option<RequestInitializer>,
    has_credentials: bool,
}

impl TransferClient {
    pub fn builder<S: Into<String>>(repository_url: S) -> Builder {
        Builder {
            repository_url: repository_url.into(),
            endpoint: None,
            resolver: None,
            read_timeout: None,
        }
    }

    /// Downloads a resource and returns its body as a byte stream.
    pub fn get(
        &self,
        resource_path: &str,
    ) -> Result<impl std::io::Read + Send + use<>, TransferError> {
        let request = self.http.get(self.endpoint.resource_url(resource_path));
        self.execute(request, resource_path)
    }

    /// Returns whether a resource exists. A 404 is a plain `false`;
    /// authorization failures are still errors, existence checks are not
    /// exempt from them.
    pub fn resource_exists(&self, resource_path: &str) -> Result<bool, TransferError> {
        let request = self.http.head(self.endpoint.resource_url(resource_path));
        let response = self.send(request)?;
        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Err(classify(status, resource_path, self.has_credentials))
    }

    /// Uploads a resource. The content length is known up front; no content
    /// type is sent.
    pub fn put(&self, resource_path: &str, content: Bytes) -> Result<(), TransferError> {
        let request = self
            .http
            .put(self.endpoint.resource_url(resource_path))
            .body(content);
        self.execute(request, resource_path)?;
        Ok(())
    }

    fn execute(
        &self,
        request: RequestBuilder,
        resource_path: &str,
    ) -> Result<Response, TransferError> {
        let response = self.send(request)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(classify(status, resource_path, self.has_credentials))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, TransferError> {
        let request = match &self.initializer {
            Some(initializer) => initializer.initialize(request)?,
            None => request,
        };
        request.send().map_err(|source| TransferError::Transport { source })
    }
}

fn classify(status: StatusCode, resource_path: &str, has_credentials: bool) -> TransferError {
    match status {
        StatusCode::NOT_FOUND => TransferError::NotFound {
            path: resource_path.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            TransferError::unauthorized(has_credentials)
        }
        _ => TransferError::Server {
            status: status.as_u16(),
        },
    }
}

/// Creates [TransferClient] instances.
#[derive(Debug)]
pub struct Builder {
    repository_url: String,
    endpoint: Option<String>,
    resolver: Option<Arc<CredentialResolver>>,
    read_timeout: Option<Duration>,
}

impl Builder {
    /// Overrides the computed endpoint with a verbatim URL, bypassing the
    /// https forcing. Intended for tests and local proxies.
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Attaches a credential resolver. Without one the client only issues
    /// anonymous requests.
    pub fn credential_resolver(mut self, resolver: Arc<CredentialResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets the read timeout applied to every request. Defaults to 60
    /// seconds.
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = Some(read_timeout);
        self
    }

    /// Builds the client, making one credential resolution attempt. If it
    /// fails the client degrades to anonymous requests; the repository may
    /// still allow unauthenticated reads, and authorization failures will
    /// say that no credentials were available.
    pub fn build(self) -> Result<TransferClient, TransferError> {
        let endpoint = match &self.endpoint {
            Some(endpoint) => RepositoryEndpoint::verbatim(endpoint)?,
            None => RepositoryEndpoint::new(&self.repository_url)?,
        };
        let read_timeout = self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT);
        let http = Client::builder()
            .timeout(read_timeout)
            .build()
            .map_err(|source| TransferError::Transport { source })?;

        let initializer = self.resolver.and_then(|resolver| {
            match resolver.access_token() {
                Ok(_) => Some(RequestInitializer::new(resolver, read_timeout)),
                Err(e) => {
                    tracing::info!(error = %e, "no credentials available, continuing anonymously");
                    None
                }
            }
        });

        Ok(TransferClient {
            endpoint,
            http,
            has_credentials: initializer.is_some(),
            initializer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    type TestResult = anyhow::Result<()>;

    #[test_case("artifactregistry://maven.pkg.dev/my-project/my-repo")]
    #[test_case("https://maven.pkg.dev/my-project/my-repo")]
    #[test_case("http://maven.pkg.dev/my-project/my-repo")]
    fn endpoint_forces_https(url: &str) -> TestResult {
        let endpoint = RepositoryEndpoint::new(url)?;
        assert_eq!(
            endpoint.resource_url("my/resource"),
            "https://maven.pkg.dev/my-project/my-repo/my/resource"
        );
        Ok(())
    }

    #[test]
    fn endpoint_preserves_port_and_trims_trailing_slash() -> TestResult {
        let endpoint = RepositoryEndpoint::new("https://maven.pkg.dev:8443/my-repo/")?;
        assert_eq!(
            endpoint.resource_url("a.pom"),
            "https://maven.pkg.dev:8443/my-repo/a.pom"
        );
        Ok(())
    }

    #[test]
    fn endpoint_without_host_is_rejected() {
        let got = RepositoryEndpoint::new("unix:/run/socket");
        assert!(
            matches!(got, Err(TransferError::InvalidRepository { .. })),
            "{got:?}"
        );
    }

    #[test]
    fn verbatim_endpoint_keeps_scheme() -> TestResult {
        let endpoint = RepositoryEndpoint::verbatim("http://127.0.0.1:8080/my-repo")?;
        assert_eq!(
            endpoint.resource_url("my/resource"),
            "http://127.0.0.1:8080/my-repo/my/resource"
        );
        Ok(())
    }

    #[test_case(StatusCode::NOT_FOUND, true; "not found with credentials")]
    #[test_case(StatusCode::NOT_FOUND, false; "not found without credentials")]
    fn classify_not_found(status: StatusCode, has_credentials: bool) {
        let got = classify(status, "my/resource", has_credentials);
        assert!(matches!(got, TransferError::NotFound { .. }), "{got:?}");
        assert!(got.to_string().contains("does not exist"), "{got}");
    }

    #[test_case(StatusCode::UNAUTHORIZED)]
    #[test_case(StatusCode::FORBIDDEN)]
    fn classify_unauthorized(status: StatusCode) {
        let got = classify(status, "my/resource", false);
        let msg = got.to_string();
        assert!(msg.contains("Permission denied"), "{msg}");
        assert!(msg.contains("The request had no credentials"), "{msg}");

        let got = classify(status, "my/resource", true);
        let msg = got.to_string();
        assert!(msg.contains("Permission denied"), "{msg}");
        assert!(!msg.contains("The request had no credentials"), "{msg}");
    }

    #[test_case(StatusCode::INTERNAL_SERVER_ERROR)]
    #[test_case(StatusCode::BAD_GATEWAY)]
    #[test_case(StatusCode::CONFLICT)]
    fn classify_other_failures(status: StatusCode) {
        let got = classify(status, "my/resource", true);
        assert!(
            matches!(got, TransferError::Server { status: s } if s == status.as_u16()),
            "{got:?}"
        );
    }
}
