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

use std::fmt::{Debug, Display, Formatter};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Represents an error creating or refreshing a credential.
///
/// Failures include problems launching the `gcloud` CLI, unparseable or
/// expired tokens in its output, an unreachable metadata service, or all
/// sources failing in turn. None of these are retried internally; the
/// [is_retryable][CredentialsError::is_retryable] flag tells the caller
/// whether a later attempt might succeed.
#[derive(Debug)]
pub struct CredentialsError {
    /// If `true`, the operation that resulted in this error might succeed
    /// upon retry.
    is_retryable: bool,

    /// The underlying source of the error.
    kind: ErrorKind,
}

#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    #[error("the access token returned by gcloud is expired - maybe run `gcloud auth login`")]
    Expired,
    #[error("no credentials could be found: {0}")]
    Unavailable(String),
    #[error("failed to execute the credential helper command: {0}")]
    Subprocess(#[source] BoxError),
    #[error("cannot parse the credential helper output: {0}")]
    Parsing(#[source] BoxError),
    #[error("failed to fetch a token from the ambient environment: {0}")]
    Transport(#[source] BoxError),
    #[error("{0}")]
    Message(String),
}

impl CredentialsError {
    /// Creates a new `CredentialsError` from a free-form message.
    pub fn from_msg<T: Into<String>>(is_retryable: bool, message: T) -> Self {
        CredentialsError {
            is_retryable,
            kind: ErrorKind::Message(message.into()),
        }
    }

    /// Returns `true` if the error is retryable; otherwise returns `false`.
    pub fn is_retryable(&self) -> bool {
        self.is_retryable
    }

    /// The external tool returned a syntactically valid but already-expired
    /// token. Re-authentication is required before another attempt can work.
    pub fn is_expired(&self) -> bool {
        matches!(self.kind, ErrorKind::Expired)
    }

    /// No source could produce a token.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.kind, ErrorKind::Unavailable(_))
    }

    /// The credential helper process could not be launched or was killed.
    pub fn is_subprocess(&self) -> bool {
        matches!(self.kind, ErrorKind::Subprocess(_))
    }

    pub(crate) fn expired() -> Self {
        CredentialsError {
            is_retryable: false,
            kind: ErrorKind::Expired,
        }
    }

    pub(crate) fn unavailable<T: Into<String>>(message: T) -> Self {
        CredentialsError {
            is_retryable: false,
            kind: ErrorKind::Unavailable(message.into()),
        }
    }

    pub(crate) fn subprocess<T: Into<BoxError>>(source: T) -> Self {
        CredentialsError {
            is_retryable: true,
            kind: ErrorKind::Subprocess(source.into()),
        }
    }

    pub(crate) fn parsing<T: Into<BoxError>>(source: T) -> Self {
        CredentialsError {
            is_retryable: false,
            kind: ErrorKind::Parsing(source.into()),
        }
    }

    pub(crate) fn transport<T: Into<BoxError>>(source: T) -> Self {
        CredentialsError {
            is_retryable: true,
            kind: ErrorKind::Transport(source.into()),
        }
    }
}

impl std::error::Error for CredentialsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

const RETRYABLE_MSG: &str = "but future attempts may succeed";
const NON_RETRYABLE_MSG: &str = "and future attempts will not succeed";

impl Display for CredentialsError {
    /// Formats the error message to include retryability and source.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let msg = if self.is_retryable {
            RETRYABLE_MSG
        } else {
            NON_RETRYABLE_MSG
        };
        write!(f, "cannot create access token, {}, source: {}", msg, self.kind)
    }
}

pub(crate) fn is_retryable(c: http::StatusCode) -> bool {
    match c {
        // Server-side errors do not indicate that there is anything wrong
        // with our request, so we retry them.
        http::StatusCode::INTERNAL_SERVER_ERROR
        | http::StatusCode::SERVICE_UNAVAILABLE
        | http::StatusCode::REQUEST_TIMEOUT
        | http::StatusCode::TOO_MANY_REQUESTS => true,
        _ => false,
    }
}

/// The error type for transfer operations against a repository endpoint.
///
/// HTTP status codes are classified into this closed set; see the variant
/// documentation for the mapping. `resource_exists` treats a 404 as `false`
/// rather than an error.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum TransferError {
    /// The remote resource is absent (HTTP 404 on GET or PUT).
    #[error("the remote resource `{path}` does not exist")]
    NotFound { path: String },

    /// The remote server rejected the request (HTTP 401 or 403). The message
    /// states whether any credentials were attached to the request.
    #[error("{message}")]
    Unauthorized { message: String },

    /// Any other non-2xx response.
    #[error("received an error from the remote server, HTTP status: {status}")]
    Server { status: u16 },

    /// The repository URL could not be turned into an endpoint.
    #[error("invalid repository: {message}")]
    InvalidRepository { message: String },

    /// The request could not be sent or the response body could not be read.
    #[error("failed to send request to the remote server: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },

    /// Refreshing the credential failed after the connection was established.
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
}

pub(crate) const PERMISSION_DENIED_MSG: &str =
    "Permission denied on remote repository (or it may not exist).";

pub(crate) const NO_CREDENTIALS_MSG: &str = "The request had no credentials because none were \
     available from the environment. Ensure that either 1) you are logged into gcloud or 2) \
     Application Default Credentials are set up.";

impl TransferError {
    /// Builds the `Unauthorized` variant, wording the message by whether a
    /// credential was ever resolved for this connection.
    pub(crate) fn unauthorized(has_credentials: bool) -> Self {
        let message = if has_credentials {
            PERMISSION_DENIED_MSG.to_string()
        } else {
            format!("{PERMISSION_DENIED_MSG} {NO_CREDENTIALS_MSG}")
        };
        TransferError::Unauthorized { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use test_case::test_case;

    #[test_case(http::StatusCode::INTERNAL_SERVER_ERROR)]
    #[test_case(http::StatusCode::SERVICE_UNAVAILABLE)]
    #[test_case(http::StatusCode::REQUEST_TIMEOUT)]
    #[test_case(http::StatusCode::TOO_MANY_REQUESTS)]
    fn retryable(c: http::StatusCode) {
        assert!(is_retryable(c));
    }

    #[test_case(http::StatusCode::NOT_FOUND)]
    #[test_case(http::StatusCode::UNAUTHORIZED)]
    #[test_case(http::StatusCode::BAD_REQUEST)]
    #[test_case(http::StatusCode::BAD_GATEWAY)]
    fn non_retryable(c: http::StatusCode) {
        assert!(!is_retryable(c));
    }

    #[test]
    fn retryability() {
        let e = CredentialsError::from_msg(true, "test-only-err-123");
        assert!(e.is_retryable(), "{e}");
        let got = format!("{e}");
        assert!(got.contains("test-only-err-123"), "{got}");
        assert!(got.contains(RETRYABLE_MSG), "{got}");

        let e = CredentialsError::from_msg(false, "test-only-err-123");
        assert!(!e.is_retryable(), "{e}");
        let got = format!("{e}");
        assert!(got.contains(NON_RETRYABLE_MSG), "{got}");
    }

    #[test]
    fn kinds() {
        let e = CredentialsError::expired();
        assert!(e.is_expired(), "{e:?}");
        assert!(!e.is_retryable(), "{e:?}");
        assert!(e.to_string().contains("gcloud auth login"), "{e}");

        let e = CredentialsError::unavailable("check debug logs for details");
        assert!(e.is_unavailable(), "{e:?}");
        assert!(e.to_string().contains("no credentials could be found"), "{e}");

        let e = CredentialsError::subprocess(std::io::Error::other("spawn failed"));
        assert!(e.is_subprocess(), "{e:?}");
        assert!(e.is_retryable(), "{e:?}");
        assert!(e.source().is_some(), "{e:?}");

        let e = CredentialsError::parsing(std::io::Error::other("bad json"));
        assert!(!e.is_retryable(), "{e:?}");
        assert!(e.source().is_some(), "{e:?}");
    }

    #[test]
    fn unauthorized_wording() {
        let e = TransferError::unauthorized(false);
        let got = e.to_string();
        assert!(got.contains("Permission denied"), "{got}");
        assert!(got.contains("The request had no credentials"), "{got}");

        let e = TransferError::unauthorized(true);
        let got = e.to_string();
        assert!(got.contains("Permission denied"), "{got}");
        assert!(!got.contains("The request had no credentials"), "{got}");
    }

    #[test]
    fn not_found_wording() {
        let e = TransferError::NotFound {
            path: "my/resource".into(),
        };
        let got = e.to_string();
        assert!(got.contains("does not exist"), "{got}");
        assert!(got.contains("my/resource"), "{got}");
    }
}
