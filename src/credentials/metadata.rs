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

//! Access tokens from the [Metadata Service].
//!
//! Google Cloud environments such as GCE, GKE, or Cloud Run provide a local
//! metadata service that mints access tokens for the VM's default service
//! account. When available it is the cheapest and safest source: no
//! subprocess, no user session to expire. Off Google Cloud the connection
//! attempt fails quickly and the resolver moves on to the gcloud CLI.
//!
//! [Metadata Service]: https://cloud.google.com/compute/docs/metadata/overview

use crate::Result;
use crate::constants::SCOPES;
use crate::errors::{CredentialsError, is_retryable};
use crate::token::{Token, TokenProvider};
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;

const METADATA_FLAVOR_VALUE: &str = "Google";
const METADATA_FLAVOR: &str = "metadata-flavor";
const METADATA_ROOT: &str = "http://metadata.google.internal";
const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

// Failing fast matters more than surviving a slow link here: when the build
// does not run on Google Cloud this connect attempt is pure overhead before
// the gcloud fallback.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A [TokenProvider] backed by the metadata service.
#[derive(Debug)]
pub struct MetadataTokenProvider {
    endpoint: String,
    scopes: Vec<String>,
    // Built once; a client construction failure is deferred to fetch_token.
    client: std::result::Result<reqwest::blocking::Client, reqwest::Error>,
}

impl Default for MetadataTokenProvider {
    fn default() -> Self {
        Builder::default().build()
    }
}

impl MetadataTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> Builder {
        Builder::default()
    }
}

/// Creates [MetadataTokenProvider] instances with a custom endpoint or scope
/// set.
#[derive(Debug, Default)]
pub struct Builder {
    endpoint: Option<String>,
    scopes: Option<Vec<String>>,
}

impl Builder {
    /// Sets the service endpoint.
    ///
    /// If not set, the provider uses `http://metadata.google.internal`.
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the [scopes] requested for the token.
    ///
    /// If not set, the provider requests cloud-platform access and its
    /// read-only variant.
    ///
    /// [scopes]: https://developers.google.com/identity/protocols/oauth2/scopes
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(|s| s.into()).collect());
        self
    }

    pub fn build(self) -> MetadataTokenProvider {
        let endpoint = self.endpoint.unwrap_or_else(|| METADATA_ROOT.to_string());
        MetadataTokenProvider {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            scopes: self
                .scopes
                .unwrap_or_else(|| SCOPES.map(str::to_string).to_vec()),
            client: reqwest::blocking::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: Option<u64>,
    token_type: String,
}

impl TokenProvider for MetadataTokenProvider {
    fn fetch_token(&self) -> Result<Token> {
        let client = self.client.as_ref().map_err(|e| {
            CredentialsError::from_msg(false, format!("cannot create an HTTP client: {e}"))
        })?;

        let response = client
            .get(format!("{}{}", self.endpoint, TOKEN_PATH))
            .query(&[("scopes", self.scopes.join(","))])
            .header(METADATA_FLAVOR, METADATA_FLAVOR_VALUE)
            .send()
            .map_err(CredentialsError::transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(CredentialsError::from_msg(
                is_retryable(status),
                format!("failed to fetch token from the metadata service, status: {status}, body: {body}"),
            ));
        }

        let now = OffsetDateTime::now_utc();
        let response = response
            .json::<MetadataTokenResponse>()
            .map_err(CredentialsError::parsing)?;
        Ok(Token {
            token: response.access_token,
            token_type: response.token_type,
            expires_at: response
                .expires_in
                .map(|d| now + time::Duration::seconds(d as i64)),
        })
    }
}
