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

use crate::Result;
use crate::credentials::CredentialResolver;
use crate::headers_util::bearer_header;
use reqwest::blocking::RequestBuilder;
use std::sync::Arc;
use std::time::Duration;

/// Decorates outbound requests with a bearer token and the configured read
/// timeout. The token is pulled from the resolver on every request, which
/// refreshes it when stale.
#[derive(Clone, Debug)]
pub(crate) struct RequestInitializer {
    resolver: Arc<CredentialResolver>,
    read_timeout: Duration,
}

impl RequestInitializer {
    pub(crate) fn new(resolver: Arc<CredentialResolver>, read_timeout: Duration) -> Self {
        Self {
            resolver,
            read_timeout,
        }
    }

    /// Fails only by propagating the resolver's failure.
    pub(crate) fn initialize(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.resolver.access_token()?;
        let (name, value) = bearer_header(&token)?;
        Ok(builder.header(name, value).timeout(self.read_timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CredentialsError;
    use crate::token::TokenProvider;
    use crate::token::tests::{MockTokenProvider, future_token};
    use http::header::AUTHORIZATION;

    type TestResult = anyhow::Result<()>;

    fn resolver_with(source: MockTokenProvider) -> Arc<CredentialResolver> {
        let source: Arc<dyn TokenProvider> = Arc::new(source);
        Arc::new(CredentialResolver::builder().sources([source]).build())
    }

    #[test]
    fn attaches_bearer_and_timeout() -> TestResult {
        let mut source = MockTokenProvider::new();
        source
            .expect_fetch_token()
            .times(1)
            .return_once(|| Ok(future_token("test-token")));
        let initializer =
            RequestInitializer::new(resolver_with(source), Duration::from_millis(1500));

        let client = reqwest::blocking::Client::new();
        let request = initializer
            .initialize(client.get("https://example.com/resource"))?
            .build()?;
        let auth = request.headers().get(AUTHORIZATION).expect("header set");
        assert_eq!(auth.to_str()?, "Bearer test-token");
        assert!(auth.is_sensitive());
        assert_eq!(request.timeout(), Some(&Duration::from_millis(1500)));
        Ok(())
    }

    #[test]
    fn resolver_failure_propagates() {
        let mut source = MockTokenProvider::new();
        source
            .expect_fetch_token()
            .times(1)
            .return_once(|| Err(CredentialsError::from_msg(false, "no token for you")));
        let initializer = RequestInitializer::new(resolver_with(source), Duration::from_secs(1));

        let client = reqwest::blocking::Client::new();
        let got = initializer.initialize(client.get("https://example.com/resource"));
        assert!(got.is_err(), "{got:?}");
    }
}
