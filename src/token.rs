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
use time::OffsetDateTime;

/// Represents an access token.
#[derive(Clone, PartialEq)]
pub struct Token {
    /// The actual token string.
    ///
    /// This is the value used in the `Authorization:` header.
    pub token: String,

    /// The type of the token, always `"Bearer"` for the sources in this
    /// crate.
    pub token_type: String,

    /// The instant at which the token expires.
    ///
    /// If `None`, the token does not expire. Expirations are absolute UTC
    /// timestamps so that they remain comparable to the expiry the `gcloud`
    /// CLI reports.
    pub expires_at: Option<OffsetDateTime>,
}

impl Token {
    /// Returns `true` once the expiry is at or before `now`.
    pub fn expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|e| e <= now)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("token", &"[censored]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A source of access tokens.
///
/// Implementations fetch a fresh token on every call; caching and refresh
/// throttling live in [CredentialResolver][crate::credentials::CredentialResolver].
pub trait TokenProvider: std::fmt::Debug + Send + Sync {
    fn fetch_token(&self) -> Result<Token>;
}
