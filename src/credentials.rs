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

//! Credential resolution.
//!
//! A [CredentialResolver] tries an ordered list of token sources, caches the
//! first one that succeeds, and refreshes the cached token at most once per
//! throttle interval. The default order is:
//!
//! 1. [metadata::MetadataTokenProvider] — the ambient environment; no
//!    subprocess, cheapest when available.
//! 2. [gcloud::GcloudTokenProvider] — the gcloud CLI.
//!
//! The resolver is the only shared mutable state in this crate. Construct one
//! instance, wrap it in an `Arc`, and hand it to every client that needs
//! tokens; its lifetime is the process lifetime.

use crate::Result;
use crate::constants::DEFAULT_REFRESH_INTERVAL;
use crate::errors::CredentialsError;
use crate::token::{Token, TokenProvider};
use crate::token_cache::CachedCredential;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Access tokens from the gcloud CLI.
pub mod gcloud;

/// Access tokens from the GCE metadata service.
pub mod metadata;

/// Resolves and caches a credential from an ordered list of sources.
#[derive(Debug)]
pub struct CredentialResolver {
    sources: Vec<Arc<dyn TokenProvider>>,
    refresh_interval: Duration,
    cache: Mutex<Option<CachedCredential>>,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Builder::default().build()
    }
}

impl CredentialResolver {
    /// Creates a resolver with the default source order and refresh interval.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Returns the current access token, resolving or refreshing as needed.
    ///
    /// The first call tries each source in order and caches the winner.
    /// Later calls return the cached token, refreshing it through the winning
    /// source once the throttle interval has elapsed. The whole
    /// check-then-act sequence runs under one lock, so concurrent callers
    /// never trigger duplicate source invocations.
    ///
    /// A failure is surfaced to the immediate caller and is not retried
    /// internally; the cache stays empty (or keeps the previous token), and
    /// the next call starts over.
    pub fn access_token(&self) -> Result<Token> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| CredentialsError::from_msg(false, "credential cache lock poisoned"))?;
        let now = SystemTime::now();
        match cache.as_mut() {
            None => {
                let resolved = self.resolve(now)?;
                let token = resolved.token();
                *cache = Some(resolved);
                Ok(token)
            }
            Some(cached) => {
                if cached.stale(now, self.refresh_interval) {
                    tracing::info!("refreshing credentials");
                    cached.refresh(now)?;
                }
                Ok(cached.token())
            }
        }
    }

    fn resolve(&self, now: SystemTime) -> Result<CachedCredential> {
        tracing::info!("initializing credentials");
        for source in &self.sources {
            match source.fetch_token() {
                Ok(token) => {
                    tracing::info!(source = ?source, "credentials resolved");
                    return Ok(CachedCredential::new(source.clone(), token, now));
                }
                Err(e) => {
                    tracing::debug!(source = ?source, error = %e, "credential source failed");
                }
            }
        }
        Err(CredentialsError::unavailable(
            "every credential source failed, enable debug logging for details",
        ))
    }
}

/// Creates [CredentialResolver] instances with a custom source list or
/// refresh interval.
#[derive(Default)]
pub struct Builder {
    sources: Option<Vec<Arc<dyn TokenProvider>>>,
    refresh_interval: Option<Duration>,
}

impl Builder {
    /// Replaces the source list. Sources are tried in the given order;
    /// first success wins.
    pub fn sources<I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn TokenProvider>>,
    {
        self.sources = Some(sources.into_iter().collect());
        self
    }

    /// Sets the minimum interval between forced refreshes of the cached
    /// credential. Defaults to 10 seconds.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    pub fn build(self) -> CredentialResolver {
        CredentialResolver {
            sources: self.sources.unwrap_or_else(|| {
                vec![
                    Arc::new(metadata::MetadataTokenProvider::new()),
                    Arc::new(gcloud::GcloudTokenProvider::new()),
                ]
            }),
            refresh_interval: self.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL),
            cache: Mutex::new(None),
        }
    }
}
