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
use crate::token::{Token, TokenProvider};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// The resolved credential held by the resolver: the source that won the
/// fallback, its most recent token, and the refresh bookkeeping.
///
/// Staleness uses wall-clock time, matching the observable refresh timing of
/// the tools this crate replaces. A backwards clock adjustment delays the
/// next refresh by at most one interval.
#[derive(Debug)]
pub(crate) struct CachedCredential {
    source: Arc<dyn TokenProvider>,
    token: Token,
    last_refresh: SystemTime,
}

impl CachedCredential {
    pub(crate) fn new(source: Arc<dyn TokenProvider>, token: Token, now: SystemTime) -> Self {
        Self {
            source,
            token,
            last_refresh: now,
        }
    }

    pub(crate) fn token(&self) -> Token {
        self.token.clone()
    }

    /// `true` once more than `interval` has elapsed since the last refresh.
    pub(crate) fn stale(&self, now: SystemTime, interval: Duration) -> bool {
        // duration_since fails when the clock moved backwards; the cache then
        // counts as fresh until the clock catches up.
        now.duration_since(self.last_refresh)
            .unwrap_or(Duration::ZERO)
            > interval
    }

    /// Fetches a new token through the winning source. On failure the
    /// previous token and timestamp stay in place, so the next call retries.
    pub(crate) fn refresh(&mut self, now: SystemTime) -> Result<()> {
        self.token = self.source.fetch_token()?;
        self.last_refresh = now;
        Ok(())
    }
}
