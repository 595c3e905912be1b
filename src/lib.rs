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

//! Authentication and transfer client for [Artifact Registry] repositories.
//!
//! Build tools that resolve or publish artifacts against an Artifact Registry
//! repository need short-lived bearer tokens on every outbound request. This
//! crate obtains such tokens without any manual credential management: it asks
//! the ambient environment (the GCE metadata service) first, falls back to the
//! [gcloud] CLI, caches whichever source succeeded, and refreshes the token on
//! a fixed throttle interval. The [transfer::TransferClient] then issues
//! authenticated GET, HEAD, and PUT requests against the repository endpoint
//! and maps HTTP failures to a small error taxonomy.
//!
//! All calls are synchronous and blocking; the callers are build tasks that
//! already run on their own threads.
//!
//! ```no_run
//! use artifact_registry_client::credentials::CredentialResolver;
//! use artifact_registry_client::transfer::TransferClient;
//! use std::sync::Arc;
//!
//! # fn sample() -> anyhow::Result<()> {
//! let resolver = Arc::new(CredentialResolver::new());
//! let client = TransferClient::builder("artifactregistry://maven.pkg.dev/my-project/my-repo")
//!     .credential_resolver(resolver)
//!     .build()?;
//! let exists = client.resource_exists("com/example/app/1.0/app-1.0.pom")?;
//! # Ok(()) }
//! ```
//!
//! [Artifact Registry]: https://cloud.google.com/artifact-registry
//! [gcloud]: https://cloud.google.com/sdk/gcloud

/// Error types for credential resolution and transfers.
pub mod errors;

/// Types and functions to work with access [Tokens].
///
/// [Tokens]: https://cloud.google.com/docs/authentication#token
pub mod token;

/// Credential resolution: ordered source fallback, caching, and refresh.
pub mod credentials;

/// Subprocess execution for CLI-backed credential sources.
pub mod exec;

/// Authenticated GET/HEAD/PUT operations against a repository endpoint.
pub mod transfer;

/// The cached credential and its refresh bookkeeping.
pub(crate) mod token_cache;

/// Headers utility functions for bearer authentication.
pub(crate) mod headers_util;

/// Decorates outbound requests with credentials and timeouts.
pub(crate) mod request;

pub(crate) mod constants;

/// A `Result` alias where the `Err` case is
/// `artifact_registry_client::errors::CredentialsError`.
pub(crate) type Result<T> = std::result::Result<T, crate::errors::CredentialsError>;
