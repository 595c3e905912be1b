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

use std::time::Duration;

/// Scopes requested for ambient credentials. Artifact Registry only needs
/// cloud-platform access; the read-only variant is included for repositories
/// that grant nothing broader.
pub(crate) const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/cloud-platform.read-only",
];

/// Minimum wall-clock interval between forced refreshes of the cached
/// credential. Amortizes the cost of the `gcloud` subprocess across the many
/// short-lived requests a build issues.
pub(crate) const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Read timeout applied to every repository request.
pub(crate) const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for the `gcloud` subprocess. The CLI can hang waiting for user
/// interaction (e.g. a reauth prompt); a build task should fail instead.
pub(crate) const DEFAULT_COMMAND_DEADLINE: Duration = Duration::from_secs(30);

/// Arguments passed to `gcloud` to obtain a JSON credential descriptor.
pub(crate) const CONFIG_HELPER_ARGS: [&str; 3] =
    ["config", "config-helper", "--format=json(credential)"];
