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

//! Access tokens from the [gcloud] CLI.
//!
//! `gcloud config config-helper` prints a JSON document describing the active
//! account's access token and its expiry. This source runs that command,
//! parses the descriptor, and rejects tokens that are already expired: when
//! the user's gcloud session has lapsed the CLI still exits successfully and
//! prints the stale token, which would otherwise surface as confusing 401s
//! much later.
//!
//! [gcloud]: https://cloud.google.com/sdk/gcloud

use crate::Result;
use crate::constants::CONFIG_HELPER_ARGS;
use crate::errors::CredentialsError;
use crate::exec::{CommandRunner, ProcessRunner};
use crate::token::{Token, TokenProvider};
use serde::Deserialize;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// The expiry format gcloud emits: `yyyy-MM-ddTHH:mm:ssZ`, always UTC.
const TOKEN_EXPIRY_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// The gcloud binary name is a pure function of the platform identifier.
fn gcloud_program(os: &str) -> &'static str {
    if os == "windows" { "gcloud.cmd" } else { "gcloud" }
}

/// A [TokenProvider] backed by the gcloud CLI.
#[derive(Debug)]
pub struct GcloudTokenProvider {
    program: String,
    runner: Box<dyn CommandRunner>,
}

impl Default for GcloudTokenProvider {
    fn default() -> Self {
        Builder::default().build()
    }
}

impl GcloudTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> Builder {
        Builder::default()
    }
}

/// Creates [GcloudTokenProvider] instances with a custom program name or
/// command runner. Both default to the host gcloud installation.
#[derive(Debug, Default)]
pub struct Builder {
    program: Option<String>,
    runner: Option<Box<dyn CommandRunner>>,
}

impl Builder {
    /// Overrides the program to run instead of `gcloud`. Useful for pointing
    /// tests at a stand-in script.
    pub fn program<S: Into<String>>(mut self, program: S) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Overrides the command runner, e.g. to change the subprocess deadline.
    pub fn runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn build(self) -> GcloudTokenProvider {
        GcloudTokenProvider {
            program: self
                .program
                .unwrap_or_else(|| gcloud_program(std::env::consts::OS).to_string()),
            runner: self.runner.unwrap_or_else(|| Box::new(ProcessRunner::default())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigHelperResponse {
    credential: Option<CredentialDescriptor>,
}

#[derive(Debug, Deserialize)]
struct CredentialDescriptor {
    access_token: Option<String>,
    token_expiry: Option<String>,
}

impl TokenProvider for GcloudTokenProvider {
    fn fetch_token(&self) -> Result<Token> {
        let output = self
            .runner
            .run(&self.program, &CONFIG_HELPER_ARGS)
            .map_err(CredentialsError::subprocess)?;
        if output.exit_code != 0 {
            return Err(CredentialsError::from_msg(
                false,
                format!(
                    "gcloud exited with status: {}\nOutput:\n{}\nError Output:\n{}\n",
                    output.exit_code, output.stdout, output.stderr
                ),
            ));
        }

        let response = serde_json::from_str::<ConfigHelperResponse>(&output.stdout)
            .map_err(CredentialsError::parsing)?;
        let Some(credential) = response.credential else {
            return Err(CredentialsError::from_msg(
                false,
                "no credential returned from gcloud",
            ));
        };
        let (Some(access_token), Some(token_expiry)) =
            (credential.access_token, credential.token_expiry)
        else {
            return Err(CredentialsError::from_msg(
                false,
                "malformed response from gcloud: missing `access_token` or `token_expiry`",
            ));
        };

        let expires_at = PrimitiveDateTime::parse(&token_expiry, TOKEN_EXPIRY_FORMAT)
            .map_err(CredentialsError::parsing)?
            .assume_utc();
        if expires_at <= OffsetDateTime::now_utc() {
            return Err(CredentialsError::expired());
        }

        Ok(Token {
            token: access_token,
            token_type: "Bearer".to_string(),
            expires_at: Some(expires_at),
        })
    }
}
