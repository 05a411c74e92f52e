//! providers::github
//!
//! GitHub personal-access-token authentication.
//!
//! # Detection
//!
//! - Statically: `github.com` and `gist.github.com` over http(s)
//! - By probe: any server answering with an `X-GitHub-Request-Id` header
//!   (GitHub Enterprise Server)
//!
//! # Storage
//!
//! Tokens are scoped to the whole host, not a repository path, so they are
//! stored under `scheme://host[:port]`. Gists share `github.com` tokens.

use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{HostProvider, ProbeResponse, ProviderError};
use crate::core::credential::Credential;
use crate::core::input::InputArguments;
use crate::ui::prompts::Prompter;

const GITHUB_HOST: &str = "github.com";
const GIST_HOST: &str = "gist.github.com";
const REQUEST_ID_HEADER: &str = "X-GitHub-Request-Id";

pub struct GitHubProvider {
    prompter: Arc<dyn Prompter>,
}

impl std::fmt::Debug for GitHubProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubProvider").finish_non_exhaustive()
    }
}

impl GitHubProvider {
    pub fn new(prompter: Arc<dyn Prompter>) -> Self {
        Self { prompter }
    }
}

fn is_http(input: &InputArguments) -> bool {
    input
        .protocol()
        .map_or(false, |p| p.eq_ignore_ascii_case("http") || p.eq_ignore_ascii_case("https"))
}

/// Host a request's credentials belong to; gists use github.com's.
fn credential_host(host: &str) -> &str {
    if host.eq_ignore_ascii_case(GIST_HOST) {
        GITHUB_HOST
    } else {
        host
    }
}

#[async_trait]
impl HostProvider for GitHubProvider {
    fn id(&self) -> &str {
        "github"
    }

    fn name(&self) -> &str {
        "GitHub"
    }

    fn supported_authority_ids(&self) -> Vec<String> {
        vec!["github".to_string()]
    }

    fn is_supported(&self, input: &InputArguments) -> bool {
        if !is_http(input) {
            return false;
        }
        input.host_and_port().map_or(false, |(host, _)| {
            host.eq_ignore_ascii_case(GITHUB_HOST) || host.eq_ignore_ascii_case(GIST_HOST)
        })
    }

    fn is_supported_response(&self, response: Option<&ProbeResponse>) -> bool {
        response.map_or(false, |r| r.has_header(REQUEST_ID_HEADER))
    }

    fn service_name(&self, input: &InputArguments) -> Result<String, ProviderError> {
        let protocol = input.protocol().ok_or(ProviderError::NoRemoteUri)?;
        let (host, port) = input.host_and_port().ok_or(ProviderError::NoRemoteUri)?;
        let host = credential_host(host).to_ascii_lowercase();
        Ok(match port {
            Some(port) => format!("{}://{}:{}", protocol.to_ascii_lowercase(), host, port),
            None => format!("{}://{}", protocol.to_ascii_lowercase(), host),
        })
    }

    async fn generate_credential(
        &self,
        input: &InputArguments,
    ) -> Result<Credential, ProviderError> {
        let target = self.service_name(input)?;

        let user = match input.username().filter(|u| !u.is_empty()) {
            Some(user) => user.to_string(),
            None => self.prompter.input(&format!("Username for '{}': ", target))?,
        };
        let token = self
            .prompter
            .password(&format!("Personal access token for '{}': ", target))?;
        if token.trim().is_empty() {
            return Err(ProviderError::CredentialUnavailable(
                "no personal access token was entered".to_string(),
            ));
        }

        Ok(Credential::new(user, token.trim()))
    }
}
