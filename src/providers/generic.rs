//! providers::generic
//!
//! Basic authentication for any HTTP(S), SMTP or IMAP remote.
//!
//! Registered at Low priority so every specialised provider gets a chance
//! first. Credentials come from the request itself when Git already has
//! both halves, otherwise from a terminal prompt.

use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{HostProvider, ProviderError};
use crate::core::credential::Credential;
use crate::core::environment::OsKind;
use crate::core::input::InputArguments;
use crate::ui::prompts::Prompter;

const SUPPORTED_PROTOCOLS: &[&str] = &["http", "https", "smtp", "imap"];

pub struct GenericProvider {
    os: OsKind,
    prompter: Arc<dyn Prompter>,
}

impl std::fmt::Debug for GenericProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericProvider").field("os", &self.os).finish()
    }
}

impl GenericProvider {
    pub fn new(os: OsKind, prompter: Arc<dyn Prompter>) -> Self {
        Self { os, prompter }
    }

    /// Whether the server offers Windows Integrated Authentication.
    fn offers_integrated_auth(&self, input: &InputArguments) -> bool {
        self.os == OsKind::Windows
            && input.wwwauth().iter().any(|h| {
                let scheme = h.split_whitespace().next().unwrap_or_default();
                scheme.eq_ignore_ascii_case("Negotiate") || scheme.eq_ignore_ascii_case("NTLM")
            })
    }
}

#[async_trait]
impl HostProvider for GenericProvider {
    fn id(&self) -> &str {
        "generic"
    }

    fn name(&self) -> &str {
        "Generic"
    }

    fn supported_authority_ids(&self) -> Vec<String> {
        vec!["basic".to_string(), "integrated".to_string(), "windows".to_string()]
    }

    fn is_supported(&self, input: &InputArguments) -> bool {
        input.protocol().map_or(false, |p| {
            SUPPORTED_PROTOCOLS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(p))
        })
    }

    async fn generate_credential(
        &self,
        input: &InputArguments,
    ) -> Result<Credential, ProviderError> {
        if let (Some(user), Some(password)) = (input.username(), input.password()) {
            return Ok(Credential::new(user, password));
        }

        if self.offers_integrated_auth(input) {
            log::debug!("server offers integrated authentication; returning empty credential");
            return Ok(Credential::new("", ""));
        }

        let target = input
            .remote_uri()
            .map(|u| u.as_str().trim_end_matches('/').to_string())
            .ok_or(ProviderError::NoRemoteUri)?;

        let user = match input.username().filter(|u| !u.is_empty()) {
            Some(user) => user.to_string(),
            None => self.prompter.input(&format!("Username for '{}': ", target))?,
        };
        let password = self
            .prompter
            .password(&format!("Password for '{}': ", target))?;

        Ok(Credential::new(user, password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::prompts::{PromptError, ScriptedPrompter, TerminalPrompter};

    fn provider(os: OsKind, answers: &[&str]) -> (GenericProvider, Arc<ScriptedPrompter>) {
        let prompter = Arc::new(ScriptedPrompter::new(answers.iter().copied()));
        (GenericProvider::new(os, prompter.clone()), prompter)
    }

    #[test]
    fn supports_common_protocols() {
        let (p, _) = provider(OsKind::Linux, &[]);
        for proto in ["http", "HTTPS", "smtp", "imap"] {
            let input = InputArguments::from_pairs([("protocol", proto), ("host", "x")]);
            assert!(p.is_supported(&input), "{proto}");
        }
        let input = InputArguments::from_pairs([("protocol", "ssh"), ("host", "x")]);
        assert!(!p.is_supported(&input));
        assert!(!p.is_supported_response(None));
    }

    #[tokio::test]
    async fn returns_credentials_from_request() {
        let (p, prompter) = provider(OsKind::Linux, &[]);
        let input = InputArguments::from_pairs([
            ("protocol", "https"),
            ("host", "example.com"),
            ("username", "alice"),
            ("password", "pw"),
        ]);

        let cred = p.generate_credential(&input).await.unwrap();
        assert_eq!((cred.account(), cred.password()), ("alice", "pw"));
        assert!(prompter.asked().is_empty());
    }

    #[tokio::test]
    async fn prompts_for_missing_parts() {
        let (p, prompter) = provider(OsKind::Linux, &["pw"]);
        let input = InputArguments::from_pairs([
            ("protocol", "https"),
            ("host", "example.com"),
            ("username", "alice"),
        ]);

        let cred = p.generate_credential(&input).await.unwrap();
        assert_eq!((cred.account(), cred.password()), ("alice", "pw"));
        assert_eq!(prompter.asked(), vec!["Password for 'https://example.com': "]);
    }

    #[tokio::test]
    async fn prompts_for_username_and_password() {
        let (p, prompter) = provider(OsKind::Linux, &["bob", "secret"]);
        let input = InputArguments::from_pairs([("protocol", "https"), ("host", "example.com")]);

        let cred = p.generate_credential(&input).await.unwrap();
        assert_eq!((cred.account(), cred.password()), ("bob", "secret"));
        assert_eq!(prompter.asked().len(), 2);
    }

    #[tokio::test]
    async fn integrated_auth_on_windows_only() {
        let input = InputArguments::parse(
            "protocol=https\nhost=tfs.example.com\nwwwauth[]=Negotiate\nwwwauth[]=NTLM\n".as_bytes(),
        )
        .unwrap();

        let (windows, _) = provider(OsKind::Windows, &[]);
        assert!(windows.generate_credential(&input).await.unwrap().is_integrated_auth());

        let (linux, _) = provider(OsKind::Linux, &[]);
        assert!(linux.generate_credential(&input).await.is_err());
    }

    #[test]
    fn stored_credential_skips_prompt() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = crate::store::FileCredentialStore::plaintext(temp.path().to_path_buf(), "git");
        crate::store::CredentialStore::add_or_update(&store, "https://example.com", "alice", "pw")
            .unwrap();

        let (p, prompter) = provider(OsKind::Linux, &[]);
        let input = InputArguments::from_pairs([("protocol", "https"), ("host", "example.com")]);

        let cred = tokio_test::block_on(p.get_credential(&input, &store)).unwrap();
        assert_eq!(cred.account(), "alice");
        assert!(prompter.asked().is_empty());
    }

    #[tokio::test]
    async fn non_interactive_fails() {
        let p = GenericProvider::new(OsKind::Linux, Arc::new(TerminalPrompter::new(false)));
        let input = InputArguments::from_pairs([("protocol", "https"), ("host", "example.com")]);

        let err = p.generate_credential(&input).await.unwrap_err();
        assert!(matches!(err, ProviderError::Prompt(PromptError::NotInteractive)));
    }
}
