//! core::context
//!
//! Process-scoped state for one helper invocation.
//!
//! The CLI builds exactly one [`CommandContext`] and hands it to command
//! handlers behind an `Arc`. Tests assemble their own from an explicit
//! environment, an in-memory Git configuration and a fixed platform.

use std::sync::Arc;

use super::environment::{Environment, Platform};
use super::settings::Settings;
use crate::git::GitConfiguration;
use crate::store::CredentialStoreSelector;
use crate::ui::prompts::{Prompter, TerminalPrompter};

/// Everything a command needs, created once per process.
pub struct CommandContext {
    pub settings: Settings,
    pub platform: Platform,
    /// Lazily selected credential store.
    pub store: CredentialStoreSelector,
    pub prompter: Arc<dyn Prompter>,
    /// Absolute path of the running helper executable.
    pub program_path: String,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("platform", &self.platform)
            .field("program_path", &self.program_path)
            .finish_non_exhaustive()
    }
}

impl CommandContext {
    /// Build a context that prompts on the terminal when allowed.
    pub fn new(
        env: Environment,
        git: Arc<dyn GitConfiguration>,
        platform: Platform,
        program_path: impl Into<String>,
    ) -> Self {
        let settings = Settings::new(env, git);
        let prompter: Arc<dyn Prompter> = Arc::new(TerminalPrompter::new(settings.is_interactive()));
        Self::with_prompter(settings, platform, prompter, program_path)
    }

    pub fn with_prompter(
        settings: Settings,
        platform: Platform,
        prompter: Arc<dyn Prompter>,
        program_path: impl Into<String>,
    ) -> Self {
        let store = CredentialStoreSelector::new(settings.clone(), platform.clone());
        Self {
            settings,
            platform,
            store,
            prompter,
            program_path: program_path.into(),
        }
    }

    pub fn git(&self) -> &dyn GitConfiguration {
        self.settings.git()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::OsKind;
    use crate::git::mock::MemoryConfig;
    use crate::store::CredentialStore;

    #[test]
    fn store_uses_context_settings() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = temp.path().join("store").to_string_lossy().to_string();
        let env = Environment::from_vars([
            ("GCRED_CREDENTIAL_STORE", "plaintext"),
            ("GCRED_PLAINTEXT_STORE_PATH", root.as_str()),
        ]);
        let ctx = CommandContext::new(
            env,
            Arc::new(MemoryConfig::new()),
            Platform::new(OsKind::Linux, false),
            "/usr/bin/git-credential-gcred",
        );

        ctx.store.add_or_update("https://example.com", "alice", "pw").unwrap();
        assert_eq!(ctx.store.get_accounts("https://example.com").unwrap(), vec!["alice"]);
    }

    #[test]
    fn non_interactive_prompter() {
        let ctx = CommandContext::new(
            Environment::from_vars([("GCRED_INTERACTIVE", "never")]),
            Arc::new(MemoryConfig::new()),
            Platform::new(OsKind::Linux, false),
            "/usr/bin/git-credential-gcred",
        );
        assert!(ctx.prompter.input("Username: ").is_err());
    }
}
