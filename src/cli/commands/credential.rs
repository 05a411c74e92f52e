//! cli::commands::credential
//!
//! The `get`, `store` and `erase` actions Git invokes.
//!
//! # Flow
//!
//! 1. Parse the request from standard input
//! 2. Resolve the host provider through the registry
//! 3. Let the provider consult the selected credential store
//! 4. For `get`, write the credential back in protocol format

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::core::context::CommandContext;
use crate::core::input::{write_response, InputArguments};
use crate::providers::{
    GenericProvider, GitHubProvider, HostProviderPriority, HostProviderRegistry, HttpProber,
};

/// Credential protocol action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Get,
    Store,
    Erase,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Get => write!(f, "get"),
            Action::Store => write!(f, "store"),
            Action::Erase => write!(f, "erase"),
        }
    }
}

/// Registry with the shipped providers.
///
/// The probe honours `http.proxy`, scoped to the request's remote.
pub fn build_registry(ctx: &CommandContext, input: &InputArguments) -> Result<HostProviderRegistry> {
    let proxy = ctx
        .settings
        .clone()
        .with_remote_uri(input.remote_uri())
        .http_proxy();
    let prober = HttpProber::new(proxy.as_deref())?;

    let mut registry = HostProviderRegistry::new(ctx.settings.clone(), Arc::new(prober));
    registry.register(
        Box::new(GitHubProvider::new(Arc::clone(&ctx.prompter))),
        HostProviderPriority::Normal,
    )?;
    registry.register(
        Box::new(GenericProvider::new(ctx.platform.os, Arc::clone(&ctx.prompter))),
        HostProviderPriority::Low,
    )?;
    Ok(registry)
}

/// Run one protocol action against an already-parsed request.
pub async fn execute<W: Write>(
    ctx: &CommandContext,
    registry: &HostProviderRegistry,
    action: Action,
    input: &InputArguments,
    out: W,
) -> Result<()> {
    log::debug!("{} request: {:?}", action, input);

    let provider = registry.get_provider(input).await?;
    log::debug!("using host provider '{}'", provider.id());

    match action {
        Action::Get => {
            let credential = provider.get_credential(input, &ctx.store).await?;

            let mut pairs = vec![
                ("username", credential.account().to_string()),
                ("password", credential.password().to_string()),
            ];
            if let Some(expiry) = credential.password_expiry() {
                pairs.push(("password_expiry_utc", expiry.timestamp().to_string()));
            }
            if let Some(token) = credential.oauth_refresh_token() {
                pairs.push(("oauth_refresh_token", token.to_string()));
            }
            write_response(out, &pairs).context("failed to write credential")?;
        }
        Action::Store => provider.store_credential(input, &ctx.store).await?,
        Action::Erase => provider.erase_credential(input, &ctx.store).await?,
    }
    Ok(())
}

/// Read the request from stdin and run `action`.
pub fn run(ctx: &CommandContext, action: Action) -> Result<()> {
    let stdin = std::io::stdin();
    let input = InputArguments::parse(stdin.lock())?;
    let registry = build_registry(ctx, &input)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(execute(ctx, &registry, action, &input, std::io::stdout().lock()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::{Environment, OsKind, Platform};
    use crate::core::settings::Settings;
    use crate::git::mock::MemoryConfig;
    use crate::store::CredentialStore;
    use crate::ui::prompts::ScriptedPrompter;
    use tempfile::TempDir;

    fn context(temp: &TempDir, answers: &[&str]) -> CommandContext {
        let root = temp.path().join("store").to_string_lossy().to_string();
        let env = Environment::from_vars([
            ("GCRED_CREDENTIAL_STORE", "plaintext"),
            ("GCRED_PLAINTEXT_STORE_PATH", root.as_str()),
            ("GCRED_AUTODETECT_TIMEOUT", "0"),
        ]);
        let settings = Settings::new(env, Arc::new(MemoryConfig::new()));
        CommandContext::with_prompter(
            settings,
            Platform::new(OsKind::Linux, false),
            Arc::new(ScriptedPrompter::new(answers.iter().copied())),
            "/usr/bin/git-credential-gcred",
        )
    }

    fn parse(text: &str) -> InputArguments {
        InputArguments::parse(text.as_bytes()).unwrap()
    }

    async fn run_action(ctx: &CommandContext, action: Action, request: &str) -> String {
        let input = parse(request);
        let registry = build_registry(ctx, &input).unwrap();
        let mut out = Vec::new();
        execute(ctx, &registry, action, &input, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn get_prompts_then_store_then_get_from_store() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, &["alice", "pw"]);
        let request = "protocol=https\nhost=example.com\n\n";

        let out = run_action(&ctx, Action::Get, request).await;
        assert_eq!(out, "username=alice\npassword=pw\n\n");

        run_action(
            &ctx,
            Action::Store,
            "protocol=https\nhost=example.com\nusername=alice\npassword=pw\n\n",
        )
        .await;
        assert_eq!(ctx.store.get_accounts("https://example.com").unwrap(), vec!["alice"]);

        // Prompter has no answers left; this must come from the store
        let out = run_action(&ctx, Action::Get, request).await;
        assert_eq!(out, "username=alice\npassword=pw\n\n");
    }

    #[tokio::test]
    async fn erase_removes_stored_credential() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, &[]);
        ctx.store.add_or_update("https://example.com", "alice", "pw").unwrap();

        run_action(
            &ctx,
            Action::Erase,
            "protocol=https\nhost=example.com\nusername=alice\n\n",
        )
        .await;
        assert!(ctx.store.get("https://example.com", None).unwrap().is_none());
    }

    #[tokio::test]
    async fn github_requests_use_github_provider() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, &["octocat", "ghp_abc"]);

        let out = run_action(&ctx, Action::Get, "protocol=https\nhost=github.com\npath=o/r.git\n\n").await;
        assert_eq!(out, "username=octocat\npassword=ghp_abc\n\n");
    }

    #[tokio::test]
    async fn unsupported_protocol_has_no_provider() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, &[]);
        let input = parse("protocol=ftp\nhost=example.com\n\n");
        let registry = build_registry(&ctx, &input).unwrap();

        let err = execute(&ctx, &registry, Action::Get, &input, Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no host provider"));
    }
}
