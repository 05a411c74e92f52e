//! store::cache_store
//!
//! Credentials held in memory by Git's own `credential-cache` daemon.
//!
//! Each operation runs `git credential-cache [options] <action>` and talks
//! the credential protocol over its stdin/stdout. Nothing touches disk.

use std::io::Write;
use std::process::{Command, Stdio};

use url::Url;

use super::traits::{account_filter, CredentialStore, StoreError};
use crate::core::credential::Credential;
use crate::core::input::InputArguments;

/// Store backed by `git credential-cache`.
#[derive(Debug, Clone)]
pub struct CacheCredentialStore {
    git_path: String,
    options: Vec<String>,
}

impl CacheCredentialStore {
    /// `options` is passed to `credential-cache` verbatim, split on whitespace.
    pub fn new(options: Option<&str>) -> Self {
        Self::with_git("git", options)
    }

    pub fn with_git(git_path: impl Into<String>, options: Option<&str>) -> Self {
        Self {
            git_path: git_path.into(),
            options: options
                .map(|o| o.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    fn run(&self, action: &str, request: &str) -> Result<String, String> {
        let mut child = Command::new(&self.git_path)
            .arg("credential-cache")
            .args(&self.options)
            .arg(action)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("cannot run git credential-cache: {}", e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.as_bytes())
                .map_err(|e| format!("cannot write to git credential-cache: {}", e))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| format!("git credential-cache did not finish: {}", e))?;
        if !output.status.success() {
            return Err(format!(
                "git credential-cache {} exited with {}: {}",
                action,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Build a credential protocol request for a service.
fn request(service: &str, account: Option<&str>, secret: Option<&str>) -> String {
    let mut out = String::new();
    match Url::parse(service) {
        Ok(url) if url.host_str().is_some() => {
            out.push_str(&format!("protocol={}\n", url.scheme()));
            let host = url.host_str().unwrap_or_default();
            match url.port() {
                Some(port) => out.push_str(&format!("host={}:{}\n", host, port)),
                None => out.push_str(&format!("host={}\n", host)),
            }
            let path = url.path().trim_matches('/');
            if !path.is_empty() {
                out.push_str(&format!("path={}\n", path));
            }
        }
        _ => {
            out.push_str("protocol=gcred\n");
            out.push_str(&format!("host={}\n", service));
        }
    }
    if let Some(account) = account {
        out.push_str(&format!("username={}\n", account));
    }
    if let Some(secret) = secret {
        out.push_str(&format!("password={}\n", secret));
    }
    out.push('\n');
    out
}

impl CredentialStore for CacheCredentialStore {
    fn get_accounts(&self, service: &str) -> Result<Vec<String>, StoreError> {
        // The cache cannot be enumerated; report the one it would answer with
        Ok(self
            .get(service, None)?
            .map(|c| vec![c.account().to_string()])
            .unwrap_or_default())
    }

    fn get(&self, service: &str, account: Option<&str>) -> Result<Option<Credential>, StoreError> {
        let account = account_filter(account);
        let output = self
            .run("get", &request(service, account, None))
            .map_err(StoreError::ReadError)?;

        let response = InputArguments::parse(output.as_bytes())
            .map_err(|e| StoreError::ReadError(format!("bad credential-cache response: {}", e)))?;
        match (response.username(), response.password()) {
            (Some(user), Some(password)) if account.map_or(true, |a| a == user) => {
                Ok(Some(Credential::new(user, password)))
            }
            _ => Ok(None),
        }
    }

    fn add_or_update(&self, service: &str, account: &str, secret: &str) -> Result<(), StoreError> {
        if let Some(existing) = self.get(service, Some(account))? {
            if existing.password() == secret {
                return Ok(());
            }
        }
        self.run("store", &request(service, Some(account), Some(secret)))
            .map(|_| ())
            .map_err(StoreError::WriteError)
    }

    fn remove(&self, service: &str, account: Option<&str>) -> Result<bool, StoreError> {
        let Some(existing) = self.get(service, account)? else {
            return Ok(false);
        };
        self.run("erase", &request(service, Some(existing.account()), None))
            .map(|_| true)
            .map_err(StoreError::DeleteError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_split_on_whitespace() {
        let store = CacheCredentialStore::new(Some("--timeout 300  --socket /tmp/s"));
        assert_eq!(store.options(), ["--timeout", "300", "--socket", "/tmp/s"]);
        assert!(CacheCredentialStore::new(None).options().is_empty());
    }

    #[test]
    fn request_from_url_service() {
        assert_eq!(
            request("https://example.com:8443/org/repo", Some("alice"), Some("pw")),
            "protocol=https\nhost=example.com:8443\npath=org/repo\nusername=alice\npassword=pw\n\n"
        );
        assert_eq!(
            request("https://example.com", None, None),
            "protocol=https\nhost=example.com\n\n"
        );
    }

    #[test]
    fn request_from_plain_service() {
        assert_eq!(request("svc", None, None), "protocol=gcred\nhost=svc\n\n");
    }

    #[test]
    fn missing_git_is_a_read_error() {
        let store = CacheCredentialStore::with_git("/nonexistent/git", None);
        assert!(matches!(
            store.get("https://example.com", None),
            Err(StoreError::ReadError(_))
        ));
    }
}
