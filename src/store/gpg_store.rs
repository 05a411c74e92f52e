//! store::gpg_store
//!
//! GPG-encrypted file store compatible with `pass`.
//!
//! # Format
//!
//! Each entry is a `.gpg` file whose decrypted content follows the `pass`
//! convention: the password on the first line, metadata after it.
//!
//! ```text
//! s3cr3t
//! service=https://example.com
//! account=alice
//! ```
//!
//! Recipients come from the nearest `.gpg-id` file, searched from the
//! entry's directory up to the store root.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::file_store::{CredentialFileCodec, FileCredentialStore, StoredEntry};
use super::traits::StoreError;

/// Name of the recipient list file.
pub const GPG_ID_FILE: &str = ".gpg-id";

/// Encoding that shells out to `gpg`.
#[derive(Debug, Clone)]
pub struct GpgCodec {
    gpg_path: PathBuf,
    root: PathBuf,
}

impl GpgCodec {
    pub fn new(gpg_path: PathBuf, root: PathBuf) -> Self {
        Self { gpg_path, root }
    }

    /// Recipient ids for an entry at `path`.
    fn recipients(&self, path: &Path) -> Result<Vec<String>, StoreError> {
        let mut dir = path.parent();
        while let Some(current) = dir {
            let candidate = current.join(GPG_ID_FILE);
            if candidate.is_file() {
                let text = std::fs::read_to_string(&candidate).map_err(|e| {
                    StoreError::ReadError(format!("cannot read '{}': {}", candidate.display(), e))
                })?;
                let ids: Vec<String> = text
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .map(str::to_string)
                    .collect();
                if ids.is_empty() {
                    return Err(StoreError::WriteError(format!(
                        "'{}' lists no GPG key ids",
                        candidate.display()
                    )));
                }
                return Ok(ids);
            }
            if current == self.root {
                break;
            }
            dir = current.parent();
        }

        Err(StoreError::WriteError(format!(
            "no {} file found in '{}'",
            GPG_ID_FILE,
            self.root.display()
        )))
    }

    fn run_gpg(&self, args: &[String], input: &[u8]) -> Result<Vec<u8>, String> {
        let mut child = Command::new(&self.gpg_path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("cannot run '{}': {}", self.gpg_path.display(), e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .map_err(|e| format!("cannot write to gpg: {}", e))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| format!("gpg did not finish: {}", e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "gpg exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        Ok(output.stdout)
    }
}

/// Render an entry in `pass` format.
fn format_entry(entry: &StoredEntry) -> String {
    format!(
        "{}\nservice={}\naccount={}\n",
        entry.password, entry.service, entry.account
    )
}

/// Parse `pass` format. The account defaults to the file stem.
fn parse_entry(path: &Path, text: &str) -> Result<StoredEntry, StoreError> {
    let mut lines = text.lines();
    let password = lines
        .next()
        .ok_or_else(|| StoreError::ReadError("empty credential file".into()))?
        .to_string();

    let mut service = None;
    let mut account = None;
    for line in lines {
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                "service" => service = Some(value.to_string()),
                "account" => account = Some(value.to_string()),
                _ => {}
            }
        }
    }

    let account = account
        .or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .unwrap_or_default();
    let service =
        service.ok_or_else(|| StoreError::ReadError("credential file has no service".into()))?;

    Ok(StoredEntry {
        service,
        account,
        password,
    })
}

impl CredentialFileCodec for GpgCodec {
    fn extension(&self) -> &'static str {
        "gpg"
    }

    fn encode(&self, path: &Path, entry: &StoredEntry) -> Result<Vec<u8>, StoreError> {
        let mut args: Vec<String> = [
            "--quiet",
            "--yes",
            "--compress-algo=none",
            "--no-encrypt-to",
            "--batch",
            "--use-agent",
            "--encrypt",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        for id in self.recipients(path)? {
            args.push("-r".to_string());
            args.push(id);
        }
        args.push("--output".to_string());
        args.push("-".to_string());

        self.run_gpg(&args, format_entry(entry).as_bytes())
            .map_err(|e| StoreError::WriteError(format!("cannot encrypt credential: {}", e)))
    }

    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<StoredEntry, StoreError> {
        let args: Vec<String> = ["--quiet", "--batch", "--use-agent", "--decrypt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let plain = self
            .run_gpg(&args, bytes)
            .map_err(|e| StoreError::ReadError(format!("cannot decrypt credential: {}", e)))?;
        let text = String::from_utf8(plain)
            .map_err(|_| StoreError::ReadError("decrypted credential is not valid UTF-8".into()))?;
        parse_entry(path, &text)
    }
}

pub type GpgCredentialStore = FileCredentialStore<GpgCodec>;

impl FileCredentialStore<GpgCodec> {
    /// GPG store rooted at `root`, encrypting with the `gpg` at `gpg_path`.
    pub fn gpg(gpg_path: PathBuf, root: PathBuf, namespace: &str) -> Self {
        let codec = GpgCodec::new(gpg_path, root.clone());
        Self::new(root, namespace, codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry() -> StoredEntry {
        StoredEntry {
            service: "https://example.com".into(),
            account: "alice".into(),
            password: "s3cr3t".into(),
        }
    }

    #[test]
    fn pass_format_round_trip() {
        let text = format_entry(&entry());
        assert!(text.starts_with("s3cr3t\n"));
        let parsed = parse_entry(Path::new("alice.gpg"), &text).expect("parse");
        assert_eq!(parsed, entry());
    }

    #[test]
    fn account_defaults_to_file_stem() {
        let parsed = parse_entry(
            Path::new("/store/bob.gpg"),
            "pw\nservice=https://example.com\n",
        )
        .expect("parse");
        assert_eq!(parsed.account, "bob");
        assert_eq!(parsed.password, "pw");
    }

    #[test]
    fn missing_service_is_rejected() {
        assert!(parse_entry(Path::new("a.gpg"), "pw\n").is_err());
        assert!(parse_entry(Path::new("a.gpg"), "").is_err());
    }

    #[test]
    fn recipients_from_nearest_gpg_id() {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path().to_path_buf();
        std::fs::write(root.join(GPG_ID_FILE), "ROOTKEY\n").expect("write");
        let nested = root.join("git").join("https");
        std::fs::create_dir_all(&nested).expect("mkdir");

        let codec = GpgCodec::new(PathBuf::from("gpg"), root.clone());
        assert_eq!(
            codec.recipients(&nested.join("alice.gpg")).expect("ids"),
            vec!["ROOTKEY"]
        );

        std::fs::write(nested.join(GPG_ID_FILE), "# team\nA1\nB2\n").expect("write");
        assert_eq!(
            codec.recipients(&nested.join("alice.gpg")).expect("ids"),
            vec!["A1", "B2"]
        );
    }

    #[test]
    fn missing_gpg_id_is_an_error() {
        let temp = TempDir::new().expect("temp dir");
        let codec = GpgCodec::new(PathBuf::from("gpg"), temp.path().to_path_buf());
        assert!(codec.recipients(&temp.path().join("alice.gpg")).is_err());
    }

    #[test]
    fn missing_gpg_binary_fails_to_encode() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(temp.path().join(GPG_ID_FILE), "KEY\n").expect("write");
        let codec = GpgCodec::new(
            temp.path().join("no-such-gpg"),
            temp.path().to_path_buf(),
        );

        let err = codec
            .encode(&temp.path().join("alice.gpg"), &entry())
            .unwrap_err();
        assert!(!err.to_string().contains("s3cr3t"));
    }
}
