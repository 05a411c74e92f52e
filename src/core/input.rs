//! core::input
//!
//! Git credential protocol input and output.
//!
//! # Protocol
//!
//! Git writes one `key=value` attribute per line and ends the request with a
//! blank line (or EOF). Keys ending in `[]` are multi-valued: each line
//! appends a value and an empty value clears the list accumulated so far.
//! For every other key the last value wins.
//!
//! # Example
//!
//! ```
//! use gcred::core::input::InputArguments;
//!
//! let text = "protocol=https\nhost=example.com:8443\npath=org/repo\n\n";
//! let input = InputArguments::parse(text.as_bytes()).unwrap();
//!
//! assert_eq!(input.protocol(), Some("https"));
//! assert_eq!(input.host_and_port(), Some(("example.com", Some(8443))));
//! assert_eq!(
//!     input.remote_uri().unwrap().as_str(),
//!     "https://example.com:8443/org/repo"
//! );
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Write};

use thiserror::Error;
use url::Url;

/// Errors reading or writing the credential protocol.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read credential request: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed credential attribute line (expected key=value)")]
    Malformed,
}

/// Immutable view over the attributes Git sent for one request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct InputArguments {
    values: HashMap<String, Vec<String>>,
}

impl InputArguments {
    /// Parse a request from a reader, stopping at the first blank line.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, InputError> {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                break;
            }

            let (key, value) = line.split_once('=').ok_or(InputError::Malformed)?;
            if let Some(list_key) = key.strip_suffix("[]") {
                let list = values.entry(list_key.to_string()).or_default();
                if value.is_empty() {
                    list.clear();
                } else {
                    list.push(value.to_string());
                }
            } else {
                values.insert(key.to_string(), vec![value.to_string()]);
            }
        }

        Ok(Self { values })
    }

    /// Build arguments directly from single-valued pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in pairs {
            values
                .entry(key.to_string())
                .or_default()
                .push(value.to_string());
        }
        Self { values }
    }

    /// Last value for a single-valued attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| v.last())
            .map(String::as_str)
    }

    /// All values for a multi-valued attribute.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn protocol(&self) -> Option<&str> {
        self.get("protocol")
    }

    pub fn host(&self) -> Option<&str> {
        self.get("host")
    }

    pub fn path(&self) -> Option<&str> {
        self.get("path")
    }

    pub fn username(&self) -> Option<&str> {
        self.get("username")
    }

    pub fn password(&self) -> Option<&str> {
        self.get("password")
    }

    /// One entry per `WWW-Authenticate` header Git received.
    pub fn wwwauth(&self) -> &[String] {
        self.get_all("wwwauth")
    }

    pub fn oauth_refresh_token(&self) -> Option<&str> {
        self.get("oauth_refresh_token")
    }

    /// Password expiry as sent by Git (`password_expiry_utc`, unix seconds).
    pub fn password_expiry_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.get("password_expiry_utc")
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
    }

    /// Split `host` into host name and optional port.
    ///
    /// Returns `None` when there is no host, or when the port is not a
    /// valid number.
    pub fn host_and_port(&self) -> Option<(&str, Option<u16>)> {
        let host = self.host()?;
        match host.rsplit_once(':') {
            // Bracketed IPv6 literal without a port
            Some((_, tail)) if tail.ends_with(']') => Some((host, None)),
            Some((name, port)) => port.parse::<u16>().ok().map(|p| (name, Some(p))),
            None => Some((host, None)),
        }
    }

    /// Reconstruct the remote URI from protocol, host and path.
    ///
    /// The path is split into path, query and fragment at the first `?`
    /// and `#`. User information is never included.
    pub fn remote_uri(&self) -> Option<Url> {
        let protocol = self.protocol().filter(|p| !p.is_empty())?;
        let host = self.host().filter(|h| !h.is_empty())?;

        let mut url = Url::parse(&format!("{}://{}", protocol, host)).ok()?;

        if let Some(raw) = self.path().filter(|p| !p.is_empty()) {
            let (rest, fragment) = match raw.split_once('#') {
                Some((r, f)) => (r, Some(f)),
                None => (raw, None),
            };
            let (path, query) = match rest.split_once('?') {
                Some((p, q)) => (p, Some(q)),
                None => (rest, None),
            };
            url.set_path(path);
            url.set_query(query);
            url.set_fragment(fragment);
        }

        Some(url)
    }
}

impl fmt::Debug for InputArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        for key in keys {
            if key == "password" || key == "oauth_refresh_token" {
                map.entry(key, &"[REDACTED]");
            } else {
                map.entry(key, &self.values[key]);
            }
        }
        map.finish()
    }
}

/// Write `key=value` response lines followed by the terminating blank line.
///
/// Values containing newlines cannot be expressed in the protocol and are
/// rejected.
pub fn write_response<W: Write>(mut writer: W, pairs: &[(&str, String)]) -> Result<(), InputError> {
    for (key, value) in pairs {
        if value.contains('\n') || value.contains('\0') {
            return Err(InputError::Malformed);
        }
        writeln!(writer, "{}={}", key, value)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
