//! Session keys: the `new_session` sentinel or a persisted `<timestamp>.json` name

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path};

/// String form of the sentinel session
pub const NEW_SESSION: &str = "new_session";

/// File extension carried by every persisted session key
pub const SESSION_EXTENSION: &str = ".json";

/// Timestamp layout used when minting keys
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// Identity of a chat session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SessionKey {
    /// The not-yet-persisted placeholder session
    New,
    /// A session backed by a file of this name
    Persisted(String),
}

impl SessionKey {
    /// Parse a key as shown in the session selector. Names are taken
    /// verbatim, since they come straight from the directory listing.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        if raw == NEW_SESSION {
            return Ok(Self::New);
        }
        if raw.is_empty() {
            return Err(crate::Error::Validation("session key is empty".to_string()));
        }
        if !is_bare_file_name(raw) {
            return Err(crate::Error::Validation(format!(
                "session key must be a bare file name: {}",
                raw
            )));
        }
        if !raw.ends_with(SESSION_EXTENSION) || raw.len() == SESSION_EXTENSION.len() {
            return Err(crate::Error::Validation(format!(
                "session key must end with {}: {}",
                SESSION_EXTENSION, raw
            )));
        }
        Ok(Self::Persisted(raw.to_string()))
    }

    /// Mint a persisted key from a point in time
    pub fn mint<Tz: TimeZone>(now: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self::Persisted(format!(
            "{}{}",
            now.format(TIMESTAMP_FORMAT),
            SESSION_EXTENSION
        ))
    }

    /// Mint a key that `taken` does not already claim, stepping forward one
    /// second at a time from `now`
    pub fn mint_unique(now: DateTime<Local>, taken: impl Fn(&SessionKey) -> bool) -> Self {
        let mut at = now;
        loop {
            let key = Self::mint(&at);
            if !taken(&key) {
                return key;
            }
            at += Duration::seconds(1);
        }
    }

    /// Whether this is the sentinel session
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New)
    }

    /// Whether the key has the shape produced by [`SessionKey::mint`]
    pub fn is_minted(&self) -> bool {
        match self {
            Self::New => false,
            Self::Persisted(name) => name
                .strip_suffix(SESSION_EXTENSION)
                .map(|stem| NaiveDateTime::parse_from_str(stem, TIMESTAMP_FORMAT).is_ok())
                .unwrap_or(false),
        }
    }

    /// File name backing the session, if any
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::New => None,
            Self::Persisted(name) => Some(name),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::New => NEW_SESSION,
            Self::Persisted(name) => name,
        }
    }
}

/// Whether `raw` names a single entry directly inside the sessions directory
fn is_bare_file_name(raw: &str) -> bool {
    let mut components = Path::new(raw).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == OsStr::new(raw)
    );
    single && !raw.contains('\\')
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::New
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SessionKey {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_sentinel_and_file() {
        assert_eq!(SessionKey::parse("new_session").unwrap(), SessionKey::New);
        assert_eq!(
            SessionKey::parse("2024_03_01_10_00_00.json").unwrap(),
            SessionKey::Persisted("2024_03_01_10_00_00.json".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_bad_names() {
        assert!(SessionKey::parse("").is_err());
        assert!(SessionKey::parse(".json").is_err());
        assert!(SessionKey::parse("notes.txt").is_err());
        assert!(SessionKey::parse("../etc/passwd.json").is_err());
        assert!(SessionKey::parse("dir/a.json").is_err());
        assert!(SessionKey::parse("..\\a.json").is_err());
        assert!(SessionKey::parse("./a.json").is_err());
        assert!(SessionKey::parse("/a.json").is_err());
    }

    #[test]
    fn test_parse_keeps_names_verbatim() {
        assert_eq!(
            SessionKey::parse("a..json").unwrap(),
            SessionKey::Persisted("a..json".into())
        );
        assert_eq!(SessionKey::parse(" a.json").unwrap().as_str(), " a.json");
        // only the exact sentinel string is the sentinel
        assert!(SessionKey::parse(" new_session").is_err());
    }

    #[test]
    fn test_mint_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        let key = SessionKey::mint(&at);
        assert_eq!(key.as_str(), "2024_03_01_09_05_07.json");
        assert!(key.is_minted());
        assert!(!SessionKey::New.is_minted());
        assert!(!SessionKey::Persisted("imported.json".into()).is_minted());
    }

    #[test]
    fn test_mint_unique_skips_taken() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        let taken = [
            SessionKey::mint(&at),
            SessionKey::mint(&(at + Duration::seconds(1))),
        ];
        let key = SessionKey::mint_unique(at, |k| taken.contains(k));
        assert_eq!(key.as_str(), "2024_03_01_09_05_09.json");
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&SessionKey::New).unwrap();
        assert_eq!(json, "\"new_session\"");
        let key: SessionKey = serde_json::from_str("\"a.json\"").unwrap();
        assert_eq!(key, SessionKey::Persisted("a.json".into()));
        assert!(serde_json::from_str::<SessionKey>("\"a.txt\"").is_err());
    }
}
