//! Identity and session records and their persisted encoding

use serde::{Deserialize, Serialize};

/// Current schema version for both persisted values
pub const SCHEMA_VERSION: u32 = 1;

/// A registered account
///
/// The secret is kept in plaintext. This is a mock fixture, not a
/// credential store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "name")]
    pub display_name: String,
    pub email: String,
    #[serde(rename = "password")]
    pub secret: String,
}

impl Identity {
    pub fn new(
        display_name: impl Into<String>,
        email: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            email: email.into(),
            secret: secret.into(),
        }
    }

    /// Exact, case-sensitive comparison of both fields
    pub fn matches(&self, email: &str, secret: &str) -> bool {
        self.email == email && self.secret == secret
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// The signed-in identity's public fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

impl From<&Identity> for Session {
    fn from(identity: &Identity) -> Self {
        Self {
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
        }
    }
}

#[derive(Serialize)]
struct RegistryDocRef<'a> {
    version: u32,
    users: &'a [Identity],
}

/// Registry as found in storage. Unversioned data is a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryDoc {
    Versioned { version: u32, users: Vec<Identity> },
    Legacy(Vec<Identity>),
}

#[derive(Serialize)]
struct SessionDocRef<'a> {
    version: u32,
    #[serde(flatten)]
    session: &'a Session,
}

/// Session as found in storage. Unversioned data has no `version` field.
#[derive(Deserialize)]
struct SessionDoc {
    #[serde(default)]
    version: u32,
    #[serde(flatten)]
    session: Session,
}

fn corrupt(key: &str, reason: impl ToString) -> crate::Error {
    crate::Error::CorruptState {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn check_version(key: &str, version: u32) -> crate::Result<()> {
    if version > SCHEMA_VERSION {
        return Err(corrupt(
            key,
            format!(
                "schema version {} is newer than supported {}",
                version, SCHEMA_VERSION
            ),
        ));
    }
    Ok(())
}

pub(crate) fn encode_registry(users: &[Identity]) -> crate::Result<String> {
    Ok(serde_json::to_string(&RegistryDocRef {
        version: SCHEMA_VERSION,
        users,
    })?)
}

pub(crate) fn decode_registry(key: &str, raw: &str) -> crate::Result<Vec<Identity>> {
    match serde_json::from_str::<RegistryDoc>(raw).map_err(|e| corrupt(key, e))? {
        RegistryDoc::Versioned { version, users } => {
            check_version(key, version)?;
            Ok(users)
        }
        RegistryDoc::Legacy(users) => Ok(users),
    }
}

pub(crate) fn encode_session(session: &Session) -> crate::Result<String> {
    Ok(serde_json::to_string(&SessionDocRef {
        version: SCHEMA_VERSION,
        session,
    })?)
}

pub(crate) fn decode_session(key: &str, raw: &str) -> crate::Result<Session> {
    let doc: SessionDoc = serde_json::from_str(raw).map_err(|e| corrupt(key, e))?;
    check_version(key, doc.version)?;
    Ok(doc.session)
}
