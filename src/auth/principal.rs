use serde::Serialize;

use crate::oauth::AccessToken;

/// Separator between the NSID and the username in the session identifier.
///
/// NSIDs never contain it, so decoding splits on the first occurrence and
/// usernames may contain it freely.
pub const SEPARATOR: char = ':';

/// The logged-in Flickr user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_nsid: String,
    pub username: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PrincipalError {
    #[error("identifier has no `:` separator")]
    MissingSeparator,

    #[error("identifier has an empty NSID")]
    EmptyNsid,
}

impl Principal {
    pub fn new(user_nsid: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_nsid: user_nsid.into(),
            username: username.into(),
        }
    }

    pub fn from_access_token(token: &AccessToken) -> Self {
        Self::new(token.user_nsid.clone(), token.username.clone())
    }

    /// `"{user_nsid}:{username}"`
    pub fn encode(&self) -> String {
        format!("{}{SEPARATOR}{}", self.user_nsid, self.username)
    }

    pub fn decode(id: &str) -> Result<Self, PrincipalError> {
        let (user_nsid, username) = id
            .split_once(SEPARATOR)
            .ok_or(PrincipalError::MissingSeparator)?;
        if user_nsid.is_empty() {
            return Err(PrincipalError::EmptyNsid);
        }
        Ok(Self::new(user_nsid, username))
    }
}
