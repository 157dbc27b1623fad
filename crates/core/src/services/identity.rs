//! Voter identity resolution.
//!
//! Anonymous voters are identified by an opaque session token the client
//! generates and keeps. Signed-in voters are identified by an account id that
//! a trusted upstream has already verified. Account ids are namespaced so the
//! two can never collide in the ledger.

use rtr_common::{AppError, AppResult};
use std::fmt;

/// Longest accepted session token or account id.
pub const MAX_VOTER_ID_LEN: usize = 128;

/// Prefix reserved for authenticated voters.
pub const ACCOUNT_PREFIX: &str = "account:";

/// Who is casting or viewing a vote.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VoterIdentity {
    /// Client-generated session token.
    Anonymous(String),
    /// Verified account id, without the namespace prefix.
    Account(String),
}

impl VoterIdentity {
    /// The key stored in the ledger.
    #[must_use]
    pub fn voter_id(&self) -> String {
        match self {
            Self::Anonymous(token) => token.clone(),
            Self::Account(id) => format!("{ACCOUNT_PREFIX}{id}"),
        }
    }

    /// Whether the voter is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Account(_))
    }
}

impl fmt::Display for VoterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.voter_id())
    }
}

fn checked(raw: &str, what: &str) -> AppResult<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{what} must not be empty")));
    }
    if value.chars().count() > MAX_VOTER_ID_LEN {
        return Err(AppError::Validation(format!(
            "{what} is too long (max {MAX_VOTER_ID_LEN} chars)"
        )));
    }
    Ok(value.to_string())
}

/// Turns request credentials into a [`VoterIdentity`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl IdentityResolver {
    /// Create a new resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validate an anonymous session token.
    pub fn anonymous(&self, token: &str) -> AppResult<VoterIdentity> {
        let token = checked(token, "Voter id")?;
        if token.starts_with(ACCOUNT_PREFIX) {
            return Err(AppError::Validation(format!(
                "Voter id must not start with '{ACCOUNT_PREFIX}'"
            )));
        }
        Ok(VoterIdentity::Anonymous(token))
    }

    /// Validate a verified account id.
    pub fn account(&self, account_id: &str) -> AppResult<VoterIdentity> {
        checked(account_id, "Account id").map(VoterIdentity::Account)
    }

    /// Resolve the caller, preferring a verified account over a session token.
    ///
    /// Returns `Ok(None)` when the caller supplied neither.
    pub fn resolve(
        &self,
        account_id: Option<&str>,
        session_token: Option<&str>,
    ) -> AppResult<Option<VoterIdentity>> {
        if let Some(account_id) = account_id {
            return self.account(account_id).map(Some);
        }
        session_token.map(|token| self.anonymous(token)).transpose()
    }
}
