//! The administrator credential.
//!
//! Only the hex-encoded SHA-256 digest of the password is ever kept.

use log::{debug, info, warn};

use crate::config::BallotError;

/// Where the credential of a [`CredentialStore`] came from.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CredentialOrigin {
    /// A valid hash was already stored.
    Stored,
    /// A new password was requested and hashed. It still needs to be persisted.
    Created,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CredentialStore {
    password_hash: String,
}

/// The lowercase hex digest of the UTF-8 bytes of the password.
pub fn hash_password(password: &str) -> String {
    sha256::digest(password)
}

fn is_valid_digest(hash: &str) -> bool {
    hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit())
}

// Compares every byte, whatever the position of the first difference.
fn digests_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

impl CredentialStore {
    /// Wraps a stored hash. Returns None if it is not a hex SHA-256 digest.
    pub fn from_hash(hash: &str) -> Option<CredentialStore> {
        let hash = hash.trim();
        if is_valid_digest(hash) {
            Some(CredentialStore {
                password_hash: hash.to_ascii_lowercase(),
            })
        } else {
            None
        }
    }

    pub fn from_password(password: &str) -> Result<CredentialStore, BallotError> {
        if password.is_empty() {
            return Err(BallotError::Validation(
                "The administrator password cannot be empty.".to_string(),
            ));
        }
        Ok(CredentialStore {
            password_hash: hash_password(password),
        })
    }

    /// Builds the credential at startup.
    ///
    /// The stored hash is used when it is usable. Otherwise `prompt` is called once for a new
    /// password. Declining the prompt, or answering with an empty password, is a
    /// [`BallotError::MissingCredential`]: the ballot box cannot run without an administrator.
    pub fn initialize<F>(
        stored_hash: Option<&str>,
        prompt: F,
    ) -> Result<(CredentialStore, CredentialOrigin), BallotError>
    where
        F: FnOnce() -> Option<String>,
    {
        if let Some(hash) = stored_hash {
            if let Some(store) = CredentialStore::from_hash(hash) {
                debug!("initialize: using the stored administrator credential");
                return Ok((store, CredentialOrigin::Stored));
            }
            warn!("initialize: the stored administrator credential is malformed");
        }
        match prompt() {
            Some(password) if !password.is_empty() => {
                info!("initialize: a new administrator password was set");
                let store = CredentialStore::from_password(&password)?;
                Ok((store, CredentialOrigin::Created))
            }
            _ => Err(BallotError::MissingCredential),
        }
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn verify(&self, candidate_password: &str) -> bool {
        digests_match(&hash_password(candidate_password), &self.password_hash)
    }

    /// Replaces the password. The current one must verify and the new one cannot be empty.
    pub fn change(&mut self, current: &str, new_password: &str) -> Result<(), BallotError> {
        if !self.verify(current) {
            return Err(BallotError::Auth);
        }
        *self = CredentialStore::from_password(new_password)?;
        Ok(())
    }
}
