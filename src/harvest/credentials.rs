//! Ordered pool of API credentials.

use crate::harvest::traits::HarvestError;
use crate::model::Credential;

/// Signalled by [`CredentialPool::advance`] once every credential was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted;

/// Ordered credentials with a forward-only cursor.
///
/// The cursor never wraps: once a credential was rotated away from it is not
/// used again for the rest of the run.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    current: usize,
}

impl CredentialPool {
    pub fn new(credentials: Vec<Credential>) -> Result<Self, HarvestError> {
        if credentials.is_empty() {
            return Err(HarvestError::EmptyPool);
        }
        Ok(Self {
            credentials,
            current: 0,
        })
    }

    pub fn current(&self) -> &Credential {
        &self.credentials[self.current]
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Moves to the next credential.
    pub fn advance(&mut self) -> Result<&Credential, Exhausted> {
        if self.current + 1 >= self.credentials.len() {
            return Err(Exhausted);
        }
        self.current += 1;
        Ok(&self.credentials[self.current])
    }
}
