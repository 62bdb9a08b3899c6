//! User directory: registration and credential verification.

use crate::credential;
use crate::error::{Error, Result};
use crate::store::{CsvStore, Mutation, RecordStore};
use crate::types::{Session, User};
use std::path::Path;

/// Identity storage on top of a [`RecordStore`].
///
/// Phone numbers are unique. The uniqueness check and the append happen in
/// one locked cycle, so concurrent registrations of the same phone cannot
/// both succeed.
#[derive(Debug)]
pub struct UserDirectory<S = CsvStore<User>> {
    store: S,
}

impl UserDirectory<CsvStore<User>> {
    /// Open the user table at `path`, creating it if absent
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_store(CsvStore::open(path)?))
    }
}

impl<S: RecordStore<User>> UserDirectory<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    /// Register a new account.
    ///
    /// Fails with [`Error::DuplicatePhone`] if `phone` is taken (exact,
    /// case-sensitive match).
    pub fn register(&self, name: &str, phone: &str, password: &str) -> Result<User> {
        require("name", name)?;
        require("phone", phone)?;
        require("password", password)?;

        // Hash outside the lock; Argon2 is deliberately slow.
        let user = User {
            name: name.to_string(),
            phone: phone.to_string(),
            password_hash: credential::hash_password(password)?,
        };

        let user = self.store.transact(|users| {
            if users.iter().any(|u| u.phone == user.phone) {
                return Err(Error::DuplicatePhone(user.phone.clone()));
            }
            Ok((Mutation::Append(user.clone()), user))
        })?;

        tracing::info!(phone = %user.phone, "Registered user");
        Ok(user)
    }

    /// Verify a phone/password pair and return the caller's session.
    ///
    /// Unknown phone and wrong password both yield
    /// [`Error::InvalidCredentials`] with the same cost.
    pub fn authenticate(&self, phone: &str, password: &str) -> Result<Session> {
        let users = self.store.load_all()?;
        let mut candidates = users.iter().filter(|u| u.phone == phone).peekable();

        if candidates.peek().is_none() {
            credential::verify_dummy(password);
            tracing::debug!("Authentication failed");
            return Err(Error::InvalidCredentials);
        }

        match candidates.find(|u| credential::verify_password(password, &u.password_hash)) {
            Some(user) => Ok(Session::from(user)),
            None => {
                tracing::debug!("Authentication failed");
                Err(Error::InvalidCredentials)
            }
        }
    }

    /// Look up a user by phone
    pub fn find(&self, phone: &str) -> Result<Option<User>> {
        Ok(self.store.load_all()?.into_iter().find(|u| u.phone == phone))
    }

    /// All users in registration order
    pub fn list(&self) -> Result<Vec<User>> {
        self.store.load_all()
    }

    /// Append already-hashed users whose phone is not yet present.
    ///
    /// Returns how many were added.
    pub(crate) fn import(&self, incoming: Vec<User>) -> Result<usize> {
        self.store.transact(|users| {
            let mut seen: std::collections::HashSet<String> =
                users.iter().map(|u| u.phone.clone()).collect();
            let fresh: Vec<User> = incoming
                .into_iter()
                .filter(|u| seen.insert(u.phone.clone()))
                .collect();
            let added = fresh.len();
            Ok((Mutation::AppendAll(fresh), added))
        })
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}
