//! Local demo accounts
//!
//! Accounts and the login flag live inside the state document next to the
//! learner's progress. Nothing leaves the machine; this only decides whose
//! name the profile shows and whether practice commands are unlocked.

use anyhow::Result;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::state::{Account, StateDocument, StateSlot, StateStore, DEFAULT_LEARNER_NAME};

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Please enter email and password.")]
    MissingCredentials,
    #[error("Password must be at least {min} characters.")]
    WeakPassword { min: usize },
    #[error("Account already exists. Please log in.")]
    AccountExists,
    #[error("Invalid email or password.")]
    InvalidCredentials,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create an account and log it in
pub fn sign_up(doc: &mut StateDocument, name: &str, email: &str, password: &str) -> Result<(), AuthError> {
    let name = match name.trim() {
        "" => DEFAULT_LEARNER_NAME,
        trimmed => trimmed,
    };
    let email = normalize_email(email);
    let password = password.trim();

    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword { min: MIN_PASSWORD_LEN });
    }
    if doc.users.iter().any(|u| u.email == email) {
        return Err(AuthError::AccountExists);
    }

    doc.users.push(Account::new(email.clone(), hash_password(password), name));
    doc.auth.is_logged_in = true;
    doc.auth.current_email = Some(email);
    doc.profile.name = name.to_string();
    Ok(())
}

/// Check credentials and open a session
pub fn log_in(doc: &mut StateDocument, email: &str, password: &str) -> Result<(), AuthError> {
    let email = normalize_email(email);
    let password = password.trim();

    let account = doc
        .users
        .iter_mut()
        .find(|u| u.email == email)
        .filter(|u| credentials_match(u, password))
        .ok_or(AuthError::InvalidCredentials)?;

    if account.legacy_password.take().is_some() {
        account.password_hash = hash_password(password);
        info!("Upgraded stored password for {}", email);
    }

    let name = if account.name.is_empty() {
        DEFAULT_LEARNER_NAME.to_string()
    } else {
        account.name.clone()
    };

    doc.auth.is_logged_in = true;
    doc.auth.current_email = Some(email);
    doc.profile.name = name;
    Ok(())
}

pub fn log_out(doc: &mut StateDocument) {
    doc.auth.is_logged_in = false;
    doc.auth.current_email = None;
}

pub fn is_logged_in(doc: &StateDocument) -> bool {
    doc.auth.is_logged_in
}

/// [`sign_up`] against a store
pub fn sign_up_in<S: StateSlot>(store: &StateStore<S>, name: &str, email: &str, password: &str) -> Result<()> {
    let mut doc = store.load();
    sign_up(&mut doc, name, email, password)?;
    store.save(&doc)?;
    info!("Created account {}", normalize_email(email));
    Ok(())
}

/// [`log_in`] against a store
pub fn log_in_to<S: StateSlot>(store: &StateStore<S>, email: &str, password: &str) -> Result<()> {
    let mut doc = store.load();
    log_in(&mut doc, email, password)?;
    store.save(&doc)?;
    info!("Logged in {}", normalize_email(email));
    Ok(())
}

/// [`log_out`] against a store
pub fn log_out_of<S: StateSlot>(store: &StateStore<S>) -> Result<()> {
    store.update(log_out)
}

fn credentials_match(account: &Account, password: &str) -> bool {
    if !account.password_hash.is_empty() {
        return verify_password(password, &account.password_hash);
    }
    account.legacy_password.as_deref() == Some(password)
}

/// Salted SHA-256, stored as `salt$hash` in base64
pub fn hash_password(password: &str) -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let salt: [u8; 16] = rng.random();
    let salt_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, salt);
    format!("{}${}", salt_b64, digest(password, &salt_b64))
}

/// Check a password against a `salt$hash` string
pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt_b64, hash_b64)) => digest(password, salt_b64) == hash_b64,
        None => false,
    }
}

fn digest(password: &str, salt_b64: &str) -> String {
    let combined = format!("{}{}", password, salt_b64);
    let hash = Sha256::digest(combined.as_bytes());
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, hash)
}
