//! In-memory identity provider for handler tests.
//!
//! Custom tokens look like `custom:<uid>:<profile>` and ID tokens like
//! `id:<uid>:<profile>`, so tests can forge or corrupt them by hand.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{
    AccountIdentity, Claims, IdentityError, IdentityProvider, ProviderSession, VerifiedIdentity,
    PROFILE_CLAIM, USER_PROFILE,
};

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    password: String,
}

#[derive(Debug, Default)]
pub struct FakeIdentity {
    // email -> account
    accounts: Mutex<HashMap<String, Account>>,
    next_uid: AtomicUsize,
    pub failed_credential_checks: AtomicUsize,
    pub minted_tokens: AtomicUsize,
    /// When set, `update_account` reports success but keeps the old password
    pub drop_password_updates: AtomicBool,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with a chosen uid
    pub fn with_account(self, uid: &str, email: &str, password: &str) -> Self {
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            Account {
                uid: uid.to_string(),
                password: password.to_string(),
            },
        );
        self
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    /// Custom token for `uid` with an arbitrary profile claim
    pub fn custom_token_for(uid: &str, profile: &str) -> String {
        format!("custom:{}:{}", uid, profile)
    }

    fn email_of(&self, uid: &str) -> Option<String> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|(_, account)| account.uid == uid)
            .map(|(email, _)| email.clone())
    }
}

fn split_token<'a>(token: &'a str, prefix: &str) -> Option<(&'a str, &'a str)> {
    let rest = token.strip_prefix(prefix)?.strip_prefix(':')?;
    let (uid, profile) = rest.split_once(':')?;
    if uid.is_empty() {
        return None;
    }
    Some((uid, profile))
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountIdentity, IdentityError> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some(account) if account.password == password => Ok(AccountIdentity {
                account_id: account.uid.clone(),
                email: email.to_string(),
            }),
            _ => {
                self.failed_credential_checks.fetch_add(1, Ordering::SeqCst);
                Err(IdentityError::InvalidCredentials)
            }
        }
    }

    async fn exchange_custom_token(&self, token: &str) -> Result<ProviderSession, IdentityError> {
        let (uid, profile) =
            split_token(token, "custom").ok_or(IdentityError::TokenExchangeFailed)?;
        Ok(ProviderSession {
            id_token: format!("id:{}:{}", uid, profile),
            refresh_token: None,
            expires_in: Some("3600".to_string()),
        })
    }

    async fn verify_session(
        &self,
        session: &ProviderSession,
    ) -> Result<VerifiedIdentity, IdentityError> {
        let (uid, profile) =
            split_token(&session.id_token, "id").ok_or(IdentityError::InvalidToken)?;
        let email = self.email_of(uid).ok_or(IdentityError::InvalidToken)?;

        let mut claims = Claims::new();
        claims.insert("user_id".to_string(), Value::String(uid.to_string()));
        claims.insert("email".to_string(), Value::String(email));
        if !profile.is_empty() {
            claims.insert(PROFILE_CLAIM.to_string(), Value::String(profile.to_string()));
        }
        VerifiedIdentity::from_claims(claims, None, None)
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountIdentity, IdentityError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(IdentityError::AccountAlreadyExists(email.to_string()));
        }
        let uid = format!("uid-{}", self.next_uid.fetch_add(1, Ordering::SeqCst) + 1);
        accounts.insert(
            email.to_string(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
            },
        );
        Ok(AccountIdentity {
            account_id: uid.clone(),
            email: email.to_string(),
        })
    }

    fn mint_custom_token(&self, account_id: &str, claims: &Claims) -> Result<String, IdentityError> {
        self.minted_tokens.fetch_add(1, Ordering::SeqCst);
        let profile = claims
            .get(PROFILE_CLAIM)
            .and_then(Value::as_str)
            .unwrap_or(USER_PROFILE);
        Ok(Self::custom_token_for(account_id, profile))
    }

    async fn update_account(
        &self,
        account_id: &str,
        email: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.lock().unwrap();
        if self.drop_password_updates.load(Ordering::SeqCst) {
            return Ok(());
        }
        let old_email = accounts
            .iter()
            .find(|(_, account)| account.uid == account_id)
            .map(|(email, _)| email.clone())
            .ok_or_else(|| IdentityError::UpdateFailed("USER_NOT_FOUND".to_string()))?;
        accounts.remove(&old_email);
        accounts.insert(
            email.to_string(),
            Account {
                uid: account_id.to_string(),
                password: new_password.to_string(),
            },
        );
        Ok(())
    }
}
