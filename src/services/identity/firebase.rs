// src/services/identity/firebase.rs
//! Identity Toolkit REST client (Firebase Authentication)

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::credentials::ServiceAccountSigner;
use super::{
    AccountIdentity, Claims, IdentityError, IdentityProvider, ProviderSession, VerifiedIdentity,
};
use crate::common::config::DEFAULT_FAILURE_BACKOFF_MS;
use crate::common::safe_email_log;

/// Provider error codes meaning the email is already registered
const EMAIL_EXISTS_CODES: &[&str] = &["EMAIL_EXISTS", "DUPLICATE_EMAIL"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomTokenSignInResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

pub struct FirebaseIdentity {
    http: Client,
    base_url: String,
    api_key: String,
    signer: ServiceAccountSigner,
    failure_backoff: Duration,
}

impl FirebaseIdentity {
    /// `base_url` is the versioned API root, e.g. `https://identitytoolkit.googleapis.com/v1`.
    /// The shared `http` client carries the outbound timeout.
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        signer: ServiceAccountSigner,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!(base_url = %base_url, project_id = %signer.project_id(), "Identity client initialized");
        Self {
            http,
            base_url,
            api_key: api_key.into(),
            signer,
            failure_backoff: Duration::from_millis(DEFAULT_FAILURE_BACKOFF_MS),
        }
    }

    /// Delay inserted before reporting a failed credential check or token exchange.
    /// Slows down credential stuffing; only the failing request waits.
    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    fn public_url(&self, method: &str) -> String {
        format!("{}/accounts:{}", self.base_url, method)
    }

    fn admin_url(&self, method: Option<&str>) -> String {
        let base = format!("{}/projects/{}/accounts", self.base_url, self.signer.project_id());
        match method {
            Some(method) => format!("{}:{}", base, method),
            None => base,
        }
    }

    async fn post_public(&self, method: &str, body: &Value) -> Result<Response, IdentityError> {
        self.http
            .post(self.public_url(method))
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| unavailable(method, e))
    }

    async fn post_admin(&self, method: Option<&str>, body: &Value) -> Result<Response, IdentityError> {
        let access_token = self.signer.access_token(&self.http).await?;
        let endpoint = method.unwrap_or("create");
        self.http
            .post(self.admin_url(method))
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| unavailable(endpoint, e))
    }

    async fn fail_after_backoff(&self, err: IdentityError) -> IdentityError {
        debug!(backoff_ms = self.failure_backoff.as_millis() as u64, "Applying failure backoff");
        tokio::time::sleep(self.failure_backoff).await;
        err
    }
}

fn unavailable(endpoint: &str, e: reqwest::Error) -> IdentityError {
    error!(error = %e, endpoint = %endpoint, "HTTP error contacting identity provider");
    IdentityError::Unavailable(e.to_string())
}

/// Leading code of a provider error body such as
/// `{"error": {"message": "INVALID_PASSWORD : ..."}}`
fn provider_error_code(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .and_then(|m| m.split([' ', ':']).next())
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

async fn error_code(response: Response) -> Option<String> {
    response
        .json::<Value>()
        .await
        .ok()
        .as_ref()
        .and_then(provider_error_code)
}

/// Decode the payload of an ID token the provider has already accepted
fn decode_id_token_claims(id_token: &str) -> Result<Claims, IdentityError> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    decode::<Claims>(id_token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            warn!(error = %e, "ID token payload rejected");
            IdentityError::InvalidToken
        })
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountIdentity, IdentityError> {
        let response = self
            .post_public(
                "signInWithPassword",
                &json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = error_code(response).await;
            warn!(
                http_status = %status,
                provider_code = ?code,
                email = %safe_email_log(email),
                "Credential check rejected"
            );
            return Err(self.fail_after_backoff(IdentityError::InvalidCredentials).await);
        }

        let parsed: PasswordSignInResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Malformed password sign-in response");
            IdentityError::Unavailable(e.to_string())
        })?;

        debug!(account_id = %parsed.local_id, "Credential check succeeded");
        Ok(AccountIdentity {
            account_id: parsed.local_id,
            email: parsed.email.unwrap_or_else(|| email.to_string()),
        })
    }

    async fn exchange_custom_token(&self, token: &str) -> Result<ProviderSession, IdentityError> {
        let response = self
            .post_public(
                "signInWithCustomToken",
                &json!({ "token": token, "returnSecureToken": true }),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = error_code(response).await;
            warn!(http_status = %status, provider_code = ?code, "Custom token exchange rejected");
            return Err(self.fail_after_backoff(IdentityError::TokenExchangeFailed).await);
        }

        let parsed: CustomTokenSignInResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Malformed custom token sign-in response");
            IdentityError::Unavailable(e.to_string())
        })?;

        Ok(ProviderSession {
            id_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
            expires_in: parsed.expires_in,
        })
    }

    async fn verify_session(
        &self,
        session: &ProviderSession,
    ) -> Result<VerifiedIdentity, IdentityError> {
        let response = self
            .post_public("lookup", &json!({ "idToken": session.id_token }))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = error_code(response).await;
            warn!(http_status = %status, provider_code = ?code, "ID token rejected by provider");
            return Err(IdentityError::InvalidToken);
        }

        let lookup: LookupResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "Malformed account lookup response");
            IdentityError::InvalidToken
        })?;
        let user = lookup.users.into_iter().next().ok_or_else(|| {
            warn!("Account lookup returned no user for ID token");
            IdentityError::InvalidToken
        })?;

        let claims = decode_id_token_claims(&session.id_token)?;
        let identity =
            VerifiedIdentity::from_claims(claims, Some(&user.local_id), user.email.as_deref())?;

        if identity.user_id != user.local_id {
            warn!(
                claim_user_id = %identity.user_id,
                account_id = %user.local_id,
                "ID token subject does not match provider account"
            );
            return Err(IdentityError::InvalidToken);
        }

        Ok(identity)
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountIdentity, IdentityError> {
        let response = self
            .post_admin(None, &json!({ "email": email, "password": password }))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = error_code(response).await;
            if code
                .as_deref()
                .map(|c| EMAIL_EXISTS_CODES.contains(&c))
                .unwrap_or(false)
            {
                info!(email = %safe_email_log(email), "Signup rejected, email already registered");
                return Err(IdentityError::AccountAlreadyExists(email.to_string()));
            }
            error!(http_status = %status, provider_code = ?code, "Account creation failed");
            return Err(IdentityError::CreateFailed(
                code.unwrap_or_else(|| status.to_string()),
            ));
        }

        let parsed: CreateAccountResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Malformed account creation response");
            IdentityError::CreateFailed(e.to_string())
        })?;

        info!(account_id = %parsed.local_id, email = %safe_email_log(email), "Account created");
        Ok(AccountIdentity {
            account_id: parsed.local_id,
            email: parsed.email.unwrap_or_else(|| email.to_string()),
        })
    }

    fn mint_custom_token(&self, account_id: &str, claims: &Claims) -> Result<String, IdentityError> {
        self.signer.custom_token(account_id, claims)
    }

    async fn update_account(
        &self,
        account_id: &str,
        email: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let response = self
            .post_admin(
                Some("update"),
                &json!({ "localId": account_id, "email": email, "password": new_password }),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            let code = error_code(response).await;
            error!(
                http_status = %status,
                provider_code = ?code,
                account_id = %account_id,
                "Account update failed"
            );
            return Err(IdentityError::UpdateFailed(
                code.unwrap_or_else(|| status.to_string()),
            ));
        }

        info!(account_id = %account_id, "Account credentials updated");
        Ok(())
    }
}
