use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::storage::{KeyValueStore, AUTH_USER_KEY};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
}

/// The only failure callers see. Provider error codes are logged, never surfaced.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication failed")]
    Failed,
}

// --- Provider trait ---

pub trait AuthProvider {
    fn login(&self, email: &str, password: &str) -> Result<User>;
    fn signup(&self, email: &str, password: &str, display_name: &str) -> Result<User>;
    fn sign_in_with_external_provider(&self) -> Result<User>;
    fn name(&self) -> &str;
}

// --- Firebase provider (Identity Toolkit REST API) ---

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: &'static str,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: Option<String>,
}

impl AccountResponse {
    fn into_user(self, fallback_email: &str) -> User {
        User {
            uid: self.local_id,
            display_name: self
                .display_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "User".to_string()),
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
            signed_in_at: Utc::now(),
        }
    }
}

#[derive(Debug)]
pub struct FirebaseProvider {
    api_key: String,
    google_id_token: Option<String>,
    client: reqwest::blocking::Client,
}

impl FirebaseProvider {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.firebase_api_key.clone().context(
            "FIREBASE_API_KEY environment variable not set. Set it with: export FIREBASE_API_KEY=your-web-api-key",
        )?;
        Ok(Self {
            api_key,
            google_id_token: config.google_id_token.clone(),
            client: reqwest::blocking::Client::new(),
        })
    }

    fn call<T: Serialize>(&self, method: &str, body: &T) -> Result<AccountResponse> {
        let response = self
            .client
            .post(format!("{}:{}", IDENTITY_TOOLKIT_URL, method))
            .query(&[("key", &self.api_key)])
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .with_context(|| format!("Failed to send {} request to Firebase", method))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Firebase {} failed with status {}: {}",
                method,
                status,
                error_text
            ));
        }

        response
            .json()
            .with_context(|| format!("Failed to parse Firebase {} response", method))
    }
}

impl AuthProvider for FirebaseProvider {
    fn login(&self, email: &str, password: &str) -> Result<User> {
        let account = self.call(
            "signInWithPassword",
            &PasswordRequest {
                email,
                password,
                return_secure_token: true,
            },
        )?;
        Ok(account.into_user(email))
    }

    fn signup(&self, email: &str, password: &str, display_name: &str) -> Result<User> {
        let account = self.call(
            "signUp",
            &PasswordRequest {
                email,
                password,
                return_secure_token: true,
            },
        )?;
        let id_token = account
            .id_token
            .as_deref()
            .ok_or_else(|| anyhow!("No idToken in Firebase signUp response"))?;

        let mut user = self
            .call(
                "update",
                &UpdateProfileRequest {
                    id_token,
                    display_name,
                    return_secure_token: false,
                },
            )?
            .into_user(email);
        user.uid = account.local_id;
        Ok(user)
    }

    fn sign_in_with_external_provider(&self) -> Result<User> {
        let token = self
            .google_id_token
            .as_deref()
            .context("GOOGLE_ID_TOKEN environment variable not set")?;
        let account = self.call(
            "signInWithIdp",
            &IdpRequest {
                post_body: format!("id_token={}&providerId=google.com", token),
                request_uri: "http://localhost",
                return_idp_credential: true,
                return_secure_token: true,
            },
        )?;
        let email = account
            .email
            .clone()
            .ok_or_else(|| anyhow!("Google account has no email"))?;
        Ok(account.into_user(&email))
    }

    fn name(&self) -> &str {
        "firebase"
    }
}

// --- Session ---

pub type SubscriptionId = u64;
type Listener<'a> = Box<dyn FnMut(Option<&User>) + 'a>;

/// Explicit authentication state. Created once at startup, `start`ed to
/// restore the persisted user and begin notifying listeners, `stop`ped to
/// drop every listener.
pub struct AuthSession<'a> {
    provider: Option<Box<dyn AuthProvider + 'a>>,
    store: &'a dyn KeyValueStore,
    user: Option<User>,
    listeners: Vec<(SubscriptionId, Listener<'a>)>,
    next_id: SubscriptionId,
    started: bool,
}

impl<'a> AuthSession<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self {
            provider: None,
            store,
            user: None,
            listeners: Vec::new(),
            next_id: 0,
            started: false,
        }
    }

    pub fn with_provider(mut self, provider: Box<dyn AuthProvider + 'a>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn start(&mut self) {
        self.user = match self.store.get(AUTH_USER_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| tracing::warn!("Ignoring malformed saved session: {}", e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Could not read saved session: {:#}", e);
                None
            }
        };
        self.started = true;
        self.notify();
    }

    pub fn stop(&mut self) {
        self.listeners.clear();
        self.started = false;
    }

    pub fn subscribe(&mut self, listener: impl FnMut(Option<&User>) + 'a) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(existing, _)| *existing != id);
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<&User, AuthError> {
        let result = check_credentials(email, password)
            .and_then(|()| self.provider()?.login(email, password));
        self.finish("login", result)
    }

    pub fn signup(&mut self, email: &str, password: &str, display_name: &str) -> Result<&User, AuthError> {
        let result = check_credentials(email, password)
            .and_then(|()| {
                if display_name.trim().is_empty() {
                    return Err(anyhow!("display name is required"));
                }
                Ok(())
            })
            .and_then(|()| self.provider()?.signup(email, password, display_name.trim()));
        self.finish("signup", result)
    }

    pub fn sign_in_with_external_provider(&mut self) -> Result<&User, AuthError> {
        let result = self
            .provider()
            .and_then(|provider| provider.sign_in_with_external_provider());
        self.finish("external sign-in", result)
    }

    pub fn logout(&mut self) {
        if self.user.take().is_some() {
            if let Err(e) = self.store.remove(AUTH_USER_KEY) {
                tracing::warn!("Could not clear saved session: {:#}", e);
            }
            self.notify();
        }
    }

    fn provider(&self) -> Result<&dyn AuthProvider> {
        self.provider
            .as_deref()
            .ok_or_else(|| anyhow!("no authentication provider configured"))
    }

    fn finish(&mut self, action: &str, result: Result<User>) -> Result<&User, AuthError> {
        match result {
            Ok(user) => {
                tracing::info!(email = %user.email, "{} succeeded", action);
                match serde_json::to_string(&user) {
                    Ok(encoded) => {
                        if let Err(e) = self.store.set(AUTH_USER_KEY, &encoded) {
                            tracing::warn!("Could not save session: {:#}", e);
                        }
                    }
                    Err(e) => tracing::warn!("Could not encode session: {}", e),
                }
                self.user = Some(user);
                self.notify();
                self.user.as_ref().ok_or(AuthError::Failed)
            }
            Err(e) => {
                tracing::debug!("{} failed: {:#}", action, e);
                Err(AuthError::Failed)
            }
        }
    }

    fn notify(&mut self) {
        if !self.started {
            return;
        }
        for (_, listener) in self.listeners.iter_mut() {
            listener(self.user.as_ref());
        }
    }
}

fn check_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(anyhow!("email is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(anyhow!("password shorter than {} characters", MIN_PASSWORD_LEN));
    }
    Ok(())
}
