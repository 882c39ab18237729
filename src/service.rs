//! Boundary to the remote Authy API.
//!
//! The HTTP transport, endpoint URLs and request signing are owned by the
//! implementor. Implementations report network failures as
//! [`Error::Transport`](crate::Error::Transport) and malformed replies as
//! [`Error::Protocol`](crate::Error::Protocol).

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStatus {
    pub authy_id: u64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationStart {
    pub success: bool,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStatus {
    Pending,
    Accepted { pin: String },
    Other(String),
}

impl RegistrationStatus {
    /// Maps the raw status string of the status endpoint.
    pub fn from_wire(status: &str, pin: Option<String>) -> Self {
        match status {
            "pending" => Self::Pending,
            "accepted" => match pin {
                Some(pin) if !pin.is_empty() => Self::Accepted { pin },
                _ => Self::Other("accepted without a registration pin".to_string()),
            },
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedDevice {
    pub id: u64,
    pub secret_seed: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRegistration {
    pub authy_id: u64,
    pub device: CompletedDevice,
}

/// Credentials used by every authenticated call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCredentials<'a> {
    pub user_id: u64,
    pub device_id: u64,
    pub seed: &'a str,
}

/// An Authy-managed app, whose secret is derived from its seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorApp {
    pub name: String,
    pub digits: u32,
    pub secret_seed: String,
}

/// A third-party token, encrypted with the account's backup password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorToken {
    pub name: String,
    pub original_name: String,
    pub digits: u32,
    pub encrypted_seed: String,
    pub salt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppList {
    pub success: bool,
    pub apps: Vec<AuthenticatorApp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenList {
    pub success: bool,
    pub tokens: Vec<AuthenticatorToken>,
}

pub trait AuthyService {
    fn query_user_status(&self, country_code: u32, mobile: &str) -> Result<UserStatus>;

    /// Starts a push-approved device registration.
    fn request_device_registration(&self, authy_id: u64) -> Result<RegistrationStart>;

    fn check_device_registration(
        &self,
        authy_id: u64,
        request_id: &str,
    ) -> Result<RegistrationStatus>;

    fn complete_device_registration(&self, authy_id: u64, pin: &str)
        -> Result<CompletedRegistration>;

    fn list_authenticator_apps(&self, credentials: DeviceCredentials<'_>) -> Result<AppList>;

    fn list_authenticator_tokens(&self, credentials: DeviceCredentials<'_>) -> Result<TokenList>;

    /// Recovers the base32 secret of a token with the backup password.
    fn decrypt_token(&self, token: &AuthenticatorToken, password: &str) -> Result<String>;

    /// Derives the current base32 secret of an Authy app.
    fn app_secret(&self, app: &AuthenticatorApp) -> Result<String>;
}
