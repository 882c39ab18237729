//! Test doubles shared by the unit tests.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    time::Duration,
};

use crate::{
    clock::Clock,
    device::Prompt,
    service::{
        AppList, AuthenticatorApp, AuthenticatorToken, AuthyService, CompletedDevice,
        CompletedRegistration, DeviceCredentials, RegistrationStart, RegistrationStatus,
        TokenList, UserStatus,
    },
    store::BlobStore,
    Error, Result,
};

/// Clock that only moves when slept on or advanced.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: Cell<u64>,
    slept: Cell<Duration>,
}

impl ManualClock {
    pub fn at_millis(millis: u64) -> Self {
        Self {
            millis: Cell::new(millis),
            slept: Cell::default(),
        }
    }

    pub fn advance_millis(&self, millis: u64) {
        self.millis.set(self.millis.get() + millis);
    }

    pub fn slept(&self) -> Duration {
        self.slept.get()
    }
}

impl Clock for ManualClock {
    fn unix_millis(&self) -> u64 {
        self.millis.get()
    }

    fn sleep(&self, duration: Duration) {
        self.slept.set(self.slept.get() + duration);
        self.advance_millis(duration.as_millis() as u64);
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RefCell<HashMap<String, Vec<u8>>>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn with_blob(self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.blobs.borrow_mut().insert(name.to_string(), bytes.into());
        self
    }

    pub fn json(&self, name: &str) -> Option<serde_json::Value> {
        self.blobs
            .borrow()
            .get(name)
            .map(|bytes| serde_json::from_slice(bytes).unwrap())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blobs.borrow().contains_key(name)
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl BlobStore for MemoryStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.borrow().get(name).cloned())
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.writes.set(self.writes.get() + 1);
        self.blobs.borrow_mut().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Prompt answering from fixed values, counting how often it was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    pub country_code: String,
    pub mobile: String,
    pub password: String,
    pub keyword: String,
    asked: RefCell<Vec<&'static str>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self {
            country_code: "1".into(),
            mobile: "5551234".into(),
            password: StubService::PASSWORD.into(),
            ..Default::default()
        }
    }

    pub fn asked(&self) -> Vec<&'static str> {
        self.asked.borrow().clone()
    }
}

impl Prompt for ScriptedPrompt {
    fn country_code(&self) -> Result<String> {
        self.asked.borrow_mut().push("country_code");
        Ok(self.country_code.clone())
    }

    fn mobile(&self) -> Result<String> {
        self.asked.borrow_mut().push("mobile");
        Ok(self.mobile.clone())
    }

    fn password(&self) -> Result<String> {
        self.asked.borrow_mut().push("password");
        Ok(self.password.clone())
    }

    fn keyword(&self) -> Result<String> {
        self.asked.borrow_mut().push("keyword");
        Ok(self.keyword.clone())
    }
}

/// In-memory Authy service.
///
/// Tokens decrypt to their `encrypted_seed` when given [`Self::PASSWORD`];
/// seeds starting with `corrupt` never decrypt. Apps derive their secret from
/// `secret_seed`, an empty seed fails.
#[derive(Debug)]
pub struct StubService {
    active_user: bool,
    push_accepted: bool,
    completed_seed: String,
    statuses: RefCell<VecDeque<RegistrationStatus>>,
    status_error: bool,
    apps: AppList,
    tokens: TokenList,
    status_checks: Cell<usize>,
    registration_requests: Cell<usize>,
    completed_pin: RefCell<Option<String>>,
    token_fetches: Cell<usize>,
}

impl Default for StubService {
    fn default() -> Self {
        Self {
            active_user: true,
            push_accepted: true,
            completed_seed: "seed".into(),
            statuses: RefCell::new(VecDeque::from([RegistrationStatus::Accepted {
                pin: "0000".into(),
            }])),
            status_error: false,
            apps: AppList {
                success: true,
                apps: vec![],
            },
            tokens: TokenList {
                success: true,
                tokens: vec![],
            },
            status_checks: Cell::new(0),
            registration_requests: Cell::new(0),
            completed_pin: RefCell::new(None),
            token_fetches: Cell::new(0),
        }
    }
}

impl StubService {
    pub const AUTHY_ID: u64 = 4242;
    pub const DEVICE_ID: u64 = 777;
    pub const PASSWORD: &'static str = "backup-password";

    pub fn with_active_user(mut self, active: bool) -> Self {
        self.active_user = active;
        self
    }

    pub fn with_push_accepted(mut self, accepted: bool) -> Self {
        self.push_accepted = accepted;
        self
    }

    pub fn with_completed_seed(mut self, seed: &str) -> Self {
        self.completed_seed = seed.into();
        self
    }

    /// Statuses returned in order, the last one repeats.
    pub fn with_statuses(self, statuses: Vec<RegistrationStatus>) -> Self {
        *self.statuses.borrow_mut() = statuses.into();
        self
    }

    pub fn with_status_error(mut self) -> Self {
        self.status_error = true;
        self
    }

    pub fn with_apps(mut self, success: bool, apps: Vec<AuthenticatorApp>) -> Self {
        self.apps = AppList { success, apps };
        self
    }

    pub fn with_tokens(mut self, success: bool, tokens: Vec<AuthenticatorToken>) -> Self {
        self.tokens = TokenList { success, tokens };
        self
    }

    pub fn status_checks(&self) -> usize {
        self.status_checks.get()
    }

    pub fn registration_requests(&self) -> usize {
        self.registration_requests.get()
    }

    pub fn completed_pin(&self) -> Option<String> {
        self.completed_pin.borrow().clone()
    }

    pub fn token_fetches(&self) -> usize {
        self.token_fetches.get()
    }
}

pub fn server_token(name: &str, original_name: &str, seed: &str) -> AuthenticatorToken {
    AuthenticatorToken {
        name: name.into(),
        original_name: original_name.into(),
        digits: 6,
        encrypted_seed: seed.into(),
        salt: "salt".into(),
    }
}

pub fn server_app(name: &str, seed: &str) -> AuthenticatorApp {
    AuthenticatorApp {
        name: name.into(),
        digits: 7,
        secret_seed: seed.into(),
    }
}

impl AuthyService for StubService {
    fn query_user_status(&self, _country_code: u32, _mobile: &str) -> Result<UserStatus> {
        Ok(UserStatus {
            authy_id: Self::AUTHY_ID,
            is_active: self.active_user,
        })
    }

    fn request_device_registration(&self, _authy_id: u64) -> Result<RegistrationStart> {
        self.registration_requests
            .set(self.registration_requests.get() + 1);
        Ok(RegistrationStart {
            success: self.push_accepted,
            request_id: "request-1".into(),
        })
    }

    fn check_device_registration(
        &self,
        authy_id: u64,
        request_id: &str,
    ) -> Result<RegistrationStatus> {
        assert_eq!(authy_id, Self::AUTHY_ID);
        assert_eq!(request_id, "request-1");
        self.status_checks.set(self.status_checks.get() + 1);

        if self.status_error {
            return Err(Error::Transport("connection reset".into()));
        }

        let mut statuses = self.statuses.borrow_mut();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().unwrap())
        } else {
            Ok(statuses.front().cloned().unwrap())
        }
    }

    fn complete_device_registration(
        &self,
        authy_id: u64,
        pin: &str,
    ) -> Result<CompletedRegistration> {
        *self.completed_pin.borrow_mut() = Some(pin.to_string());
        Ok(CompletedRegistration {
            authy_id,
            device: CompletedDevice {
                id: Self::DEVICE_ID,
                secret_seed: self.completed_seed.clone(),
                api_key: "api-key".into(),
            },
        })
    }

    fn list_authenticator_apps(&self, credentials: DeviceCredentials<'_>) -> Result<AppList> {
        assert_eq!(credentials.device_id, Self::DEVICE_ID);
        Ok(self.apps.clone())
    }

    fn list_authenticator_tokens(&self, credentials: DeviceCredentials<'_>) -> Result<TokenList> {
        assert_eq!(credentials.device_id, Self::DEVICE_ID);
        self.token_fetches.set(self.token_fetches.get() + 1);
        Ok(self.tokens.clone())
    }

    fn decrypt_token(&self, token: &AuthenticatorToken, password: &str) -> Result<String> {
        if password != Self::PASSWORD || token.encrypted_seed.starts_with("corrupt") {
            return Err(Error::Protocol(format!("cannot decrypt {}", token.name)));
        }
        Ok(token.encrypted_seed.clone())
    }

    fn app_secret(&self, app: &AuthenticatorApp) -> Result<String> {
        if app.secret_seed.is_empty() {
            return Err(Error::Protocol(format!("no seed for {}", app.name)));
        }
        Ok(app.secret_seed.clone())
    }
}
