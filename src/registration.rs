//! Push-approved device registration.
//!
//! The flow is `Unregistered -> AwaitingUserStatus -> AwaitingPush ->
//! PollingForPin -> Completed`, and any step may end in `Failed`. Nothing is
//! persisted here: the caller stores the returned [`Registration`].

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    clock::Clock,
    service::{AuthyService, DeviceCredentials, RegistrationStatus},
    Error, Result,
};

/// Credentials of the local virtual device.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub user_id: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub device_id: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub seed: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub main_password: String,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl Registration {
    /// A registration is only usable when ids and seed are all present.
    pub fn is_complete(&self) -> bool {
        self.user_id != 0 && self.device_id != 0 && !self.seed.is_empty()
    }

    pub fn credentials(&self) -> DeviceCredentials<'_> {
        DeviceCredentials {
            user_id: self.user_id,
            device_id: self.device_id,
            seed: &self.seed,
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("user_id", &self.user_id)
            .field("device_id", &self.device_id)
            .field("seed", &redact(&self.seed))
            .field("api_key", &redact(&self.api_key))
            .field("main_password", &redact(&self.main_password))
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "***"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    AwaitingUserStatus,
    AwaitingPush,
    PollingForPin,
    Completed,
    Failed,
}

/// Result of one poll attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Pending,
    Ready(T),
}

/// Fixed-interval polling bounded by a wall-clock deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            deadline: Duration::from_secs(5 * 60),
        }
    }
}

impl RetryPolicy {
    /// Calls `attempt` until it is ready or fails, sleeping `interval` between
    /// calls. The deadline starts at the first attempt; once it has passed
    /// the loop ends with [`Error::Timeout`].
    ///
    /// `attempt` receives the time left before the deadline.
    pub fn run<T>(
        &self,
        clock: &dyn Clock,
        mut attempt: impl FnMut(Duration) -> Result<PollOutcome<T>>,
    ) -> Result<T> {
        let deadline = clock.unix_millis() + self.deadline.as_millis() as u64;

        loop {
            let now = clock.unix_millis();
            if now > deadline {
                return Err(Error::Timeout(self.deadline));
            }

            match attempt(Duration::from_millis(deadline - now))? {
                PollOutcome::Ready(value) => return Ok(value),
                PollOutcome::Pending => clock.sleep(self.interval),
            }
        }
    }
}

pub struct Registrar<'a> {
    service: &'a dyn AuthyService,
    clock: &'a dyn Clock,
    policy: RetryPolicy,
    state: RegistrationState,
}

impl<'a> Registrar<'a> {
    pub fn new(service: &'a dyn AuthyService, clock: &'a dyn Clock) -> Self {
        Self {
            service,
            clock,
            policy: RetryPolicy::default(),
            state: RegistrationState::Unregistered,
        }
    }

    pub fn with_policy(&mut self, policy: RetryPolicy) -> &mut Self {
        self.policy = policy;

        self
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// Runs the whole handshake for a phone number.
    pub fn register(&mut self, country_code: u32, mobile: &str) -> Result<Registration> {
        match self.drive(country_code, mobile) {
            Ok(registration) => {
                self.transition(RegistrationState::Completed);
                info!(device_id = registration.device_id, "Device registered");
                Ok(registration)
            }
            Err(err) => {
                self.transition(RegistrationState::Failed);
                error!("Device registration failed: {err}");
                Err(err)
            }
        }
    }

    fn drive(&mut self, country_code: u32, mobile: &str) -> Result<Registration> {
        self.transition(RegistrationState::AwaitingUserStatus);
        let user = self.service.query_user_status(country_code, mobile)?;
        if !user.is_active {
            return Err(Error::Protocol(
                "There doesn't seem to be an Authy account attached to that phone number".into(),
            ));
        }

        self.transition(RegistrationState::AwaitingPush);
        let start = self.service.request_device_registration(user.authy_id)?;
        if !start.success {
            return Err(Error::Protocol(
                "Authy did not accept the device registration request".into(),
            ));
        }

        self.transition(RegistrationState::PollingForPin);
        let service = self.service;
        let pin = self.policy.run(self.clock, |left| {
            info!(
                "Checking device registration status ({}s until we give up)",
                left.as_secs()
            );

            match service.check_device_registration(user.authy_id, &start.request_id)? {
                RegistrationStatus::Pending => Ok(PollOutcome::Pending),
                RegistrationStatus::Accepted { pin } => Ok(PollOutcome::Ready(pin)),
                RegistrationStatus::Other(status) => Err(Error::Protocol(format!(
                    "Invalid status while waiting for device registration: {status}"
                ))),
            }
        })?;

        let completed = self
            .service
            .complete_device_registration(user.authy_id, &pin)?;
        if completed.device.secret_seed.is_empty() {
            return Err(Error::Protocol(
                "Device registration completed without key material".into(),
            ));
        }

        Ok(Registration {
            user_id: completed.authy_id,
            device_id: completed.device.id,
            seed: completed.device.secret_seed,
            api_key: completed.device.api_key,
            main_password: String::new(),
        })
    }

    fn transition(&mut self, next: RegistrationState) {
        debug!(from = ?self.state, to = ?next, "registration state");
        self.state = next;
    }
}
