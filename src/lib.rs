//! Local regeneration of Authy one-time passcodes.
//!
//! A "virtual device" is registered against an existing Authy account through
//! the push-approval handshake. The device credentials are then used to pull
//! the account's authenticator tokens, which are decrypted once, cached on
//! disk and turned into TOTP codes on demand.
//!
//! The remote Authy transport is not part of this crate: callers provide an
//! [`service::AuthyService`] implementation.

pub mod base32;
pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod device;
pub mod fuzzy;
pub mod output;
pub mod registration;
pub mod search;
pub mod service;
pub mod store;
pub mod token;
pub mod totp;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Authy service request failed: {0}")]
    Transport(String),
    #[error("Unexpected Authy service response: {0}")]
    Protocol(String),
    #[error("Secret decode error, illegal character {0:?}")]
    SecretDecode(char),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{name} exists but could not be parsed")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Gave up waiting for the device registration after {0:?}")]
    Timeout(Duration),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
