use std::fmt::Display;

use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::{base32, clock::Clock, Error, Result};

type HmacSha1 = Hmac<Sha1>;

/// Length of one time step, in seconds
pub const INTERVAL: u64 = 30;

/// Every code is reduced modulo one million, whatever its digit count.
pub const PIN_MODULO: u32 = 1_000_000;

pub const DEFAULT_DIGITS: u32 = 6;

/// Step offsets checked around "now": previous, current and next interval
pub const WINDOW: [i64; 3] = [-1, 0, 1];

/// Current 30 second time-step index.
pub fn challenge(clock: &dyn Clock) -> i64 {
    (clock.unix_millis() / 1000 / INTERVAL) as i64
}

/// Seconds left before the current step rolls over, in `1..=30`.
pub fn remaining_seconds(clock: &dyn Clock) -> u64 {
    let step_start = challenge(clock) as u64 * INTERVAL;
    INTERVAL - (clock.unix_seconds() - step_start)
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct OtpCode {
    code: u32,
    digits: u32,
}

impl OtpCode {
    pub fn integer(&self) -> u32 {
        self.code
    }
}

impl Display for OtpCode {
    // Width is a minimum, a longer value is printed as is.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:0padding$}",
            self.code,
            padding = (self.digits as usize)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Totp {
    secret: String,
    digits: u32,
}

impl Totp {
    /// Creates a generator for an RFC4648 base32 encoded secret.
    ///
    /// Obs.: This method defaults to a 6-digit code.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            digits: DEFAULT_DIGITS,
        }
    }

    ///  Sets the number of digits the code is padded to
    ///
    /// WARNING: the value is still reduced modulo one million, so anything
    /// above 6 digits only adds leading zeros
    pub fn with_digits(&mut self, digits: u32) -> &mut Self {
        self.digits = digits;

        self
    }

    /// Generates the code for an absolute time step
    pub fn generate(&self, step: i64) -> Result<OtpCode> {
        let key = base32::decode(&self.secret)?;
        let digest = calc_digest(&key, step)?;

        Ok(OtpCode {
            code: encode_digest_truncated(&digest)?,
            digits: self.digits,
        })
    }

    /// Generates the code `step_offset` steps away from the current one
    pub fn generate_with_offset(&self, clock: &dyn Clock, step_offset: i64) -> Result<OtpCode> {
        self.generate(challenge(clock) + step_offset)
    }

    /// Codes for the previous, current and next step, in that order
    pub fn window(&self, clock: &dyn Clock) -> Result<[OtpCode; 3]> {
        let now = challenge(clock);
        let key = base32::decode(&self.secret)?;

        let mut codes = [OtpCode::default(); 3];
        for (slot, offset) in codes.iter_mut().zip(WINDOW) {
            *slot = OtpCode {
                code: encode_digest_truncated(&calc_digest(&key, now + offset)?)?,
                digits: self.digits,
            };
        }

        Ok(codes)
    }

    /// Checks a candidate against the three window codes.
    ///
    /// The comparison is not constant-time, this is a local convenience check
    /// and must not be reused as a remote verifier as is.
    pub fn validate(&self, clock: &dyn Clock, candidate: &str) -> bool {
        match self.window(clock) {
            Ok(codes) => codes.iter().any(|code| code.to_string() == candidate),
            Err(_) => false,
        }
    }
}

/// Codes for the current window, see [`Totp::window`]
pub fn codes_for_current_window(
    clock: &dyn Clock,
    secret: &str,
    digits: u32,
) -> Result<[String; 3]> {
    let codes = Totp::new(secret).with_digits(digits).window(clock)?;

    Ok(codes.map(|code| code.to_string()))
}

/// HMAC-SHA1 of the step, encoded as an 8-byte big-endian counter
fn calc_digest(key: &[u8], step: i64) -> Result<Vec<u8>> {
    let mut mac = <HmacSha1 as Mac>::new_from_slice(key)
        .map_err(|e| Error::InvalidInput(format!("unusable HMAC key: {e}")))?;
    mac.update(&step.to_be_bytes());

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Dynamic truncation of an HMAC digest
fn encode_digest_truncated(digest: &[u8]) -> Result<u32> {
    // The last byte tells us the offset
    let offset = match digest.last() {
        Some(x) => (*x & 0xf) as usize,
        None => return Err(Error::Protocol("empty HMAC digest".into())),
    };

    let code_bytes: [u8; 4] = digest
        .get(offset..offset + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| Error::Protocol(format!("HMAC digest too short: {}", digest.len())))?;

    Ok((u32::from_be_bytes(code_bytes) & 0x7fff_ffff) % PIN_MODULO)
}
