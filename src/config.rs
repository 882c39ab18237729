use std::{fmt, path::PathBuf};

use directories::BaseDirs;

use crate::{registration::RetryPolicy, Error, Result};

pub const REGISTRATION_FILE: &str = ".authy.json";
pub const CACHE_FILE: &str = ".authycache.json";

/// Settings threaded through the device session and the searcher.
#[derive(Clone)]
pub struct Config {
    /// Directory holding the registration and the token cache
    pub dir: PathBuf,
    pub registration_file: String,
    pub cache_file: String,
    /// Pre-supplied answers, prompted for when absent
    pub country_code: Option<String>,
    pub mobile: Option<String>,
    pub password: Option<String>,
    /// Machine-readable output for the Alfred launcher
    pub alfred: bool,
    pub poll: RetryPolicy,
}

impl Config {
    /// Creates a config storing its files in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            registration_file: REGISTRATION_FILE.to_string(),
            cache_file: CACHE_FILE.to_string(),
            country_code: None,
            mobile: None,
            password: None,
            alfred: false,
            poll: RetryPolicy::default(),
        }
    }

    /// Creates a config storing its files in the user's home directory.
    pub fn from_home() -> Result<Self> {
        let dirs = BaseDirs::new().ok_or_else(|| {
            Error::NotFound("home directory".to_string())
        })?;

        Ok(Self::new(dirs.home_dir()))
    }

    pub fn with_phone(&mut self, country_code: Option<String>, mobile: Option<String>) -> &mut Self {
        self.country_code = country_code;
        self.mobile = mobile;

        self
    }

    pub fn with_password(&mut self, password: Option<String>) -> &mut Self {
        self.password = password;

        self
    }

    pub fn with_alfred(&mut self, alfred: bool) -> &mut Self {
        self.alfred = alfred;

        self
    }

    pub fn with_poll(&mut self, poll: RetryPolicy) -> &mut Self {
        self.poll = poll;

        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("dir", &self.dir)
            .field("registration_file", &self.registration_file)
            .field("cache_file", &self.cache_file)
            .field("country_code", &self.country_code)
            .field("mobile", &self.mobile)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("alfred", &self.alfred)
            .field("poll", &self.poll)
            .finish()
    }
}
