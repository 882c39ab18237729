//! The device session: registration credentials plus the decrypted tokens.

use std::io::{self, BufRead, Write};

use tracing::{info, warn};

use crate::{
    cache::TokenCache,
    clock::Clock,
    config::Config,
    registration::{Registrar, Registration},
    service::{AuthenticatorToken, AuthyService},
    store::{self, BlobStore},
    token::Token,
    Error, Result,
};

/// Period reported for Authy-managed app tokens
pub const AUTHY_APP_PERIOD: u32 = 10;

/// Interactive questions asked while setting up.
pub trait Prompt {
    fn country_code(&self) -> Result<String>;
    fn mobile(&self) -> Result<String>;
    /// The Authy backup password, read without echo
    fn password(&self) -> Result<String>;
    fn keyword(&self) -> Result<String>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn ask(question: &str) -> Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{question}")?;
        stdout.flush()?;

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer)? == 0 {
            return Err(Error::InvalidInput("no answer on stdin".into()));
        }

        Ok(answer.trim().to_string())
    }
}

impl Prompt for TerminalPrompt {
    fn country_code(&self) -> Result<String> {
        Self::ask("\nWhat is your phone number's country code? (digits only, e.g. 86): ")
    }

    fn mobile(&self) -> Result<String> {
        Self::ask("\nWhat is your phone number? (digits only): ")
    }

    fn password(&self) -> Result<String> {
        Ok(rpassword::prompt_password("\nPlease input Authy main password: ")?)
    }

    fn keyword(&self) -> Result<String> {
        Self::ask("Please input search keyword: ")
    }
}

/// Collaborators of a session, all borrowed for the process lifetime.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub service: &'a dyn AuthyService,
    pub store: &'a dyn BlobStore,
    pub prompt: &'a dyn Prompt,
    pub clock: &'a dyn Clock,
}

/// Outcome of [`Device::load_or_register`].
pub enum Session<'a> {
    /// An existing registration was loaded
    Ready(Device<'a>),
    /// A new device was just registered and saved
    Registered(Registration),
}

/// What a refresh fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub cached: usize,
    /// Names of the tokens that could not be decrypted
    pub skipped: Vec<String>,
}

pub struct Device<'a> {
    config: &'a Config,
    ctx: Context<'a>,
    registration: Registration,
    cache: TokenCache,
}

/// Reads the saved registration.
///
/// `None` when there is none, or when it is missing its ids or seed.
pub fn load_registration(config: &Config, store: &dyn BlobStore) -> Result<Option<Registration>> {
    let registration: Option<Registration> = store::load_json(store, &config.registration_file)?;

    Ok(registration.filter(|registration| {
        if !registration.is_complete() {
            warn!(
                file = %config.registration_file,
                "Incomplete device registration, registering again"
            );
        }
        registration.is_complete()
    }))
}

/// Blanks the saved backup password.
pub fn clear_password(config: &Config, store: &dyn BlobStore) -> Result<()> {
    let mut registration = load_registration(config, store)?
        .ok_or_else(|| Error::NotFound(config.registration_file.clone()))?;

    registration.main_password.clear();
    store::save_json(store, &config.registration_file, &registration)?;

    info!("Backup password deleted");
    Ok(())
}

impl<'a> Device<'a> {
    /// Loads the saved registration, or registers a new device when there is
    /// none. A registration file that cannot be read or parsed is an error,
    /// never a reason to register again.
    pub fn load_or_register(config: &'a Config, ctx: Context<'a>) -> Result<Session<'a>> {
        if let Some(registration) = load_registration(config, ctx.store)? {
            info!(device_id = registration.device_id, "Device info found");
            return Ok(Session::Ready(Self::new(config, ctx, registration)));
        }

        let registration = Self::register(config, ctx)?;
        Ok(Session::Registered(registration))
    }

    pub fn new(config: &'a Config, ctx: Context<'a>, registration: Registration) -> Self {
        Self {
            config,
            ctx,
            registration,
            cache: TokenCache::default(),
        }
    }

    fn register(config: &Config, ctx: Context<'_>) -> Result<Registration> {
        let country_code = match &config.country_code {
            Some(code) => code.clone(),
            None => ctx.prompt.country_code()?,
        };
        let country_code: u32 = country_code.trim().parse().map_err(|_| {
            Error::InvalidInput(format!(
                "country code must be digits only, e.g. 86, got {country_code:?}"
            ))
        })?;

        let mobile = match &config.mobile {
            Some(mobile) => mobile.clone(),
            None => ctx.prompt.mobile()?,
        };
        let mobile = mobile.trim();
        if mobile.is_empty() {
            return Err(Error::InvalidInput(
                "Please provide a phone number, e.g. 1232211".into(),
            ));
        }

        let mut registration = Registrar::new(ctx.service, ctx.clock)
            .with_policy(config.poll)
            .register(country_code, mobile)?;
        if let Some(password) = &config.password {
            registration.main_password = password.clone();
        }

        store::save_json(ctx.store, &config.registration_file, &registration)?;
        Ok(registration)
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn clock(&self) -> &'a dyn Clock {
        self.ctx.clock
    }

    pub fn prompt(&self) -> &'a dyn Prompt {
        self.ctx.prompt
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut TokenCache {
        &mut self.cache
    }

    pub fn save_registration(&self) -> Result<()> {
        store::save_json(
            self.ctx.store,
            &self.config.registration_file,
            &self.registration,
        )
    }

    pub fn set_main_password(&mut self, password: &str) -> Result<()> {
        self.registration.main_password = password.trim().to_string();
        self.save_registration()
    }

    pub fn save_cache(&self) -> Result<()> {
        self.cache.save(self.ctx.store, &self.config.cache_file)
    }

    /// Loads the cached tokens, fetching them from Authy when there is no
    /// cache yet.
    pub fn load_tokens_from_cache(&mut self) -> Result<()> {
        match TokenCache::load(self.ctx.store, &self.config.cache_file)? {
            Some(cache) => self.cache = cache,
            None => {
                info!("No token cache, fetching tokens from Authy");
                self.refresh_tokens_from_server()?;
            }
        }

        Ok(())
    }

    /// Rebuilds the cache from the Authy servers.
    ///
    /// Tokens that fail to decrypt are skipped and reported, an app whose
    /// secret cannot be derived fails the whole refresh.
    pub fn refresh_tokens_from_server(&mut self) -> Result<RefreshReport> {
        self.load_saved_weights()?;

        let service = self.ctx.service;
        let credentials = self.registration.credentials();

        let apps = service.list_authenticator_apps(credentials)?;
        if !apps.success {
            return Err(Error::Protocol("Fetch authenticator apps failed".into()));
        }

        let tokens = service.list_authenticator_tokens(credentials)?;
        if !tokens.success {
            return Err(Error::Protocol("Fetch authenticator tokens failed".into()));
        }

        let (mut fetched, skipped) = if tokens.tokens.is_empty() {
            (vec![], vec![])
        } else {
            let (password, prompted) = self.main_password()?;
            let (fetched, skipped) = decrypt_tokens(service, &tokens.tokens, &password);
            if prompted {
                if fetched.is_empty() {
                    warn!("No token could be decrypted, the main password was not saved");
                } else {
                    self.set_main_password(&password)?;
                }
            }
            (fetched, skipped)
        };

        for app in &apps.apps {
            let secret = service.app_secret(app)?;
            fetched.push(Token {
                name: app.name.clone(),
                original_name: String::new(),
                digits: app.digits,
                secret,
                period: AUTHY_APP_PERIOD,
                weight: 0,
            });
        }

        self.cache.replace(fetched);
        self.save_cache()?;

        Ok(RefreshReport {
            cached: self.cache.len(),
            skipped,
        })
    }

    /// Seeds an empty in-memory cache from disk so a rebuild keeps the
    /// usage weights. A corrupt cache file is about to be overwritten.
    fn load_saved_weights(&mut self) -> Result<()> {
        if !self.cache.is_empty() {
            return Ok(());
        }

        match TokenCache::load(self.ctx.store, &self.config.cache_file) {
            Ok(Some(saved)) => self.cache = saved,
            Ok(None) => {}
            Err(err @ Error::Corrupt { .. }) => warn!("Discarding token cache: {err}"),
            Err(err) => return Err(err),
        }

        Ok(())
    }

    /// The backup password, and whether it was just asked for.
    ///
    /// A new password is not saved here: the caller keeps it once a token
    /// decrypts with it.
    fn main_password(&self) -> Result<(String, bool)> {
        if !self.registration.main_password.is_empty() {
            return Ok((self.registration.main_password.clone(), false));
        }

        let password = match &self.config.password {
            Some(password) => password.clone(),
            None => self.ctx.prompt.password()?,
        };
        if password.trim().is_empty() {
            return Err(Error::InvalidInput("the main password is empty".into()));
        }

        Ok((password.trim().to_string(), true))
    }
}

/// Decrypts every token, returning the secrets and the names of the tokens
/// that failed.
fn decrypt_tokens(
    service: &dyn AuthyService,
    tokens: &[AuthenticatorToken],
    password: &str,
) -> (Vec<Token>, Vec<String>) {
    let mut decrypted = Vec::with_capacity(tokens.len());
    let mut skipped = vec![];

    for token in tokens {
        match service.decrypt_token(token, password) {
            Ok(secret) => decrypted.push(Token {
                name: token.name.clone(),
                original_name: token.original_name.clone(),
                digits: token.digits,
                secret,
                period: 0,
                weight: 0,
            }),
            Err(err) => {
                warn!("Decryption failed for [{}]: {err}", token.name);
                skipped.push(token.name.clone());
            }
        }
    }

    (decrypted, skipped)
}
