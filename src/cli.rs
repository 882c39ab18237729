//! Command line surface.
//!
//! A binary only has to provide the Authy transport:
//!
//! ```no_run
//! # fn transport() -> Box<dyn authy_otp::service::AuthyService> { unimplemented!() }
//! fn main() -> std::process::ExitCode {
//!     authy_otp::cli::main_with(transport().as_ref())
//! }
//! ```

use std::{io::Write, path::PathBuf, process::ExitCode};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::{error, Level};

use crate::{
    clock::SystemClock,
    config::Config,
    device::{self, Context, Device, Session, TerminalPrompt},
    output::{self, AlfredItems},
    registration::Registration,
    search::Searcher,
    service::AuthyService,
    store::FileStore,
};

/// Authy TOTP codes without the phone
#[derive(Debug, Parser)]
#[command(name = "authy", version)]
pub struct Cli {
    /// Directory holding the registration and the token cache [default: home directory]
    #[arg(long, global = true, env = "AUTHY_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Print results as Alfred workflow JSON
    #[arg(long, global = true)]
    pub alfred: bool,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register a device, or show the registered account
    Account {
        /// Phone number country code (e.g. 1 for United States), digits only
        #[arg(short = 'c', long = "countrycode")]
        country_code: Option<String>,

        /// Phone number, digits only
        #[arg(short = 'm', long = "mobilenumber")]
        mobile: Option<String>,

        /// Authy main (backup) password
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Delete the saved backup password
    Delpwd,

    /// Rebuild the local token cache from Authy
    Refresh,

    /// Fuzzy search your OTP tokens (case-insensitive)
    Fuzz {
        /// Search keyword, every token is listed when empty
        keyword: Option<String>,
    },
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    // stdout carries the codes, logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

impl Cli {
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config_dir {
            Some(dir) => Config::new(dir),
            None => Config::from_home()?,
        };
        config.with_alfred(self.alfred);

        if let Command::Account {
            country_code,
            mobile,
            password,
        } = &self.command
        {
            config
                .with_phone(country_code.clone(), mobile.clone())
                .with_password(password.clone());
        }

        Ok(config)
    }
}

/// Parses the arguments and runs the command against the real terminal,
/// clock and home directory files.
pub fn main_with(service: &dyn AuthyService) -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = cli.config().and_then(|config| {
        let store = FileStore::new(&config.dir);
        let ctx = Context {
            service,
            store: &store,
            prompt: &TerminalPrompt,
            clock: &SystemClock,
        };

        run(&cli.command, &config, ctx, &mut std::io::stdout())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

pub fn run(command: &Command, config: &Config, ctx: Context<'_>, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Account { .. } => account(config, ctx, out),
        Command::Delpwd => {
            device::clear_password(config, ctx.store).context("Load device info failed")?;
            writeln!(out, "Backup password deleted successfully!")?;
            Ok(())
        }
        Command::Refresh => {
            let Some(mut device) = ready_device(config, ctx, out)? else {
                return Ok(());
            };

            let report = device.refresh_tokens_from_server()?;
            writeln!(out, "Cached {} token(s)", report.cached)?;
            if !report.skipped.is_empty() {
                writeln!(
                    out,
                    "Could not decrypt: {}, check your backup password",
                    report.skipped.join(", ")
                )?;
            }
            Ok(())
        }
        Command::Fuzz { keyword } => {
            let Some(mut device) = ready_device(config, ctx, out)? else {
                return Ok(());
            };

            let keyword = match keyword {
                Some(keyword) => keyword.clone(),
                None if config.alfred => String::new(),
                None => device.prompt().keyword()?,
            };

            let outputs = Searcher::new(&mut device).search(&keyword)?;
            if config.alfred {
                writeln!(out, "{}", AlfredItems::from_outputs(&outputs).to_json()?)?;
            } else {
                write!(out, "{}", output::pretty(&outputs))?;
            }
            Ok(())
        }
    }
}

fn account(config: &Config, ctx: Context<'_>, out: &mut dyn Write) -> Result<()> {
    match Device::load_or_register(config, ctx).context("Load/Register device info failed")? {
        Session::Registered(registration) => registered(&registration, out),
        Session::Ready(mut device) => {
            if let Some(password) = &config.password {
                device.set_main_password(password)?;
            }

            let registration = device.registration();
            writeln!(out, "User ID: {}", registration.user_id)?;
            writeln!(out, "Device ID: {}", registration.device_id)?;
            writeln!(
                out,
                "Backup password saved: {}",
                !registration.main_password.is_empty()
            )?;
            Ok(())
        }
    }
}

/// Loads the device; a fresh registration ends the command.
fn ready_device<'a>(
    config: &'a Config,
    ctx: Context<'a>,
    out: &mut dyn Write,
) -> Result<Option<Device<'a>>> {
    match Device::load_or_register(config, ctx).context("Load/Register device info failed")? {
        Session::Ready(device) => Ok(Some(device)),
        Session::Registered(registration) => {
            registered(&registration, out)?;
            Ok(None)
        }
    }
}

fn registered(registration: &Registration, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Register device successfully!!!")?;
    writeln!(out, "Your device id: {}", registration.device_id)?;
    Ok(())
}
