use account_store::auth::{AccountError, AccountStore};
use account_store::config::{self, Config};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// `check`: the password did not match.
const EXIT_MISMATCH: u8 = 1;

/// Any error: unknown account, duplicate username, bad config, storage failure.
const EXIT_ERROR: u8 = 2;

/// Manage salted-password user accounts.
#[derive(Parser, Debug)]
#[command(name = "account-store", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding `database.path`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and schema if missing.
    Init,
    /// Register a new account.
    Create {
        username: String,
        /// Read the password from the first line of stdin.
        #[arg(long)]
        password_stdin: bool,
    },
    /// Verify a password. Exits 1 when it does not match, 2 on errors.
    Check {
        username: String,
        #[arg(long)]
        password_stdin: bool,
    },
    /// Set a new password.
    Passwd {
        username: String,
        #[arg(long)]
        password_stdin: bool,
    },
    /// Delete an account.
    Delete { username: String },
    /// Print the id of an account.
    Id { username: String },
    /// Print the number of accounts.
    Count,
    /// Print the JSON Schema of the config file.
    ConfigSchema,
}

/// Where passwords come from.
trait PasswordSource {
    /// `confirm` asks for the password twice when prompting interactively.
    fn read_password(&mut self, from_stdin: bool, confirm: bool) -> Result<String>;
}

/// Hidden terminal prompt, or the first line of stdin.
struct Terminal;

impl PasswordSource for Terminal {
    fn read_password(&mut self, from_stdin: bool, confirm: bool) -> Result<String> {
        if from_stdin {
            return first_line(std::io::stdin().lock());
        }

        let mut prompt = dialoguer::Password::new().with_prompt("Password");
        if confirm {
            prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
        }
        prompt.interact().context("Failed to read password")
    }
}

fn first_line(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();
    match run(cli, &mut Terminal, &mut stdout) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: Cli, passwords: &mut dyn PasswordSource, out: &mut dyn Write) -> Result<u8> {
    let (mut config, ignored_keys) = Config::load_reporting_ignored(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database.path = db.display().to_string();
    }
    account_store::logging::init(&config.logging);
    config::warn_ignored_keys(&ignored_keys);

    match cli.command {
        Command::ConfigSchema => {
            writeln!(out, "{}", serde_json::to_string_pretty(&Config::json_schema())?)?;
        }
        Command::Init => {
            open_store(&config)?;
            writeln!(out, "{}", config.database.resolved_path().display())?;
        }
        Command::Create {
            username,
            password_stdin,
        } => {
            let password = passwords.read_password(password_stdin, true)?;
            let id = report(open_store(&config)?.create_account(&username, &password))?;
            writeln!(out, "{id}")?;
        }
        Command::Check {
            username,
            password_stdin,
        } => {
            let password = passwords.read_password(password_stdin, false)?;
            if !report(open_store(&config)?.check_password(&username, &password))? {
                writeln!(out, "invalid")?;
                return Ok(EXIT_MISMATCH);
            }
            writeln!(out, "ok")?;
        }
        Command::Passwd {
            username,
            password_stdin,
        } => {
            let password = passwords.read_password(password_stdin, true)?;
            report(open_store(&config)?.update_password(&username, &password))?;
        }
        Command::Delete { username } => report(open_store(&config)?.delete_account(&username))?,
        Command::Id { username } => {
            writeln!(out, "{}", report(open_store(&config)?.get_id_by_username(&username))?)?;
        }
        Command::Count => writeln!(out, "{}", report(open_store(&config)?.account_count())?)?,
    }

    Ok(0)
}

fn open_store(config: &Config) -> Result<AccountStore> {
    AccountStore::open(&config.database).with_context(|| {
        format!(
            "Failed to open account database: {}",
            config.database.resolved_path().display()
        )
    })
}

/// Operators may see which username an error refers to.
fn report<T>(result: Result<T, AccountError>) -> Result<T> {
    result.map_err(|e| match e.username() {
        Some(name) => anyhow::anyhow!("{e}: {name}"),
        None => anyhow::Error::new(e),
    })
}
