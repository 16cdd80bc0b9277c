use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use phish_guard_core::{
    render_history, render_verdict, ApiClient, Authenticator, ClientSettings, OutputFormat,
    Registration, ScanError, ScanSession, SessionState, TokenStore,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "phish-guard",
    author,
    version,
    about = "Phishing URL inspection client"
)]
struct Cli {
    /// Config file (TOML, YAML or JSON) providing base_url, timeout_secs, token_file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Service origin, e.g. https://scan.example.com
    #[arg(long = "base-url", value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Where the access token is kept between runs
    #[arg(long = "token-file", value_name = "PATH", global = true)]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit one or more URLs for analysis
    Scan {
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
        #[arg(long, value_enum, default_value_t = Format::Human)]
        format: Format,
        /// Print the scan history after the verdicts
        #[arg(long)]
        history: bool,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PHISH_GUARD_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long = "full-name")]
        full_name: Option<String>,
    },
    /// Log in and store the access token
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PHISH_GUARD_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and forget the stored token
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Confirm an email address with the token from the verification mail
    VerifyEmail { token: String },
    /// Ask for a new verification mail
    ResendVerification,
    /// Exchange the session for a fresh access token
    RefreshToken,
    /// Change the password of the logged-in user
    ChangePassword {
        #[arg(long = "old-password")]
        old_password: String,
        #[arg(long = "new-password")]
        new_password: String,
    },
    /// Request a password reset mail
    ForgotPassword { email: String },
    /// Set a new password with the token from the reset mail
    ResetPassword {
        token: String,
        #[arg(long = "new-password")]
        new_password: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Human,
    Json,
    Yaml,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Human => OutputFormat::Human,
            Format::Json => OutputFormat::Json,
            Format::Yaml => OutputFormat::Yaml,
        }
    }
}

/// Settings merged from defaults, config file, `PHISH_GUARD_*` variables and flags.
#[derive(Debug)]
struct CliConfig {
    client: ClientSettings,
    token_file: Option<PathBuf>,
}

/// Keys the CLI reads on top of [`ClientSettings`].
#[derive(Debug, Deserialize)]
struct LocalKeys {
    #[serde(default)]
    token_file: Option<PathBuf>,
}

impl CliConfig {
    fn token_file(&self) -> PathBuf {
        self.token_file.clone().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join(".phish-guard")
                .join("token")
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let store = TokenStore::new(config.token_file());
    let session = SessionState::new();
    if let Some(token) = store.load().await? {
        session.set_token(token);
    }
    let client = Arc::new(ApiClient::new(&config.client, session.clone())?);
    let auth = Authenticator::new(client);

    let initial_token = session.token();
    let outcome = run(cli.command, &auth).await;
    let current_token = session.token();
    if current_token != initial_token {
        match current_token {
            Some(token) => store.save(&token).await?,
            None => store.clear().await?,
        }
        debug!(path = %store.path().display(), "stored token updated");
    }
    outcome
}

fn load_config(cli: &Cli) -> Result<CliConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = &cli.config {
        builder = builder.add_source(config::File::from(path.as_path()).required(true));
    }
    builder = builder
        .add_source(config::Environment::with_prefix("PHISH_GUARD").ignore_empty(true));
    if let Some(base_url) = &cli.base_url {
        builder = builder.set_override("base_url", base_url.clone())?;
    }
    if let Some(token_file) = &cli.token_file {
        builder = builder.set_override("token_file", token_file.display().to_string())?;
    }
    let config = builder.build().with_context(|| match &cli.config {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration".to_string(),
    })?;
    let client = config
        .clone()
        .try_deserialize::<ClientSettings>()
        .context("invalid configuration")?
        .normalize();
    let local = config
        .try_deserialize::<LocalKeys>()
        .context("invalid configuration")?;
    Ok(CliConfig {
        client,
        token_file: local.token_file,
    })
}

async fn run(command: Commands, auth: &Authenticator) -> Result<()> {
    let client = auth.client();
    match command {
        Commands::Scan {
            urls,
            format,
            history,
        } => scan(auth, &urls, format.into(), history).await?,
        Commands::Register {
            username,
            email,
            password,
            full_name,
        } => {
            let payload = client
                .register(&Registration {
                    username,
                    email,
                    password,
                    full_name,
                })
                .await?;
            print_payload(&payload)?;
        }
        Commands::Login {
            username,
            email,
            password,
        } => {
            auth.login(&username, &email, &password).await?;
            println!("Logged in as {username}");
        }
        Commands::Logout => {
            auth.logout().await?;
            println!("Logged out");
        }
        Commands::Whoami => print_payload(&auth.current_user().await?)?,
        Commands::VerifyEmail { token } => {
            print_payload(&auth.observe(client.verify_email(&token).await)?)?
        }
        Commands::ResendVerification => {
            print_payload(&auth.observe(client.resend_email_verification().await)?)?
        }
        Commands::RefreshToken => {
            auth.refresh().await?;
            println!("Access token refreshed");
        }
        Commands::ChangePassword {
            old_password,
            new_password,
        } => print_payload(
            &auth.observe(client.change_password(&old_password, &new_password).await)?,
        )?,
        Commands::ForgotPassword { email } => {
            print_payload(&client.forgot_password(&email).await?)?
        }
        Commands::ResetPassword {
            token,
            new_password,
        } => print_payload(&client.reset_password(&token, &new_password).await?)?,
    }
    Ok(())
}

async fn scan(
    auth: &Authenticator,
    urls: &[String],
    format: OutputFormat,
    show_history: bool,
) -> Result<()> {
    let session = ScanSession::new(Arc::clone(auth.client()));
    let mut failures = 0usize;
    for url in urls {
        match session.submit_scan(url).await {
            Ok(verdict) => print!("{}", with_newline(render_verdict(&verdict, format)?)),
            Err(err) => {
                if let ScanError::Api(api_err) = &err {
                    auth.handle_rejection(api_err);
                }
                warn!(url = %url, error = %err, "scan failed");
                eprintln!("{}: {err}", display_input(url));
                failures += 1;
            }
        }
    }
    if show_history {
        print!("{}", with_newline(render_history(&session.history(), format)?));
    }
    if failures > 0 {
        bail!("{failures} of {} scan(s) failed", urls.len());
    }
    Ok(())
}

fn print_payload(payload: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

fn with_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn display_input(url: &str) -> String {
    if url.trim().is_empty() {
        "<blank>".to_string()
    } else {
        url.to_string()
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
