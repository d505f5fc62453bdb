//! PrepDeck session dev tool
//!
//! Drives the session SDK against a real identity provider from a
//! terminal, sharing the credential slot a consumer application would use.
//!
//! Configuration comes from `PREPDECK_*` environment variables
//! (`PREPDECK_PROVIDER_ENDPOINT` and `PREPDECK_CLIENT_ID` are required).

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use pd_common::logging::init_logging;
use pd_session::{FileCredentialStore, SessionConfig, SessionManager};

#[derive(Parser)]
#[command(name = "pd-dev", about = "PrepDeck session dev tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and persist the session
    Login {
        email: String,
        #[arg(long, env = "PREPDECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the current session state
    Status,
    /// Tear down the persisted session
    Logout,
    /// Register a new account
    Register {
        email: String,
        #[arg(long, env = "PREPDECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Confirm a registration with the emailed code
    Confirm { email: String, code: String },
    /// Resend the confirmation code
    Resend { email: String },
    /// Start a password reset
    ForgotPassword { email: String },
    /// Complete a password reset with the emailed code
    ResetPassword {
        email: String,
        code: String,
        #[arg(long, env = "PREPDECK_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging("pd-dev");

    let cli = Cli::parse();

    let config = SessionConfig::from_env()?;
    let store = Arc::new(FileCredentialStore::new(config.credentials_path.clone()));
    let session = SessionManager::new(config, store)?;

    match cli.command {
        Command::Login { email, password } => {
            let principal = session.sign_in(&email, &password).await?;
            println!("signed in as {}", principal.email);
            if !principal.roles.is_empty() {
                println!("roles: {}", principal.roles.join(", "));
            }
        }
        Command::Status => {
            if session.is_authenticated().await {
                if let Some(principal) = session.current_principal().await {
                    println!("signed in as {}", principal.email);
                }
                match session.authorization_header().await {
                    Some(header) => println!("authorization: {header}"),
                    None => println!("session could not be refreshed; sign in again"),
                }
            } else {
                println!("not signed in");
            }
        }
        Command::Logout => {
            session.sign_out().await;
            println!("signed out");
        }
        Command::Register { email, password } => {
            session.register(&email, &password).await?;
            println!("registered; check {email} for a confirmation code");
        }
        Command::Confirm { email, code } => {
            session.confirm_registration(&email, &code).await?;
            println!("account confirmed; sign in to continue");
        }
        Command::Resend { email } => {
            session.resend_confirmation_code(&email).await?;
            println!("confirmation code resent to {email}");
        }
        Command::ForgotPassword { email } => {
            session.request_password_reset(&email).await?;
            println!("password reset code sent to {email}");
        }
        Command::ResetPassword { email, code, new_password } => {
            session.confirm_password_reset(&email, &code, &new_password).await?;
            println!("password updated; sign in with the new password");
        }
    }

    info!("done");
    Ok(())
}
