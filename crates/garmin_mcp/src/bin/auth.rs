//! `garmin-mcp-auth`: authenticate against Garmin Connect and persist tokens
//! for the MCP server to pick up.

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use secrecy::SecretString;

use garmin_client::GarminClient;
use garmin_client::config::{Credentials, GarminUrls, TokenPaths, expand_tilde};
use garmin_client::http_client::ReqwestGarminClient;
use garmin_client::sso::LoginOutcome;
use garmin_client::token_store::TokenStore;

#[derive(Parser)]
#[command(
    name = "garmin-mcp-auth",
    about = "Authenticate with Garmin Connect and persist OAuth tokens"
)]
struct Cli {
    /// Verify stored tokens instead of authenticating
    #[arg(long)]
    verify: bool,

    /// Re-authenticate even when stored tokens look valid
    #[arg(long)]
    force_reauth: bool,

    /// Remove stored tokens and exit
    #[arg(long)]
    remove: bool,

    /// Token directory (defaults to $GARMINTOKENS or ~/.garminconnect)
    #[arg(long)]
    token_path: Option<String>,

    /// Base64 token file (defaults to $GARMINTOKENS_BASE64 or ~/.garminconnect_base64)
    #[arg(long)]
    token_base64_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut paths = TokenPaths::from_env();
    if let Some(dir) = &cli.token_path {
        paths.token_dir = expand_tilde(dir);
    }
    if let Some(file) = &cli.token_base64_path {
        paths.base64_file = expand_tilde(file);
    }
    let store = TokenStore::new(paths);

    if cli.remove {
        let removed = store.remove()?;
        if removed {
            println!("Removed stored tokens.");
        } else {
            println!("No stored tokens to remove.");
        }
        return Ok(());
    }

    if cli.verify {
        let ok = verify_tokens(&store).await;
        std::process::exit(if ok { 0 } else { 1 });
    }

    let ok = authenticate(&store, cli.force_reauth).await;
    std::process::exit(if ok { 0 } else { 1 });
}

/// Check stored tokens: parseable, refresh still valid, and accepted by the
/// API (a profile fetch doubles as the live check).
async fn verify_tokens(store: &TokenStore) -> bool {
    let info = store.info();
    println!("Token directory: {}", info.token_dir);
    println!("Base64 file:     {}", info.base64_file);
    if !info.exists {
        eprintln!("No stored tokens found.");
        return false;
    }
    if !info.valid {
        eprintln!("Stored tokens are invalid: {}", info.error);
        return false;
    }

    let client = match ReqwestGarminClient::restore(GarminUrls::from_env(), store.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Stored tokens are invalid: {e}");
            return false;
        }
    };
    match client.get_full_name().await {
        Ok(name) => {
            println!("Tokens are valid (logged in as {name}).");
            true
        }
        Err(e) => {
            eprintln!("Token check against the API failed: {e}");
            false
        }
    }
}

async fn authenticate(store: &TokenStore, force_reauth: bool) -> bool {
    if store.exists() && !force_reauth {
        if verify_tokens(store).await {
            println!("Existing tokens are valid; nothing to do (use --force-reauth to replace).");
            return true;
        }
        eprintln!("Existing tokens are unusable; re-authenticating.");
    }

    let credentials = match resolve_credentials() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Credential error: {e}");
            return false;
        }
    };

    let client = ReqwestGarminClient::with_store(GarminUrls::from_env(), store.clone());
    match client.login(&credentials).await {
        Ok(LoginOutcome::Success(_)) => {}
        Ok(LoginOutcome::MfaRequired(ctx)) => {
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                let code = match prompt_line("MFA one-time code: ") {
                    Ok(code) => code,
                    Err(e) => {
                        eprintln!("Failed to read code: {e}");
                        return false;
                    }
                };
                match client.resume_login(&ctx, &code).await {
                    Ok(()) => break,
                    Err(e) if attempt < 3 => eprintln!("Verification failed: {e}"),
                    Err(e) => {
                        eprintln!("Verification failed: {e}");
                        return false;
                    }
                }
            }
        }
        Err(e) => {
            eprintln!("Authentication failed: {e}");
            return false;
        }
    }

    match client.get_full_name().await {
        Ok(name) => println!("Authenticated as {name}."),
        Err(e) => eprintln!("Authenticated, but the profile check failed: {e}"),
    }
    println!("Tokens written to {}", store.paths().token_dir.display());
    println!("Base64 copy at   {}", store.paths().base64_file.display());
    true
}

/// Credentials from the environment, falling back to an interactive prompt.
fn resolve_credentials() -> Result<Credentials, garmin_client::GarminError> {
    if let Some(creds) = Credentials::try_from_env_with(|k| std::env::var(k).ok())? {
        return Ok(creds);
    }

    let email = prompt_line("Garmin Connect email: ")
        .map_err(|e| garmin_client::GarminError::Config(e.to_string()))?;
    if email.is_empty() {
        return Err(garmin_client::GarminError::Config("email is required".into()));
    }
    let password = prompt_line("Password: ")
        .map_err(|e| garmin_client::GarminError::Config(e.to_string()))?;
    if password.is_empty() {
        return Err(garmin_client::GarminError::Config(
            "password is required".into(),
        ));
    }
    Ok(Credentials {
        email,
        password: SecretString::new(password.into()),
    })
}

fn prompt_line(prompt: &str) -> std::io::Result<String> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
