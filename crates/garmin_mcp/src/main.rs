use std::io::Write;
use std::sync::Arc;

use garmin_client::config::{Credentials, GarminUrls, TokenPaths};
use garmin_client::http_client::ReqwestGarminClient;
use garmin_client::sso::LoginOutcome;
use garmin_client::token_store::TokenStore;
use garmin_mcp::GarminMcpHandler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configure logging from env var `GARMIN_MCP_LOG_LEVEL` (or fallback to `RUST_LOG`, default `info`).
    let log_env = std::env::var("GARMIN_MCP_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    // Append per-target overrides to keep rmcp internals quiet by default
    let combined_filter = format!("{},rmcp=warn,serve_inner=warn", log_env);
    let env_filter = tracing_subscriber::EnvFilter::try_new(combined_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,rmcp=warn,serve_inner=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::info!("garmin_mcp: log filter: {}", log_env);

    let urls = GarminUrls::from_env();
    let store = TokenStore::new(TokenPaths::from_env());
    let client = connect(urls, store).await?;

    let handler = GarminMcpHandler::new(Arc::new(client));
    tracing::info!(
        "garmin_mcp: registered {} tools and {} prompts",
        handler.tool_count(),
        handler.prompt_count()
    );

    // Start RMCP server over stdio transport so it's immediately usable with MCP clients
    tracing::info!("garmin_mcp: starting stdio MCP server...");

    use rmcp::serve_server;
    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let server = serve_server(handler, transport).await?;

    tracing::info!("garmin_mcp: service initialized as server");

    server.waiting().await?;

    Ok(())
}

/// Establish the Garmin session: stored tokens when usable, otherwise a
/// credential login with an interactive MFA prompt on stderr/stdin.
async fn connect(
    urls: GarminUrls,
    store: TokenStore,
) -> Result<ReqwestGarminClient, Box<dyn std::error::Error>> {
    if store.exists() {
        match ReqwestGarminClient::restore(urls.clone(), store.clone()) {
            Ok(client) => {
                tracing::info!("garmin_mcp: restored session from stored tokens");
                return Ok(client);
            }
            Err(e) => {
                tracing::warn!("garmin_mcp: stored tokens unusable ({e}); logging in again");
            }
        }
    }

    let credentials = Credentials::from_env()?;
    let client = ReqwestGarminClient::with_store(urls, store);
    match client.login(&credentials).await? {
        LoginOutcome::Success(_) => {}
        LoginOutcome::MfaRequired(ctx) => {
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                let code = prompt_mfa()?;
                match client.resume_login(&ctx, &code).await {
                    Ok(()) => break,
                    Err(e) if attempt < 3 => eprintln!("Verification failed: {e}"),
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
    tracing::info!("garmin_mcp: logged in to Garmin Connect");
    Ok(client)
}

fn prompt_mfa() -> std::io::Result<String> {
    eprint!("MFA one-time code: ");
    std::io::stderr().flush()?;
    let mut code = String::new();
    std::io::stdin().read_line(&mut code)?;
    Ok(code.trim().to_string())
}
