//! Garmin SSO login flow.
//!
//! The flow is cookie-coupled: prime the session on the embed page, scrape
//! the CSRF token from the sign-in form, post credentials, and either walk
//! away with a service ticket or get parked on the MFA page. The ticket is
//! then exchanged at the Connect token endpoint for a bearer token pair.
//! Callers own the MFA prompt; this module only reports that a code is
//! needed and resumes once one is supplied.

use chrono::Utc;
use regex::Regex;
use secrecy::ExposeSecret;

use crate::GarminError;
use crate::config::{Credentials, GarminUrls};
use crate::token_store::OAuth2Token;

const EMBED_PARAMS: &[(&str, &str)] = &[
    ("id", "gauth-widget"),
    ("embedWidget", "true"),
    ("gauthHost", "/sso/embed"),
];

/// Outcome of the first login leg.
#[derive(Debug)]
pub enum LoginOutcome {
    Success(OAuth2Token),
    MfaRequired(MfaContext),
}

/// State needed to finish a login once the user supplies their MFA code.
/// The HTTP session cookies carry the rest, so the same client instance must
/// be used for [`resume_login`].
#[derive(Clone, Debug)]
pub struct MfaContext {
    pub email: String,
    csrf: String,
}

/// First login leg: credentials in, ticket or MFA challenge out.
pub async fn login(
    http: &reqwest::Client,
    urls: &GarminUrls,
    credentials: &Credentials,
) -> Result<LoginOutcome, GarminError> {
    let embed_url = format!("{}/sso/embed", urls.sso_url);
    let signin_url = format!("{}/sso/signin", urls.sso_url);

    // Prime the session cookies.
    checked(http.get(&embed_url).query(EMBED_PARAMS).send().await?).await?;

    let form_page = checked(http.get(&signin_url).query(EMBED_PARAMS).send().await?)
        .await?
        .text()
        .await?;
    let csrf = extract_csrf(&form_page)
        .ok_or_else(|| GarminError::Auth("sign-in page carried no CSRF token".into()))?;

    let resp = checked(
        http.post(&signin_url)
            .query(EMBED_PARAMS)
            .form(&[
                ("username", credentials.email.as_str()),
                ("password", credentials.password.expose_secret()),
                ("embed", "true"),
                ("_csrf", csrf.as_str()),
            ])
            .send()
            .await?,
    )
    .await?;
    let body = resp.text().await?;

    match extract_title(&body).as_deref() {
        Some("Success") => {
            let ticket = extract_ticket(&body).ok_or_else(|| {
                GarminError::Auth("login succeeded but no service ticket was issued".into())
            })?;
            let token = exchange(http, urls, &ticket).await?;
            Ok(LoginOutcome::Success(token))
        }
        Some("MFA Required") => {
            let csrf = extract_csrf(&body).ok_or_else(|| {
                GarminError::Mfa("MFA page carried no CSRF token".into())
            })?;
            tracing::info!(email = %credentials.email, "mfa challenge issued");
            Ok(LoginOutcome::MfaRequired(MfaContext {
                email: credentials.email.clone(),
                csrf,
            }))
        }
        title => Err(GarminError::Auth(format!(
            "login rejected ({})",
            title.unwrap_or("no response title")
        ))),
    }
}

/// Second login leg: post the verification code and finish the exchange.
/// An invalid code leaves the context usable for another attempt.
pub async fn resume_login(
    http: &reqwest::Client,
    urls: &GarminUrls,
    ctx: &MfaContext,
    code: &str,
) -> Result<OAuth2Token, GarminError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(GarminError::Mfa("verification code is required".into()));
    }

    let mfa_url = format!("{}/sso/verifyMFA/loginEnterMfaCode", urls.sso_url);
    let resp = checked(
        http.post(&mfa_url)
            .query(EMBED_PARAMS)
            .form(&[
                ("mfa-code", code),
                ("embed", "true"),
                ("_csrf", ctx.csrf.as_str()),
                ("fromPage", "setupEnterMfaCode"),
            ])
            .send()
            .await?,
    )
    .await?;
    let body = resp.text().await?;

    if extract_title(&body).as_deref() != Some("Success") {
        return Err(GarminError::Mfa("invalid verification code".into()));
    }
    let ticket = extract_ticket(&body).ok_or_else(|| {
        GarminError::Mfa("verification succeeded but no service ticket was issued".into())
    })?;
    exchange(http, urls, &ticket).await
}

/// Trade the SSO service ticket for a bearer token pair.
async fn exchange(
    http: &reqwest::Client,
    urls: &GarminUrls,
    ticket: &str,
) -> Result<OAuth2Token, GarminError> {
    let url = format!("{}/oauth-service/oauth/exchange/user/2.0", urls.api_url);
    let resp = http
        .post(&url)
        .form(&[("ticket", ticket), ("client_id", "GARMIN_CONNECT_MOBILE")])
        .send()
        .await?;
    token_from_response(resp).await
}

/// Refresh the bearer token pair. The refresh token must still be valid;
/// an expired one means a full re-login.
pub async fn refresh(
    http: &reqwest::Client,
    urls: &GarminUrls,
    token: &OAuth2Token,
) -> Result<OAuth2Token, GarminError> {
    if token.refresh_expired() {
        return Err(GarminError::Auth(
            "refresh token expired; please re-authenticate".into(),
        ));
    }
    let url = format!("{}/oauth-service/oauth/exchange/user/2.0", urls.api_url);
    let resp = http
        .post(&url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", token.refresh_token.as_str()),
        ])
        .send()
        .await?;
    token_from_response(resp).await
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
    refresh_token_expires_in: i64,
    #[serde(default)]
    scope: String,
}

async fn token_from_response(resp: reqwest::Response) -> Result<OAuth2Token, GarminError> {
    let status = resp.status().as_u16();
    if !resp.status().is_success() {
        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(256).collect();
        return Err(match status {
            401 | 403 => GarminError::Auth(snippet),
            _ => GarminError::from_status(status, snippet),
        });
    }
    let payload: TokenResponse = resp.json().await?;
    let now = Utc::now().timestamp();
    Ok(OAuth2Token {
        access_token: payload.access_token,
        refresh_token: payload.refresh_token,
        token_type: payload.token_type.unwrap_or_else(|| "Bearer".into()),
        expires_at: now + payload.expires_in,
        refresh_token_expires_at: now + payload.refresh_token_expires_in,
        scope: payload.scope,
    })
}

async fn checked(resp: reqwest::Response) -> Result<reqwest::Response, GarminError> {
    let status = resp.status();
    if !status.is_success() {
        let code = status.as_u16();
        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(256).collect();
        return Err(GarminError::from_status(code, snippet));
    }
    Ok(resp)
}

fn extract_csrf(html: &str) -> Option<String> {
    static PATTERN: &str = r#"name="_csrf"\s+value="([^"]+)""#;
    Regex::new(PATTERN)
        .ok()?
        .captures(html)
        .map(|c| c[1].to_string())
}

fn extract_title(html: &str) -> Option<String> {
    Regex::new(r"<title>([^<]*)</title>")
        .ok()?
        .captures(html)
        .map(|c| c[1].trim().to_string())
}

fn extract_ticket(html: &str) -> Option<String> {
    Regex::new(r#"embed\?ticket=([^"]+)""#)
        .ok()?
        .captures(html)
        .map(|c| c[1].to_string())
}
