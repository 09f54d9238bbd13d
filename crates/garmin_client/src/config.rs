use std::path::PathBuf;

use secrecy::SecretString;

use crate::GarminError;

/// Garmin Connect account credentials resolved from the environment.
///
/// Email and password each come from either a direct variable or a
/// file-pointer variable; setting both members of a pair is a configuration
/// error so that container secrets and plain env values cannot silently
/// shadow each other.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn from_env() -> Result<Self, GarminError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function, avoiding global environment mutation in tests.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, GarminError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let email = resolve_pair(&mut get, "GARMIN_EMAIL", "GARMIN_EMAIL_FILE")?
            .ok_or_else(|| GarminError::Config("GARMIN_EMAIL is required".into()))?;
        let password = resolve_pair(&mut get, "GARMIN_PASSWORD", "GARMIN_PASSWORD_FILE")?
            .ok_or_else(|| GarminError::Config("GARMIN_PASSWORD is required".into()))?;
        Ok(Self {
            email,
            password: SecretString::new(password.into()),
        })
    }

    /// Like [`from_env_with`](Credentials::from_env_with), but absent values
    /// yield `Ok(None)` instead of an error so callers can fall back to an
    /// interactive prompt.
    pub fn try_from_env_with<F>(mut get: F) -> Result<Option<Self>, GarminError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let email = resolve_pair(&mut get, "GARMIN_EMAIL", "GARMIN_EMAIL_FILE")?;
        let password = resolve_pair(&mut get, "GARMIN_PASSWORD", "GARMIN_PASSWORD_FILE")?;
        match (email, password) {
            (Some(email), Some(password)) => Ok(Some(Self {
                email,
                password: SecretString::new(password.into()),
            })),
            _ => Ok(None),
        }
    }
}

/// Resolve one env/file variable pair, enforcing mutual exclusivity.
fn resolve_pair<F>(get: &mut F, var: &str, file_var: &str) -> Result<Option<String>, GarminError>
where
    F: FnMut(&str) -> Option<String>,
{
    let direct = get(var).filter(|v| !v.is_empty());
    let file = get(file_var).filter(|v| !v.is_empty());
    match (direct, file) {
        (Some(_), Some(_)) => Err(GarminError::Config(format!(
            "must only provide one of {var} or {file_var}"
        ))),
        (Some(value), None) => Ok(Some(value)),
        (None, Some(path)) => {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                GarminError::Config(format!("reading {file_var} ({path}): {e}"))
            })?;
            Ok(Some(contents.trim().to_string()))
        }
        (None, None) => Ok(None),
    }
}

/// Where OAuth tokens are persisted: a token directory plus a base64-encoded
/// single-file copy. Both paths are opaque to everything but the token store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenPaths {
    pub token_dir: PathBuf,
    pub base64_file: PathBuf,
}

pub const DEFAULT_TOKEN_DIR: &str = "~/.garminconnect";
pub const DEFAULT_TOKEN_BASE64_FILE: &str = "~/.garminconnect_base64";

impl TokenPaths {
    pub fn from_env() -> Self {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    pub fn from_env_with<F>(mut get: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let token_dir = get("GARMINTOKENS").unwrap_or_else(|| DEFAULT_TOKEN_DIR.into());
        let base64_file =
            get("GARMINTOKENS_BASE64").unwrap_or_else(|| DEFAULT_TOKEN_BASE64_FILE.into());
        Self {
            token_dir: expand_tilde(&token_dir),
            base64_file: expand_tilde(&base64_file),
        }
    }

    pub fn new(token_dir: impl Into<PathBuf>, base64_file: impl Into<PathBuf>) -> Self {
        Self {
            token_dir: token_dir.into(),
            base64_file: base64_file.into(),
        }
    }
}

/// Expand a leading `~/` against the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Upstream endpoints. Overridable so tests can point at a local mock.
#[derive(Clone, Debug)]
pub struct GarminUrls {
    pub sso_url: String,
    pub api_url: String,
}

impl Default for GarminUrls {
    fn default() -> Self {
        Self {
            sso_url: "https://sso.garmin.com".into(),
            api_url: "https://connectapi.garmin.com".into(),
        }
    }
}

impl GarminUrls {
    pub fn from_env() -> Self {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    pub fn from_env_with<F>(mut get: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            sso_url: get("GARMIN_SSO_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.sso_url),
            api_url: get("GARMIN_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
        }
    }
}
