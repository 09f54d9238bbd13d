//! HTTP client implementation for the Garmin Connect API.
//!
//! This module provides a reqwest-based implementation of the
//! [`GarminClient`](crate::GarminClient) trait. Requests carry the bearer
//! token from the SSO exchange; the token is refreshed (and re-persisted)
//! when it is within the expiry skew, and rate-limited GETs are retried
//! with backoff.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use futures_util::StreamExt;
use reqwest::Method;
use serde_json::{Value, json};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::config::{Credentials, GarminUrls};
use crate::retry::RetryPolicy;
use crate::sso::{self, LoginOutcome, MfaContext};
use crate::token_store::{OAuth2Token, TokenStore};
use crate::{ActivityDownloadFormat, CustomFood, GarminClient, GarminError, SocialProfile};

/// Connect rejects requests from unknown agents.
const USER_AGENT: &str = "GCM-iOS-5.7.2.1";

/// Client for the Garmin Connect API using reqwest.
#[derive(Clone)]
pub struct ReqwestGarminClient {
    urls: GarminUrls,
    client: reqwest::Client,
    token: Arc<RwLock<Option<OAuth2Token>>>,
    store: Option<TokenStore>,
    profile: Arc<RwLock<Option<SocialProfile>>>,
    retry: Arc<RetryPolicy>,
}

impl ReqwestGarminClient {
    /// Create an unauthenticated client. Call [`login`](Self::login) (and
    /// [`resume_login`](Self::resume_login) when MFA is required) before
    /// issuing API requests.
    pub fn new(urls: GarminUrls) -> Self {
        Self::build(urls, None, None)
    }

    /// Create a client that persists tokens through `store` on login and on
    /// every refresh.
    pub fn with_store(urls: GarminUrls, store: TokenStore) -> Self {
        Self::build(urls, Some(store), None)
    }

    /// Resume a session from persisted tokens. Fails when no tokens exist or
    /// the refresh token has expired.
    pub fn restore(urls: GarminUrls, store: TokenStore) -> Result<Self, GarminError> {
        let token = store.load()?;
        if token.refresh_expired() {
            return Err(GarminError::Auth(
                "stored refresh token expired; please re-authenticate".into(),
            ));
        }
        Ok(Self::build(urls, Some(store), Some(token)))
    }

    fn build(urls: GarminUrls, store: Option<TokenStore>, token: Option<OAuth2Token>) -> Self {
        // The SSO flow is cookie-coupled, so the jar stays enabled for the
        // lifetime of the client.
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .expect("reqwest client build should not fail");
        Self {
            urls,
            client,
            token: Arc::new(RwLock::new(token)),
            store,
            profile: Arc::new(RwLock::new(None)),
            retry: Arc::new(RetryPolicy::default()),
        }
    }

    /// First login leg. On success the token is installed and persisted; on
    /// an MFA challenge the returned context must be passed to
    /// [`resume_login`](Self::resume_login) together with the user's code.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, GarminError> {
        let outcome = sso::login(&self.client, &self.urls, credentials).await?;
        if let LoginOutcome::Success(token) = &outcome {
            self.install_token(token.clone()).await?;
        }
        Ok(outcome)
    }

    /// Finish an MFA-gated login with the user's verification code.
    pub async fn resume_login(&self, ctx: &MfaContext, code: &str) -> Result<(), GarminError> {
        let token = sso::resume_login(&self.client, &self.urls, ctx, code).await?;
        self.install_token(token).await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// A copy of the current token, for callers that persist elsewhere.
    pub async fn current_token(&self) -> Option<OAuth2Token> {
        self.token.read().await.clone()
    }

    async fn install_token(&self, token: OAuth2Token) -> Result<(), GarminError> {
        if let Some(store) = &self.store {
            store.dump(&token)?;
        }
        *self.token.write().await = Some(token);
        Ok(())
    }

    /// A valid access token, refreshing (and re-persisting) when stale.
    async fn access_token(&self) -> Result<String, GarminError> {
        {
            let guard = self.token.read().await;
            match guard.as_ref() {
                None => {
                    return Err(GarminError::Auth(
                        "not authenticated; run the auth flow first".into(),
                    ));
                }
                Some(t) if !t.is_expired() => return Ok(t.access_token.clone()),
                _ => {}
            }
        }

        let mut guard = self.token.write().await;
        let current = guard.as_ref().ok_or_else(|| {
            GarminError::Auth("not authenticated; run the auth flow first".into())
        })?;
        // Another task may have refreshed while we waited for the lock.
        if !current.is_expired() {
            return Ok(current.access_token.clone());
        }
        tracing::debug!("access token stale, refreshing");
        let fresh = sso::refresh(&self.client, &self.urls, current).await?;
        if let Some(store) = &self.store {
            store.dump(&fresh)?;
        }
        let access = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(access)
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.urls.api_url, path)
    }

    async fn authed(
        &self,
        method: Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, GarminError> {
        let token = self.access_token().await?;
        Ok(self
            .client
            .request(method, self.api(path))
            .bearer_auth(token))
    }

    /// GET with rate-limit retry. Only idempotent requests are retried.
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, GarminError> {
        self.retry
            .retry_async(
                || async move {
                    let mut req = self.authed(Method::GET, path).await?;
                    if !query.is_empty() {
                        req = req.query(query);
                    }
                    let started = Instant::now();
                    let resp = req.send().await?;
                    finish_json(resp, "GET", started).await
                },
                GarminError::is_retryable,
            )
            .await
    }

    /// Non-GET request with an optional JSON body; no retry.
    async fn send_json(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, GarminError> {
        let label = method.as_str().to_string();
        let mut req = self.authed(method, path).await?;
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let started = Instant::now();
        let resp = req.send().await?;
        finish_json(resp, &label, started).await
    }

    async fn delete_empty(&self, path: &str) -> Result<(), GarminError> {
        let started = Instant::now();
        let resp = self.authed(Method::DELETE, path).await?.send().await?;
        record_request("DELETE", resp.status().as_u16(), started);
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(())
    }

    /// Download a file, streaming to disk when `output_path` is given,
    /// otherwise returning the bytes base64 encoded.
    async fn download(
        &self,
        path: &str,
        output_path: Option<PathBuf>,
    ) -> Result<Option<String>, GarminError> {
        let started = Instant::now();
        let resp = self.authed(Method::GET, path).await?.send().await?;
        record_request("GET", resp.status().as_u16(), started);
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        if let Some(path) = output_path {
            let mut stream = resp.bytes_stream();
            let mut file = tokio::fs::File::create(&path).await?;
            while let Some(chunk) = stream.next().await {
                let bytes = chunk.map_err(GarminError::Http)?;
                file.write_all(&bytes).await?;
            }
            file.sync_all().await?;
            return Ok(None);
        }

        let bytes = resp.bytes().await?;
        Ok(Some(STANDARD.encode(&bytes)))
    }

    /// Cached display name; several wellness endpoints key on it.
    async fn display_name(&self) -> Result<String, GarminError> {
        Ok(self.cached_profile().await?.display_name)
    }

    /// Cached profile PK; gear lookups key on it.
    async fn profile_pk(&self) -> Result<i64, GarminError> {
        let profile = self.cached_profile().await?;
        profile.profile_id.or(profile.id).ok_or_else(|| {
            GarminError::Config("social profile carries no profile id".into())
        })
    }

    async fn cached_profile(&self) -> Result<SocialProfile, GarminError> {
        if let Some(p) = self.profile.read().await.as_ref() {
            return Ok(p.clone());
        }
        let payload = self
            .get_json("/userprofile-service/socialProfile", &[])
            .await?;
        let profile: SocialProfile = serde_json::from_value(payload)
            .map_err(|e| GarminError::Config(format!("decoding social profile: {e}")))?;
        *self.profile.write().await = Some(profile.clone());
        Ok(profile)
    }

    async fn query_graphql(&self, query: String) -> Result<Value, GarminError> {
        self.send_json(
            Method::POST,
            "/graphql-gateway/graphql",
            &[],
            Some(&json!({ "query": query })),
        )
        .await
    }
}

async fn finish_json(
    resp: reqwest::Response,
    method: &str,
    started: Instant,
) -> Result<Value, GarminError> {
    let status = resp.status();
    record_request(method, status.as_u16(), started);
    if !status.is_success() {
        return Err(error_from_response(resp).await);
    }
    let text = resp.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| {
        let snippet: String = text.chars().take(256).collect();
        GarminError::Config(format!("decoding response: {e} - body: {snippet}"))
    })
}

fn record_request(method: &str, status: u16, started: Instant) {
    metrics::counter!(
        "garmin_client_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    metrics::histogram!("garmin_client_request_duration_seconds")
        .record(started.elapsed().as_secs_f64());
}

/// Extract error information from a failed response.
async fn error_from_response(resp: reqwest::Response) -> GarminError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(256).collect();
    GarminError::from_status(status, snippet)
}

/// Format a quantity the way the nutrition service expects: integer strings
/// for whole numbers ("160", not "160.0").
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Build the `nutritionContents` entry for a custom food payload, dropping
/// unset macros.
fn nutrition_contents(food: &CustomFood, serving_id: Option<&str>) -> Value {
    let mut contents = serde_json::Map::new();
    if let Some(serving_id) = serving_id {
        contents.insert("servingId".into(), json!(serving_id));
    }
    contents.insert(
        "servingUnit".into(),
        json!(food.serving_unit.clone().unwrap_or_else(|| "G".into())),
    );
    contents.insert(
        "numberOfUnits".into(),
        json!(format_quantity(food.number_of_units.unwrap_or(100.0))),
    );
    contents.insert("calories".into(), json!(format_quantity(food.calories)));
    let optional = [
        ("carbs", food.carbs),
        ("protein", food.protein),
        ("fat", food.fat),
        ("fiber", food.fiber),
        ("sugar", food.sugar),
        ("saturatedFat", food.saturated_fat),
        ("sodium", food.sodium),
        ("cholesterol", food.cholesterol),
        ("potassium", food.potassium),
    ];
    for (key, value) in optional {
        if let Some(v) = value {
            contents.insert(key.into(), json!(format_quantity(v)));
        }
    }
    Value::Object(contents)
}

fn custom_food_payload(food: &CustomFood, ids: Option<(&str, &str)>) -> Value {
    let mut meta = serde_json::Map::new();
    if let Some((food_id, _)) = ids {
        meta.insert("foodId".into(), json!(food_id));
    }
    meta.insert("foodName".into(), json!(food.food_name));
    meta.insert("foodType".into(), json!("GENERIC"));
    meta.insert("source".into(), json!("GARMIN"));
    meta.insert("regionCode".into(), json!("US"));
    meta.insert("languageCode".into(), json!("en"));
    json!({
        "foodMetaData": Value::Object(meta),
        "nutritionContents": [nutrition_contents(food, ids.map(|(_, s)| s))],
    })
}

#[async_trait]
impl GarminClient for ReqwestGarminClient {
    // === User profile ===

    async fn get_social_profile(&self) -> Result<SocialProfile, GarminError> {
        self.cached_profile().await
    }

    async fn get_user_settings(&self) -> Result<Value, GarminError> {
        self.get_json("/userprofile-service/userprofile/settings", &[])
            .await
    }

    async fn get_full_name(&self) -> Result<String, GarminError> {
        let profile = self.cached_profile().await?;
        Ok(profile.full_name.unwrap_or(profile.display_name))
    }

    async fn get_unit_system(&self) -> Result<String, GarminError> {
        let settings = self.get_user_settings().await?;
        settings
            .pointer("/userData/measurementSystem")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                GarminError::Config("user settings carry no userData.measurementSystem".into())
            })
    }

    // === Daily summaries and wellness ===

    async fn get_user_summary(&self, date: &str) -> Result<Value, GarminError> {
        let dn = self.display_name().await?;
        self.get_json(
            &format!("/usersummary-service/usersummary/daily/{dn}"),
            &[("calendarDate", date.to_string())],
        )
        .await
    }

    async fn get_stats_and_body(&self, date: &str) -> Result<Value, GarminError> {
        // Connect has no combined endpoint; merge the daily summary with the
        // day's body composition averages the way the mobile app does.
        let stats = self.get_user_summary(date).await?;
        let body = self.get_body_composition(date, date).await?;
        let mut merged = serde_json::Map::new();
        if let Value::Object(m) = stats {
            merged.extend(m);
        }
        if let Some(Value::Object(avg)) = body.get("totalAverage") {
            merged.extend(avg.clone());
        }
        Ok(Value::Object(merged))
    }

    async fn get_steps_data(&self, date: &str) -> Result<Value, GarminError> {
        let dn = self.display_name().await?;
        self.get_json(
            &format!("/wellness-service/wellness/dailySummaryChart/{dn}"),
            &[("date", date.to_string())],
        )
        .await
    }

    async fn get_daily_steps(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/usersummary-service/stats/steps/daily/{start_date}/{end_date}"),
            &[],
        )
        .await
    }

    async fn get_heart_rates(&self, date: &str) -> Result<Value, GarminError> {
        let dn = self.display_name().await?;
        self.get_json(
            &format!("/wellness-service/wellness/dailyHeartRate/{dn}"),
            &[("date", date.to_string())],
        )
        .await
    }

    async fn get_rhr_day(&self, date: &str) -> Result<Value, GarminError> {
        let dn = self.display_name().await?;
        self.get_json(
            &format!("/userstats-service/wellness/daily/{dn}"),
            &[
                ("fromDate", date.to_string()),
                ("untilDate", date.to_string()),
                ("metricId", "60".to_string()),
            ],
        )
        .await
    }

    async fn get_sleep_data(&self, date: &str) -> Result<Value, GarminError> {
        let dn = self.display_name().await?;
        self.get_json(
            &format!("/wellness-service/wellness/dailySleepData/{dn}"),
            &[
                ("date", date.to_string()),
                ("nonSleepBufferMinutes", "60".to_string()),
            ],
        )
        .await
    }

    async fn get_stress_data(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(&format!("/wellness-service/wellness/dailyStress/{date}"), &[])
            .await
    }

    async fn get_body_battery(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value, GarminError> {
        self.get_json(
            "/wellness-service/wellness/bodyBattery/reports/daily",
            &[
                ("startDate", start_date.to_string()),
                ("endDate", end_date.to_string()),
            ],
        )
        .await
    }

    async fn get_body_battery_events(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/wellness-service/wellness/bodyBattery/events/{date}"),
            &[],
        )
        .await
    }

    async fn get_respiration_data(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/wellness-service/wellness/daily/respiration/{date}"),
            &[],
        )
        .await
    }

    async fn get_spo2_data(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(&format!("/wellness-service/wellness/daily/spo2/{date}"), &[])
            .await
    }

    async fn get_max_metrics(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/metrics-service/metrics/maxmet/daily/{date}/{date}"),
            &[],
        )
        .await
    }

    async fn get_hydration_data(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/usersummary-service/usersummary/hydration/daily/{date}"),
            &[],
        )
        .await
    }

    async fn add_hydration_data(&self, value_ml: f64, date: &str) -> Result<Value, GarminError> {
        let payload = json!({
            "calendarDate": date,
            "valueInML": value_ml,
            "timestampLocal": format!("{date}T12:00:00.0"),
        });
        self.send_json(
            Method::PUT,
            "/usersummary-service/usersummary/hydration/log",
            &[],
            Some(&payload),
        )
        .await
    }

    async fn get_floors(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/wellness-service/wellness/floorsChartData/daily/{date}"),
            &[],
        )
        .await
    }

    async fn get_intensity_minutes(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(&format!("/wellness-service/wellness/daily/im/{date}"), &[])
            .await
    }

    async fn get_blood_pressure(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/bloodpressure-service/bloodpressure/range/{start_date}/{end_date}"),
            &[("includeAll", "true".to_string())],
        )
        .await
    }

    // === Training ===

    async fn get_training_readiness(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/metrics-service/metrics/trainingreadiness/{date}"),
            &[],
        )
        .await
    }

    async fn get_training_status(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/metrics-service/metrics/trainingstatus/aggregated/{date}"),
            &[],
        )
        .await
    }

    async fn get_hrv_data(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(&format!("/hrv-service/hrv/{date}"), &[]).await
    }

    async fn get_fitnessage_data(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(&format!("/fitnessage-service/fitnessage/{date}"), &[])
            .await
    }

    async fn get_hill_score(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value, GarminError> {
        self.get_json(
            "/metrics-service/metrics/hillscore/stats",
            &[
                ("startDate", start_date.to_string()),
                ("endDate", end_date.to_string()),
            ],
        )
        .await
    }

    async fn get_endurance_score(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value, GarminError> {
        self.get_json(
            "/metrics-service/metrics/endurancescore/stats",
            &[
                ("startDate", start_date.to_string()),
                ("endDate", end_date.to_string()),
            ],
        )
        .await
    }

    async fn get_race_predictions(&self) -> Result<Value, GarminError> {
        let dn = self.display_name().await?;
        self.get_json(
            &format!("/metrics-service/metrics/racepredictions/latest/{dn}"),
            &[],
        )
        .await
    }

    async fn get_progress_summary_between_dates(
        &self,
        start_date: &str,
        end_date: &str,
        metric: &str,
    ) -> Result<Value, GarminError> {
        self.get_json(
            "/fitnessstats-service/activity",
            &[
                ("startDate", start_date.to_string()),
                ("endDate", end_date.to_string()),
                ("aggregation", "daily".to_string()),
                ("groupByParentActivityType", "false".to_string()),
                ("metric", metric.to_string()),
            ],
        )
        .await
    }

    async fn get_lactate_threshold(
        &self,
        latest: bool,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Value, GarminError> {
        if latest {
            return self
                .get_json("/biometric-service/stats/lactateThreshold/latest", &[])
                .await;
        }
        match (start_date, end_date) {
            (Some(start), Some(end)) => {
                self.get_json(
                    &format!("/biometric-service/stats/lactateThreshold/range/{start}/{end}"),
                    &[],
                )
                .await
            }
            _ => Err(GarminError::InvalidInput(
                "start_date and end_date are required unless latest is set".into(),
            )),
        }
    }

    async fn request_reload(&self, date: &str) -> Result<Value, GarminError> {
        self.send_json(
            Method::POST,
            &format!("/wellness-service/wellness/epoch/request/{date}"),
            &[],
            None,
        )
        .await
    }

    // === Activities ===

    async fn get_activities(&self, start: u32, limit: u32) -> Result<Value, GarminError> {
        self.get_json(
            "/activitylist-service/activities/search/activities",
            &[("start", start.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn get_activities_by_date(
        &self,
        start_date: &str,
        end_date: &str,
        activity_type: Option<&str>,
    ) -> Result<Value, GarminError> {
        let mut pairs = vec![
            ("startDate", start_date.to_string()),
            ("endDate", end_date.to_string()),
            ("start", "0".to_string()),
            ("limit", "100".to_string()),
        ];
        if let Some(kind) = activity_type {
            pairs.push(("activityType", kind.to_string()));
        }
        self.get_json("/activitylist-service/activities/search/activities", &pairs)
            .await
    }

    async fn get_last_activity(&self) -> Result<Value, GarminError> {
        let payload = self.get_activities(0, 1).await?;
        match payload {
            Value::Array(mut items) if !items.is_empty() => Ok(items.remove(0)),
            _ => Err(GarminError::NotFound("no activities recorded".into())),
        }
    }

    async fn get_activity(&self, activity_id: u64) -> Result<Value, GarminError> {
        self.get_json(&format!("/activity-service/activity/{activity_id}"), &[])
            .await
    }

    async fn get_activity_splits(&self, activity_id: u64) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/activity-service/activity/{activity_id}/splits"),
            &[],
        )
        .await
    }

    async fn get_activity_weather(&self, activity_id: u64) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/activity-service/activity/{activity_id}/weather"),
            &[],
        )
        .await
    }

    async fn get_activity_hr_in_timezones(&self, activity_id: u64) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/activity-service/activity/{activity_id}/hrTimeInZones"),
            &[],
        )
        .await
    }

    async fn get_activity_gear(&self, activity_id: u64) -> Result<Value, GarminError> {
        self.get_json(
            "/gear-service/gear/filterGear",
            &[("activityId", activity_id.to_string())],
        )
        .await
    }

    async fn get_activity_types(&self) -> Result<Value, GarminError> {
        self.get_json("/activity-service/activity/activityTypes", &[])
            .await
    }

    async fn download_activity(
        &self,
        activity_id: u64,
        format: ActivityDownloadFormat,
        output_path: Option<PathBuf>,
    ) -> Result<Option<String>, GarminError> {
        let path = match format {
            ActivityDownloadFormat::Original => {
                format!("/download-service/files/activity/{activity_id}")
            }
            ActivityDownloadFormat::Tcx => {
                format!("/download-service/export/tcx/activity/{activity_id}")
            }
            ActivityDownloadFormat::Gpx => {
                format!("/download-service/export/gpx/activity/{activity_id}")
            }
            ActivityDownloadFormat::Kml => {
                format!("/download-service/export/kml/activity/{activity_id}")
            }
            ActivityDownloadFormat::Csv => {
                format!("/download-service/export/csv/activity/{activity_id}")
            }
        };
        self.download(&path, output_path).await
    }

    // === Body composition ===

    async fn get_body_composition(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value, GarminError> {
        self.get_json(
            "/weight-service/weight/dateRange",
            &[
                ("startDate", start_date.to_string()),
                ("endDate", end_date.to_string()),
            ],
        )
        .await
    }

    async fn get_weigh_ins(&self, start_date: &str, end_date: &str) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/weight-service/weight/range/{start_date}/{end_date}"),
            &[("includeAll", "true".to_string())],
        )
        .await
    }

    async fn get_daily_weigh_ins(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(&format!("/weight-service/weight/dayview/{date}"), &[])
            .await
    }

    async fn add_weigh_in(
        &self,
        weight_kg: f64,
        date: Option<&str>,
    ) -> Result<Value, GarminError> {
        let date = date
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
        let payload = json!({
            "dateTimestamp": format!("{date}T12:00:00.00"),
            "gmtTimestamp": format!("{date}T12:00:00.00"),
            "unitKey": "kg",
            "value": weight_kg,
        });
        self.send_json(Method::POST, "/weight-service/user-weight", &[], Some(&payload))
            .await
    }

    async fn add_body_composition(
        &self,
        date: &str,
        weight_kg: f64,
        percent_fat: Option<f64>,
        percent_hydration: Option<f64>,
        bone_mass: Option<f64>,
        muscle_mass: Option<f64>,
        bmi: Option<f64>,
    ) -> Result<Value, GarminError> {
        let mut payload = serde_json::Map::new();
        payload.insert("dateTimestamp".into(), json!(format!("{date}T12:00:00.00")));
        payload.insert("gmtTimestamp".into(), json!(format!("{date}T12:00:00.00")));
        payload.insert("unitKey".into(), json!("kg"));
        payload.insert("value".into(), json!(weight_kg));
        let optional = [
            ("percentFat", percent_fat),
            ("percentHydration", percent_hydration),
            ("boneMass", bone_mass),
            ("muscleMass", muscle_mass),
            ("bmi", bmi),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                payload.insert(key.into(), json!(v));
            }
        }
        self.send_json(
            Method::POST,
            "/weight-service/user-weight",
            &[],
            Some(&Value::Object(payload)),
        )
        .await
    }

    async fn delete_weigh_in(&self, weight_pk: i64, date: &str) -> Result<(), GarminError> {
        self.delete_empty(&format!(
            "/weight-service/weight/{date}/byversion/{weight_pk}"
        ))
        .await
    }

    // === Devices ===

    async fn get_devices(&self) -> Result<Value, GarminError> {
        self.get_json("/device-service/deviceregistration/devices", &[])
            .await
    }

    async fn get_device_settings(&self, device_id: u64) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/device-service/deviceservice/device-info/settings/{device_id}"),
            &[],
        )
        .await
    }

    async fn get_device_last_used(&self) -> Result<Value, GarminError> {
        self.get_json("/device-service/deviceservice/mylastused", &[])
            .await
    }

    async fn get_primary_training_device(&self) -> Result<Value, GarminError> {
        self.get_json("/web-gateway/device-info/primary-training-device", &[])
            .await
    }

    // === Gear ===

    async fn get_gear(&self) -> Result<Value, GarminError> {
        let pk = self.profile_pk().await?;
        self.get_json(
            "/gear-service/gear/filterGear",
            &[("userProfilePk", pk.to_string())],
        )
        .await
    }

    async fn get_gear_defaults(&self) -> Result<Value, GarminError> {
        let pk = self.profile_pk().await?;
        self.get_json(&format!("/gear-service/gear/user/{pk}/activityTypes"), &[])
            .await
    }

    async fn get_gear_stats(&self, gear_uuid: &str) -> Result<Value, GarminError> {
        self.get_json(&format!("/gear-service/gear/stats/{gear_uuid}"), &[])
            .await
    }

    async fn get_gear_activities(
        &self,
        gear_uuid: &str,
        start: u32,
        limit: u32,
    ) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/activitylist-service/activities/{gear_uuid}/gear"),
            &[("start", start.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn set_gear_default(
        &self,
        gear_uuid: &str,
        activity_type_pk: u64,
        default: bool,
    ) -> Result<Value, GarminError> {
        self.send_json(
            Method::PUT,
            &format!(
                "/gear-service/gear/{gear_uuid}/activityType/{activity_type_pk}/default/{default}"
            ),
            &[],
            None,
        )
        .await
    }

    // === Goals, badges and challenges ===

    async fn get_goals(&self, status: &str, start: u32, limit: u32) -> Result<Value, GarminError> {
        self.get_json(
            "/goal-service/goal/goals",
            &[
                ("status", status.to_string()),
                ("start", start.to_string()),
                ("limit", limit.to_string()),
                ("sortOrder", "asc".to_string()),
            ],
        )
        .await
    }

    async fn get_earned_badges(&self) -> Result<Value, GarminError> {
        self.get_json("/badge-service/badge/earned", &[]).await
    }

    async fn get_adhoc_challenges(&self, start: u32, limit: u32) -> Result<Value, GarminError> {
        self.get_json(
            "/adhocchallenge-service/adHocChallenge/historical",
            &[("start", start.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn get_badge_challenges(&self, start: u32, limit: u32) -> Result<Value, GarminError> {
        self.get_json(
            "/badgechallenge-service/badgeChallenge/completed",
            &[("start", start.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn get_available_badge_challenges(
        &self,
        start: u32,
        limit: u32,
    ) -> Result<Value, GarminError> {
        self.get_json(
            "/badgechallenge-service/badgeChallenge/available",
            &[("start", start.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn get_personal_records(&self) -> Result<Value, GarminError> {
        let dn = self.display_name().await?;
        self.get_json(&format!("/personalrecord-service/personalrecord/prs/{dn}"), &[])
            .await
    }

    // === Women's health ===

    async fn get_pregnancy_summary(&self) -> Result<Value, GarminError> {
        self.get_json(
            "/periodichealth-service/menstrualcycle/pregnancysnapshot",
            &[],
        )
        .await
    }

    async fn get_menstrual_data_for_date(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/periodichealth-service/menstrualcycle/dayview/{date}"),
            &[],
        )
        .await
    }

    async fn get_menstrual_calendar_data(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value, GarminError> {
        self.get_json(
            &format!("/periodichealth-service/menstrualcycle/calendar/{start_date}/{end_date}"),
            &[],
        )
        .await
    }

    // === Workouts ===

    async fn get_workouts(&self, start: u32, limit: u32) -> Result<Value, GarminError> {
        self.get_json(
            "/workout-service/workouts",
            &[("start", start.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    async fn get_workout_by_id(&self, workout_id: u64) -> Result<Value, GarminError> {
        self.get_json(&format!("/workout-service/workout/{workout_id}"), &[])
            .await
    }

    async fn download_workout(
        &self,
        workout_id: u64,
        output_path: Option<PathBuf>,
    ) -> Result<Option<String>, GarminError> {
        self.download(&format!("/workout-service/workout/FIT/{workout_id}"), output_path)
            .await
    }

    async fn upload_workout(&self, workout: &Value) -> Result<Value, GarminError> {
        self.send_json(Method::POST, "/workout-service/workout", &[], Some(workout))
            .await
    }

    async fn schedule_workout(&self, workout_id: u64, date: &str) -> Result<Value, GarminError> {
        self.send_json(
            Method::POST,
            &format!("/workout-service/schedule/{workout_id}"),
            &[],
            Some(&json!({ "date": date })),
        )
        .await
    }

    async fn get_scheduled_workouts(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value, GarminError> {
        self.query_graphql(format!(
            "query{{workoutScheduleSummariesScalar(startDate:\"{start_date}\", endDate:\"{end_date}\")}}"
        ))
        .await
    }

    async fn get_training_plan_workouts(&self, date: &str) -> Result<Value, GarminError> {
        self.query_graphql(format!(
            "query{{trainingPlanScalar(calendarDate:\"{date}\", lang:\"en-US\", firstDayOfWeek:\"monday\")}}"
        ))
        .await
    }

    // === Nutrition ===

    async fn get_nutrition_food_log(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(&format!("/nutrition-service/food/logs/{date}"), &[])
            .await
    }

    async fn get_nutrition_meals(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(&format!("/nutrition-service/meals/{date}"), &[])
            .await
    }

    async fn get_nutrition_settings(&self, date: &str) -> Result<Value, GarminError> {
        self.get_json(&format!("/nutrition-service/settings/{date}"), &[])
            .await
    }

    async fn get_custom_foods(
        &self,
        search: &str,
        start: u32,
        limit: u32,
    ) -> Result<Value, GarminError> {
        self.get_json(
            "/nutrition-service/customFood",
            &[
                ("searchExpression", search.to_string()),
                ("start", start.to_string()),
                ("limit", limit.to_string()),
                ("includeContent", "true".to_string()),
            ],
        )
        .await
    }

    async fn get_custom_food_serving_units(&self) -> Result<Value, GarminError> {
        self.get_json("/nutrition-service/metadata/customFoodServingUnits", &[])
            .await
    }

    async fn create_custom_food(&self, food: &CustomFood) -> Result<Value, GarminError> {
        let payload = custom_food_payload(food, None);
        self.send_json(Method::PUT, "/nutrition-service/customFood", &[], Some(&payload))
            .await
    }

    async fn update_custom_food(
        &self,
        food_id: &str,
        serving_id: &str,
        food: &CustomFood,
    ) -> Result<Value, GarminError> {
        let payload = custom_food_payload(food, Some((food_id, serving_id)));
        self.send_json(Method::PUT, "/nutrition-service/customFood", &[], Some(&payload))
            .await
    }

    async fn log_food(
        &self,
        meal_date: &str,
        meal_time: &str,
        meal_id: i64,
        food_id: &str,
        serving_id: &str,
        serving_qty: f64,
    ) -> Result<Value, GarminError> {
        let log_timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S.000Z").to_string();
        let payload = json!({
            "mealDate": meal_date,
            "foodLogItems": [{
                "logTimestamp": log_timestamp,
                "logSource": "GCW",
                "logCategory": "REGULAR_LOG",
                "mealTime": meal_time,
                "action": "ADD",
                "mealId": meal_id,
                "foodId": food_id,
                "servingId": serving_id,
                "source": "GARMIN",
                "regionCode": "US",
                "languageCode": "en",
                "servingQty": serving_qty,
            }],
        });
        self.send_json(Method::PUT, "/nutrition-service/food/logs", &[], Some(&payload))
            .await
    }
}
