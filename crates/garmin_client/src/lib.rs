//! Garmin Connect client: SSO login with MFA, token persistence, and the
//! Connect API surface used by the MCP server.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod http_client;
pub mod retry;
pub mod sso;
pub mod token_store;

#[derive(Debug, Error)]
pub enum GarminError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication error: {0}")]
    Auth(String),
    #[error("mfa error: {0}")]
    Mfa(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("upstream returned {code}: {body}")]
    Status { code: u16, body: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GarminError {
    pub fn from_status(code: u16, body: String) -> Self {
        match code {
            401 | 403 => GarminError::Auth(body),
            404 => GarminError::NotFound(body),
            422 => GarminError::InvalidInput(body),
            429 => GarminError::RateLimited(body),
            _ => GarminError::Status { code, body },
        }
    }

    /// Rate-limit responses are the only class the client retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GarminError::RateLimited(_))
    }
}

/// Subset of the Connect social profile the client keeps typed; the display
/// name keys several wellness endpoints and the profile PK keys gear lookups.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, JsonSchema)]
pub struct SocialProfile {
    pub id: Option<i64>,
    #[serde(rename = "profileId")]
    pub profile_id: Option<i64>,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
}

/// Export formats accepted by the activity download service.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityDownloadFormat {
    Original,
    Tcx,
    Gpx,
    Kml,
    Csv,
}

/// Nutritional content for creating or updating a custom food. Quantities are
/// per serving; optional macros are omitted from the upstream payload when
/// unset.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, JsonSchema)]
pub struct CustomFood {
    pub food_name: String,
    pub calories: f64,
    /// Serving unit, e.g. "G", "ML", "OZ". Defaults to "G".
    pub serving_unit: Option<String>,
    /// Serving size in the chosen unit. Defaults to 100.
    pub number_of_units: Option<f64>,
    pub carbs: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub saturated_fat: Option<f64>,
    pub sodium: Option<f64>,
    pub cholesterol: Option<f64>,
    pub potassium: Option<f64>,
}

/// One method per upstream operation. Payloads are returned as the upstream
/// JSON, untouched; the MCP layer never reshapes them.
#[async_trait]
pub trait GarminClient: Send + Sync + 'static {
    // === User profile ===

    async fn get_social_profile(&self) -> Result<SocialProfile, GarminError>;
    async fn get_user_settings(&self) -> Result<serde_json::Value, GarminError>;
    async fn get_full_name(&self) -> Result<String, GarminError>;
    async fn get_unit_system(&self) -> Result<String, GarminError>;

    // === Daily summaries and wellness ===

    async fn get_user_summary(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_stats_and_body(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_steps_data(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_daily_steps(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_heart_rates(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_rhr_day(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_sleep_data(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_stress_data(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_body_battery(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_body_battery_events(&self, date: &str)
    -> Result<serde_json::Value, GarminError>;
    async fn get_respiration_data(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_spo2_data(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_max_metrics(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_hydration_data(&self, date: &str) -> Result<serde_json::Value, GarminError>;

    /// Log a hydration intake in milliliters for a date.
    async fn add_hydration_data(
        &self,
        value_ml: f64,
        date: &str,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_floors(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_intensity_minutes(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_blood_pressure(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<serde_json::Value, GarminError>;

    // === Training ===

    async fn get_training_readiness(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_training_status(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_hrv_data(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_fitnessage_data(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_hill_score(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_endurance_score(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_race_predictions(&self) -> Result<serde_json::Value, GarminError>;
    async fn get_progress_summary_between_dates(
        &self,
        start_date: &str,
        end_date: &str,
        metric: &str,
    ) -> Result<serde_json::Value, GarminError>;

    /// Latest measurement when `latest`, otherwise the `start..end` range
    /// (both dates required then).
    async fn get_lactate_threshold(
        &self,
        latest: bool,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<serde_json::Value, GarminError>;

    /// Ask Connect to re-sync wellness epoch data for a date.
    async fn request_reload(&self, date: &str) -> Result<serde_json::Value, GarminError>;

    // === Activities ===

    async fn get_activities(
        &self,
        start: u32,
        limit: u32,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_activities_by_date(
        &self,
        start_date: &str,
        end_date: &str,
        activity_type: Option<&str>,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_last_activity(&self) -> Result<serde_json::Value, GarminError>;
    async fn get_activity(&self, activity_id: u64) -> Result<serde_json::Value, GarminError>;
    async fn get_activity_splits(
        &self,
        activity_id: u64,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_activity_weather(
        &self,
        activity_id: u64,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_activity_hr_in_timezones(
        &self,
        activity_id: u64,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_activity_gear(&self, activity_id: u64)
    -> Result<serde_json::Value, GarminError>;
    async fn get_activity_types(&self) -> Result<serde_json::Value, GarminError>;

    /// Download an activity export. With `output_path` the bytes are written
    /// to disk and `None` is returned; otherwise the bytes come back base64
    /// encoded.
    async fn download_activity(
        &self,
        activity_id: u64,
        format: ActivityDownloadFormat,
        output_path: Option<std::path::PathBuf>,
    ) -> Result<Option<String>, GarminError>;

    // === Body composition ===

    async fn get_body_composition(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_weigh_ins(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_daily_weigh_ins(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn add_weigh_in(
        &self,
        weight_kg: f64,
        date: Option<&str>,
    ) -> Result<serde_json::Value, GarminError>;
    #[allow(clippy::too_many_arguments)]
    async fn add_body_composition(
        &self,
        date: &str,
        weight_kg: f64,
        percent_fat: Option<f64>,
        percent_hydration: Option<f64>,
        bone_mass: Option<f64>,
        muscle_mass: Option<f64>,
        bmi: Option<f64>,
    ) -> Result<serde_json::Value, GarminError>;
    async fn delete_weigh_in(&self, weight_pk: i64, date: &str) -> Result<(), GarminError>;

    // === Devices ===

    async fn get_devices(&self) -> Result<serde_json::Value, GarminError>;
    async fn get_device_settings(&self, device_id: u64)
    -> Result<serde_json::Value, GarminError>;
    async fn get_device_last_used(&self) -> Result<serde_json::Value, GarminError>;
    async fn get_primary_training_device(&self) -> Result<serde_json::Value, GarminError>;

    // === Gear ===

    async fn get_gear(&self) -> Result<serde_json::Value, GarminError>;
    async fn get_gear_defaults(&self) -> Result<serde_json::Value, GarminError>;
    async fn get_gear_stats(&self, gear_uuid: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_gear_activities(
        &self,
        gear_uuid: &str,
        start: u32,
        limit: u32,
    ) -> Result<serde_json::Value, GarminError>;
    async fn set_gear_default(
        &self,
        gear_uuid: &str,
        activity_type_pk: u64,
        default: bool,
    ) -> Result<serde_json::Value, GarminError>;

    // === Goals, badges and challenges ===

    async fn get_goals(
        &self,
        status: &str,
        start: u32,
        limit: u32,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_earned_badges(&self) -> Result<serde_json::Value, GarminError>;
    async fn get_adhoc_challenges(
        &self,
        start: u32,
        limit: u32,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_badge_challenges(
        &self,
        start: u32,
        limit: u32,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_available_badge_challenges(
        &self,
        start: u32,
        limit: u32,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_personal_records(&self) -> Result<serde_json::Value, GarminError>;

    // === Women's health ===

    async fn get_pregnancy_summary(&self) -> Result<serde_json::Value, GarminError>;
    async fn get_menstrual_data_for_date(
        &self,
        date: &str,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_menstrual_calendar_data(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<serde_json::Value, GarminError>;

    // === Workouts ===

    async fn get_workouts(&self, start: u32, limit: u32)
    -> Result<serde_json::Value, GarminError>;
    async fn get_workout_by_id(&self, workout_id: u64)
    -> Result<serde_json::Value, GarminError>;

    /// Download a workout as a FIT file; same disk/base64 contract as
    /// [`download_activity`](GarminClient::download_activity).
    async fn download_workout(
        &self,
        workout_id: u64,
        output_path: Option<std::path::PathBuf>,
    ) -> Result<Option<String>, GarminError>;
    async fn upload_workout(
        &self,
        workout: &serde_json::Value,
    ) -> Result<serde_json::Value, GarminError>;
    async fn schedule_workout(
        &self,
        workout_id: u64,
        date: &str,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_scheduled_workouts(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_training_plan_workouts(
        &self,
        date: &str,
    ) -> Result<serde_json::Value, GarminError>;

    // === Nutrition ===

    async fn get_nutrition_food_log(&self, date: &str)
    -> Result<serde_json::Value, GarminError>;
    async fn get_nutrition_meals(&self, date: &str) -> Result<serde_json::Value, GarminError>;
    async fn get_nutrition_settings(&self, date: &str)
    -> Result<serde_json::Value, GarminError>;
    async fn get_custom_foods(
        &self,
        search: &str,
        start: u32,
        limit: u32,
    ) -> Result<serde_json::Value, GarminError>;
    async fn get_custom_food_serving_units(&self) -> Result<serde_json::Value, GarminError>;
    async fn create_custom_food(
        &self,
        food: &CustomFood,
    ) -> Result<serde_json::Value, GarminError>;
    async fn update_custom_food(
        &self,
        food_id: &str,
        serving_id: &str,
        food: &CustomFood,
    ) -> Result<serde_json::Value, GarminError>;
    #[allow(clippy::too_many_arguments)]
    async fn log_food(
        &self,
        meal_date: &str,
        meal_time: &str,
        meal_id: i64,
        food_id: &str,
        serving_id: &str,
        serving_qty: f64,
    ) -> Result<serde_json::Value, GarminError>;
}
