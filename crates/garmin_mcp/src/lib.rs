use std::sync::Arc;

use rmcp::Json;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, GetPromptRequestParams, GetPromptResult, ListPromptsResult, ListResourcesResult,
    PaginatedRequestParams, RawResource, ReadResourceRequestParams, ReadResourceResult,
    ResourceContents,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer};
use rmcp::{prompt, prompt_handler, prompt_router, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use garmin_client::{ActivityDownloadFormat, CustomFood, GarminClient, SocialProfile};

mod error;
mod prompts;

pub use error::{McpError, McpResult};

pub const PROFILE_RESOURCE_URI: &str = "garmin://user/profile";

#[derive(Clone)]
pub struct GarminMcpHandler {
    client: Arc<dyn GarminClient>,
    tool_router: rmcp::handler::server::tool::ToolRouter<GarminMcpHandler>,
    prompt_router: rmcp::handler::server::router::prompt::PromptRouter<GarminMcpHandler>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ObjectResult {
    pub value: Value,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FullNameResult {
    pub full_name: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct UnitSystemResult {
    pub unit_system: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DateParam {
    /// Date in YYYY-MM-DD format
    pub date: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DateRangeParams {
    /// Start date in YYYY-MM-DD format
    pub start_date: String,
    /// End date in YYYY-MM-DD format
    pub end_date: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct PaginationParams {
    /// Starting index for pagination (default 0)
    pub start: Option<u32>,
    /// Maximum number of results (default 20)
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ActivityIdParam {
    pub activity_id: u64,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ActivitiesByDateParams {
    /// Start date in YYYY-MM-DD format
    pub start_date: String,
    /// End date in YYYY-MM-DD format
    pub end_date: String,
    /// Optional activity type filter, e.g. "running" or "cycling"
    pub activity_type: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DownloadActivityParams {
    pub activity_id: u64,
    /// Export format: ORIGINAL, TCX, GPX, KML or CSV (default ORIGINAL)
    pub format: Option<ActivityDownloadFormat>,
    /// When set, the file is written here instead of being returned base64 encoded
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ProgressSummaryParams {
    pub start_date: String,
    pub end_date: String,
    /// Metric to aggregate, e.g. "distance" or "duration" (default "distance")
    pub metric: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct LactateThresholdParams {
    /// Return only the latest measurement (default true)
    pub latest: Option<bool>,
    /// Range start in YYYY-MM-DD format; required when latest is false
    pub start_date: Option<String>,
    /// Range end in YYYY-MM-DD format; required when latest is false
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct HydrationLogParams {
    /// Amount of water consumed in milliliters
    pub value_ml: f64,
    /// Date in YYYY-MM-DD format
    pub date: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct WeighInParams {
    /// Weight in kilograms
    pub weight_kg: f64,
    /// Date in YYYY-MM-DD format (default today)
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct BodyCompositionParams {
    /// Date in YYYY-MM-DD format
    pub date: String,
    /// Weight in kilograms
    pub weight_kg: f64,
    pub percent_fat: Option<f64>,
    pub percent_hydration: Option<f64>,
    pub bone_mass: Option<f64>,
    pub muscle_mass: Option<f64>,
    pub bmi: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DeleteWeighInParams {
    /// Weigh-in version key from get_daily_weigh_ins
    pub weight_pk: i64,
    /// Date in YYYY-MM-DD format
    pub date: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DeviceIdParam {
    pub device_id: u64,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GearUuidParam {
    pub gear_uuid: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GearActivitiesParams {
    pub gear_uuid: String,
    pub start: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SetGearDefaultParams {
    pub gear_uuid: String,
    /// Activity type key from get_gear_defaults
    pub activity_type_pk: u64,
    /// Whether the gear becomes the default for that activity type
    pub default: bool,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GoalsParams {
    /// Goal status filter: "active", "future" or "past" (default "active")
    pub status: Option<String>,
    pub start: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct WorkoutIdParam {
    pub workout_id: u64,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DownloadWorkoutParams {
    pub workout_id: u64,
    /// When set, the FIT file is written here instead of being returned base64 encoded
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UploadWorkoutParams {
    /// Complete workout definition as accepted by the workout service
    pub workout: Value,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ScheduleWorkoutParams {
    /// Workout ID from get_workouts
    pub workout_id: u64,
    /// Calendar date in YYYY-MM-DD format
    pub date: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CustomFoodSearchParams {
    /// Search expression to filter foods (empty lists everything)
    pub search: Option<String>,
    pub start: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateCustomFoodParams {
    /// Food ID from get_custom_foods
    pub food_id: String,
    /// Serving ID from get_custom_foods
    pub serving_id: String,
    #[serde(flatten)]
    pub food: CustomFood,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct LogFoodParams {
    /// Date in YYYY-MM-DD format
    pub meal_date: String,
    /// Time in HH:MM:SS format, e.g. "12:30:00"
    pub meal_time: String,
    /// Meal ID from get_nutrition_daily_meals
    pub meal_id: i64,
    /// Food ID from get_custom_foods or create_custom_food
    pub food_id: String,
    /// Serving ID from get_custom_foods or create_custom_food
    pub serving_id: String,
    /// Number of servings (default 1)
    pub serving_qty: Option<f64>,
}

// === Prompt parameters ===

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DatePromptParams {
    /// Date in YYYY-MM-DD format (default today)
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ActivityDeepDivePromptParams {
    pub activity_id: u64,
}

fn object(value: Value) -> Json<ObjectResult> {
    Json(ObjectResult { value })
}

/// Wrap a download result the way the tool surface reports it: either the
/// base64 payload or a confirmation that the file landed on disk.
fn download_result(encoded: Option<String>, path: Option<String>) -> Json<ObjectResult> {
    let value = match (encoded, path) {
        (Some(data), _) => serde_json::json!({ "base64": data }),
        (None, Some(path)) => serde_json::json!({ "written_to_disk": true, "path": path }),
        (None, None) => serde_json::json!({ "written_to_disk": true }),
    };
    object(value)
}

#[tool_router]
#[prompt_router]
impl GarminMcpHandler {
    pub fn new(client: Arc<dyn GarminClient>) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    pub fn tool_count(&self) -> usize {
        self.tool_router.list_all().len()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompt_router.list_all().len()
    }

    // === User profile ===

    #[tool(name = "get_full_name", description = "Get the user's full name from their profile")]
    async fn get_full_name(&self) -> Result<Json<FullNameResult>, String> {
        let full_name = self.client.get_full_name().await.map_err(|e| e.to_string())?;
        Ok(Json(FullNameResult { full_name }))
    }

    #[tool(
        name = "get_unit_system",
        description = "Get the user's preferred unit system (metric or statute_us)"
    )]
    async fn get_unit_system(&self) -> Result<Json<UnitSystemResult>, String> {
        let unit_system = self
            .client
            .get_unit_system()
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(UnitSystemResult { unit_system }))
    }

    #[tool(name = "get_user_profile", description = "Get the user's social profile")]
    async fn get_user_profile(&self) -> Result<Json<SocialProfile>, String> {
        let profile = self
            .client
            .get_social_profile()
            .await
            .map_err(|e| e.to_string())?;
        Ok(Json(profile))
    }

    #[tool(
        name = "get_userprofile_settings",
        description = "Get user profile settings (units, formats, preferences)"
    )]
    async fn get_userprofile_settings(&self) -> Result<Json<ObjectResult>, String> {
        let v = self
            .client
            .get_user_settings()
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    // === Daily summaries and wellness ===

    #[tool(
        name = "get_user_summary",
        description = "Get the daily summary (steps, calories, HR, stress) for a date"
    )]
    async fn get_user_summary(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_user_summary(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_stats_and_body",
        description = "Get the daily summary combined with body composition for a date"
    )]
    async fn get_stats_and_body(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_stats_and_body(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_steps_data",
        description = "Get the step chart (15-minute buckets) for a date"
    )]
    async fn get_steps_data(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_steps_data(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_daily_steps",
        description = "Get daily step totals between two dates"
    )]
    async fn get_daily_steps(
        &self,
        params: Parameters<DateRangeParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_daily_steps(&p.start_date, &p.end_date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_heart_rates", description = "Get heart rate samples for a date")]
    async fn get_heart_rates(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_heart_rates(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_rhr_day", description = "Get the resting heart rate for a date")]
    async fn get_rhr_day(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_rhr_day(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_sleep_data",
        description = "Get sleep stages, score and movement for a date"
    )]
    async fn get_sleep_data(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_sleep_data(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_stress_data", description = "Get stress levels through a date")]
    async fn get_stress_data(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_stress_data(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_body_battery",
        description = "Get Body Battery reports between two dates"
    )]
    async fn get_body_battery(
        &self,
        params: Parameters<DateRangeParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_body_battery(&p.start_date, &p.end_date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_body_battery_events",
        description = "Get Body Battery impact events (sleep, activity, stress) for a date"
    )]
    async fn get_body_battery_events(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_body_battery_events(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_respiration_data",
        description = "Get respiration rate data for a date"
    )]
    async fn get_respiration_data(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_respiration_data(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_spo2_data", description = "Get pulse ox (SpO2) data for a date")]
    async fn get_spo2_data(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_spo2_data(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_max_metrics",
        description = "Get VO2 max and fitness metrics for a date"
    )]
    async fn get_max_metrics(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_max_metrics(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_hydration_data", description = "Get hydration log for a date")]
    async fn get_hydration_data(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_hydration_data(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "add_hydration_data",
        description = "Log water intake in milliliters for a date"
    )]
    async fn add_hydration_data(
        &self,
        params: Parameters<HydrationLogParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .add_hydration_data(p.value_ml, &p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_floors", description = "Get floors climbed for a date")]
    async fn get_floors(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_floors(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_intensity_minutes",
        description = "Get intensity minutes for a date"
    )]
    async fn get_intensity_minutes(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_intensity_minutes(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_blood_pressure",
        description = "Get blood pressure measurements between two dates"
    )]
    async fn get_blood_pressure(
        &self,
        params: Parameters<DateRangeParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_blood_pressure(&p.start_date, &p.end_date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    // === Training ===

    #[tool(
        name = "get_training_readiness",
        description = "Get the training readiness score and contributors for a date"
    )]
    async fn get_training_readiness(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_training_readiness(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_training_status",
        description = "Get training status (load, VO2max trend) for a date"
    )]
    async fn get_training_status(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_training_status(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_hrv_data", description = "Get heart rate variability data for a date")]
    async fn get_hrv_data(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_hrv_data(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_fitnessage_data", description = "Get fitness age data for a date")]
    async fn get_fitnessage_data(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_fitnessage_data(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_hill_score", description = "Get hill score between two dates")]
    async fn get_hill_score(
        &self,
        params: Parameters<DateRangeParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_hill_score(&p.start_date, &p.end_date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_endurance_score",
        description = "Get endurance score between two dates"
    )]
    async fn get_endurance_score(
        &self,
        params: Parameters<DateRangeParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_endurance_score(&p.start_date, &p.end_date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_race_predictions",
        description = "Get current race time predictions (5K to marathon)"
    )]
    async fn get_race_predictions(&self) -> Result<Json<ObjectResult>, String> {
        let v = self
            .client
            .get_race_predictions()
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_progress_summary_between_dates",
        description = "Get aggregated activity metrics between two dates"
    )]
    async fn get_progress_summary_between_dates(
        &self,
        params: Parameters<ProgressSummaryParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let metric = p.metric.as_deref().unwrap_or("distance");
        let v = self
            .client
            .get_progress_summary_between_dates(&p.start_date, &p.end_date, metric)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_lactate_threshold",
        description = "Get lactate threshold data, latest or over a date range"
    )]
    async fn get_lactate_threshold(
        &self,
        params: Parameters<LactateThresholdParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_lactate_threshold(
                p.latest.unwrap_or(true),
                p.start_date.as_deref(),
                p.end_date.as_deref(),
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "request_reload",
        description = "Ask Garmin to re-sync wellness data for a date"
    )]
    async fn request_reload(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .request_reload(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    // === Activities ===

    #[tool(name = "get_activities", description = "List recent activities with pagination")]
    async fn get_activities(
        &self,
        params: Parameters<PaginationParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_activities(p.start.unwrap_or(0), p.limit.unwrap_or(20))
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_activities_by_date",
        description = "List activities between two dates, optionally filtered by type"
    )]
    async fn get_activities_by_date(
        &self,
        params: Parameters<ActivitiesByDateParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_activities_by_date(&p.start_date, &p.end_date, p.activity_type.as_deref())
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_last_activity", description = "Get the most recent activity")]
    async fn get_last_activity(&self) -> Result<Json<ObjectResult>, String> {
        let v = self
            .client
            .get_last_activity()
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_activity", description = "Get full details for an activity")]
    async fn get_activity(
        &self,
        params: Parameters<ActivityIdParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_activity(p.activity_id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_activity_splits", description = "Get lap splits for an activity")]
    async fn get_activity_splits(
        &self,
        params: Parameters<ActivityIdParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_activity_splits(p.activity_id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_activity_weather",
        description = "Get weather conditions recorded for an activity"
    )]
    async fn get_activity_weather(
        &self,
        params: Parameters<ActivityIdParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_activity_weather(p.activity_id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_activity_hr_in_timezones",
        description = "Get time in heart rate zones for an activity"
    )]
    async fn get_activity_hr_in_timezones(
        &self,
        params: Parameters<ActivityIdParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_activity_hr_in_timezones(p.activity_id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_activity_gear", description = "Get gear used for an activity")]
    async fn get_activity_gear(
        &self,
        params: Parameters<ActivityIdParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_activity_gear(p.activity_id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_activity_types", description = "List all known activity types")]
    async fn get_activity_types(&self) -> Result<Json<ObjectResult>, String> {
        let v = self
            .client
            .get_activity_types()
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "download_activity",
        description = "Download an activity export (ORIGINAL/TCX/GPX/KML/CSV)"
    )]
    async fn download_activity(
        &self,
        params: Parameters<DownloadActivityParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let path = p.output_path.clone();
        let result = self
            .client
            .download_activity(
                p.activity_id,
                p.format.unwrap_or(ActivityDownloadFormat::Original),
                p.output_path.map(std::path::PathBuf::from),
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok(download_result(result, path))
    }

    // === Body composition ===

    #[tool(
        name = "get_body_composition",
        description = "Get body composition (weight, BMI, body fat) between two dates"
    )]
    async fn get_body_composition(
        &self,
        params: Parameters<DateRangeParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_body_composition(&p.start_date, &p.end_date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_weigh_ins", description = "Get weigh-ins between two dates")]
    async fn get_weigh_ins(
        &self,
        params: Parameters<DateRangeParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_weigh_ins(&p.start_date, &p.end_date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_daily_weigh_ins", description = "Get weigh-ins recorded on a date")]
    async fn get_daily_weigh_ins(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_daily_weigh_ins(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "add_weigh_in", description = "Record a weigh-in in kilograms")]
    async fn add_weigh_in(
        &self,
        params: Parameters<WeighInParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .add_weigh_in(p.weight_kg, p.date.as_deref())
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "add_body_composition",
        description = "Record a body composition measurement for a date"
    )]
    async fn add_body_composition(
        &self,
        params: Parameters<BodyCompositionParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .add_body_composition(
                &p.date,
                p.weight_kg,
                p.percent_fat,
                p.percent_hydration,
                p.bone_mass,
                p.muscle_mass,
                p.bmi,
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "delete_weigh_in", description = "Delete a weigh-in by version key and date")]
    async fn delete_weigh_in(
        &self,
        params: Parameters<DeleteWeighInParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        self.client
            .delete_weigh_in(p.weight_pk, &p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(serde_json::json!({ "deleted": true })))
    }

    // === Devices ===

    #[tool(name = "get_devices", description = "List registered Garmin devices")]
    async fn get_devices(&self) -> Result<Json<ObjectResult>, String> {
        let v = self.client.get_devices().await.map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_device_settings", description = "Get settings for a device")]
    async fn get_device_settings(
        &self,
        params: Parameters<DeviceIdParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_device_settings(p.device_id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_device_last_used",
        description = "Get the most recently used device"
    )]
    async fn get_device_last_used(&self) -> Result<Json<ObjectResult>, String> {
        let v = self
            .client
            .get_device_last_used()
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_primary_training_device",
        description = "Get the primary training device"
    )]
    async fn get_primary_training_device(&self) -> Result<Json<ObjectResult>, String> {
        let v = self
            .client
            .get_primary_training_device()
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    // === Gear ===

    #[tool(name = "get_gear", description = "List the user's gear (shoes, bikes, etc.)")]
    async fn get_gear(&self) -> Result<Json<ObjectResult>, String> {
        let v = self.client.get_gear().await.map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_gear_defaults",
        description = "Get default gear assignments per activity type"
    )]
    async fn get_gear_defaults(&self) -> Result<Json<ObjectResult>, String> {
        let v = self
            .client
            .get_gear_defaults()
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_gear_stats", description = "Get usage statistics for a gear item")]
    async fn get_gear_stats(
        &self,
        params: Parameters<GearUuidParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_gear_stats(&p.gear_uuid)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_gear_activities", description = "List activities using a gear item")]
    async fn get_gear_activities(
        &self,
        params: Parameters<GearActivitiesParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_gear_activities(&p.gear_uuid, p.start.unwrap_or(0), p.limit.unwrap_or(20))
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "set_gear_default",
        description = "Set or unset a gear item as default for an activity type"
    )]
    async fn set_gear_default(
        &self,
        params: Parameters<SetGearDefaultParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .set_gear_default(&p.gear_uuid, p.activity_type_pk, p.default)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    // === Goals, badges and challenges ===

    #[tool(name = "get_goals", description = "List goals filtered by status")]
    async fn get_goals(
        &self,
        params: Parameters<GoalsParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let status = p.status.as_deref().unwrap_or("active");
        let v = self
            .client
            .get_goals(status, p.start.unwrap_or(0), p.limit.unwrap_or(20))
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_earned_badges", description = "List earned badges")]
    async fn get_earned_badges(&self) -> Result<Json<ObjectResult>, String> {
        let v = self
            .client
            .get_earned_badges()
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_adhoc_challenges", description = "List historical ad-hoc challenges")]
    async fn get_adhoc_challenges(
        &self,
        params: Parameters<PaginationParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_adhoc_challenges(p.start.unwrap_or(0), p.limit.unwrap_or(20))
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_badge_challenges", description = "List completed badge challenges")]
    async fn get_badge_challenges(
        &self,
        params: Parameters<PaginationParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_badge_challenges(p.start.unwrap_or(0), p.limit.unwrap_or(20))
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_available_badge_challenges",
        description = "List badge challenges available to join"
    )]
    async fn get_available_badge_challenges(
        &self,
        params: Parameters<PaginationParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_available_badge_challenges(p.start.unwrap_or(0), p.limit.unwrap_or(20))
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_personal_records", description = "List personal records")]
    async fn get_personal_records(&self) -> Result<Json<ObjectResult>, String> {
        let v = self
            .client
            .get_personal_records()
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    // === Women's health ===

    #[tool(name = "get_pregnancy_summary", description = "Get pregnancy tracking summary")]
    async fn get_pregnancy_summary(&self) -> Result<Json<ObjectResult>, String> {
        let v = self
            .client
            .get_pregnancy_summary()
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_menstrual_data_for_date",
        description = "Get menstrual cycle data for a date"
    )]
    async fn get_menstrual_data_for_date(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_menstrual_data_for_date(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_menstrual_calendar_data",
        description = "Get menstrual cycle calendar between two dates"
    )]
    async fn get_menstrual_calendar_data(
        &self,
        params: Parameters<DateRangeParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_menstrual_calendar_data(&p.start_date, &p.end_date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    // === Workouts ===

    #[tool(name = "get_workouts", description = "List workouts from the workout library")]
    async fn get_workouts(
        &self,
        params: Parameters<PaginationParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_workouts(p.start.unwrap_or(0), p.limit.unwrap_or(20))
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "get_workout_by_id", description = "Get details for a workout")]
    async fn get_workout_by_id(
        &self,
        params: Parameters<WorkoutIdParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_workout_by_id(p.workout_id)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "download_workout", description = "Download a workout as a FIT file")]
    async fn download_workout(
        &self,
        params: Parameters<DownloadWorkoutParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let path = p.output_path.clone();
        let result = self
            .client
            .download_workout(p.workout_id, p.output_path.map(std::path::PathBuf::from))
            .await
            .map_err(|e| e.to_string())?;
        Ok(download_result(result, path))
    }

    #[tool(name = "upload_workout", description = "Upload a workout definition")]
    async fn upload_workout(
        &self,
        params: Parameters<UploadWorkoutParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .upload_workout(&p.workout)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "schedule_workout",
        description = "Schedule a library workout on a calendar date"
    )]
    async fn schedule_workout(
        &self,
        params: Parameters<ScheduleWorkoutParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .schedule_workout(p.workout_id, &p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_scheduled_workouts",
        description = "Get workouts scheduled on the calendar between two dates"
    )]
    async fn get_scheduled_workouts(
        &self,
        params: Parameters<DateRangeParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_scheduled_workouts(&p.start_date, &p.end_date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_training_plan_workouts",
        description = "Get active training plan workouts for a date"
    )]
    async fn get_training_plan_workouts(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_training_plan_workouts(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    // === Nutrition ===

    #[tool(
        name = "get_nutrition_daily_food_log",
        description = "Get food items logged on a date"
    )]
    async fn get_nutrition_daily_food_log(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_nutrition_food_log(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_nutrition_daily_meals",
        description = "Get meal summaries (with mealIds) for a date"
    )]
    async fn get_nutrition_daily_meals(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_nutrition_meals(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_nutrition_daily_settings",
        description = "Get nutrition goals and plan settings for a date"
    )]
    async fn get_nutrition_daily_settings(
        &self,
        params: Parameters<DateParam>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_nutrition_settings(&p.date)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_custom_foods",
        description = "Search or list the user's custom foods (returns foodId/servingId)"
    )]
    async fn get_custom_foods(
        &self,
        params: Parameters<CustomFoodSearchParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .get_custom_foods(
                p.search.as_deref().unwrap_or(""),
                p.start.unwrap_or(0),
                p.limit.unwrap_or(20),
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "get_custom_food_serving_units",
        description = "List valid serving units for custom foods"
    )]
    async fn get_custom_food_serving_units(&self) -> Result<Json<ObjectResult>, String> {
        let v = self
            .client
            .get_custom_food_serving_units()
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(
        name = "create_custom_food",
        description = "Create a custom food in the nutrition library"
    )]
    async fn create_custom_food(
        &self,
        params: Parameters<CustomFood>,
    ) -> Result<Json<ObjectResult>, String> {
        let food = params.0;
        let v = self
            .client
            .create_custom_food(&food)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "update_custom_food", description = "Update an existing custom food")]
    async fn update_custom_food(
        &self,
        params: Parameters<UpdateCustomFoodParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .update_custom_food(&p.food_id, &p.serving_id, &p.food)
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    #[tool(name = "log_food", description = "Log a food item to a meal on a date")]
    async fn log_food(
        &self,
        params: Parameters<LogFoodParams>,
    ) -> Result<Json<ObjectResult>, String> {
        let p = params.0;
        let v = self
            .client
            .log_food(
                &p.meal_date,
                &p.meal_time,
                p.meal_id,
                &p.food_id,
                &p.serving_id,
                p.serving_qty.unwrap_or(1.0),
            )
            .await
            .map_err(|e| e.to_string())?;
        Ok(object(v))
    }

    // === MCP Prompts ===

    /// Morning overview of activity, heart rate, stress and sleep
    #[prompt(
        name = "daily-health-check",
        description = "Review a day's health metrics and flag anything unusual"
    )]
    async fn daily_health_check(&self, params: Parameters<DatePromptParams>) -> GetPromptResult {
        let date = params
            .0
            .date
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
        prompts::daily_health_check_prompt(&date)
    }

    /// Sleep stage and overnight vitals analysis
    #[prompt(
        name = "sleep-quality-review",
        description = "Analyze sleep stages, score and overnight vitals for a night"
    )]
    async fn sleep_quality_review(&self, params: Parameters<DatePromptParams>) -> GetPromptResult {
        let date = params
            .0
            .date
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
        prompts::sleep_quality_review_prompt(&date)
    }

    /// Readiness verdict combining readiness score, status, sleep and HRV
    #[prompt(
        name = "training-readiness-review",
        description = "Assess readiness to train hard today"
    )]
    async fn training_readiness_review(
        &self,
        params: Parameters<DatePromptParams>,
    ) -> GetPromptResult {
        let date = params
            .0
            .date
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
        prompts::training_readiness_review_prompt(&date)
    }

    /// Deep dive into one activity with splits, zones and weather
    #[prompt(
        name = "activity-deep-dive",
        description = "Detailed analysis of a specific activity"
    )]
    async fn activity_deep_dive(
        &self,
        params: Parameters<ActivityDeepDivePromptParams>,
    ) -> GetPromptResult {
        prompts::activity_deep_dive_prompt(params.0.activity_id)
    }
}

impl GarminMcpHandler {
    /// Combined profile + settings payload backing the profile resource.
    async fn profile_resource_text(&self) -> McpResult<String> {
        let profile = self.client.get_social_profile().await?;
        let settings = self.client.get_user_settings().await?;
        let combined = serde_json::json!({
            "profile": profile,
            "settings": settings,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        Ok(serde_json::to_string_pretty(&combined)?)
    }
}

#[tool_handler]
#[prompt_handler(router = self.prompt_router)]
impl rmcp::ServerHandler for GarminMcpHandler {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo::new(
            rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
        )
        .with_instructions(
            "Garmin Connect MCP server - exposes activities, health metrics, \
             body composition, workouts and nutrition from a Garmin account.",
        )
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let resource = RawResource::new(PROFILE_RESOURCE_URI, "User Profile");

        let mut res = resource.no_annotation();
        res.description =
            Some("Garmin user profile with display name and account settings".to_string());
        res.mime_type = Some("application/json".to_string());

        Ok(ListResourcesResult {
            resources: vec![res],
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        if request.uri == PROFILE_RESOURCE_URI {
            let text = self
                .profile_resource_text()
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;

            Ok(ReadResourceResult::new(vec![
                ResourceContents::TextResourceContents {
                    uri: request.uri.clone(),
                    mime_type: Some("application/json".to_string()),
                    text,
                    meta: None,
                },
            ]))
        } else {
            Err(ErrorData::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            ))
        }
    }
}

#[cfg(test)]
mod tests;
