use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use garmin_client::{
    ActivityDownloadFormat, CustomFood, GarminClient, GarminError, SocialProfile,
};

use super::*;

/// Mock that echoes forwarded parameters back in the payload, so the tests
/// can assert each tool calls the right client method with the right values.
struct MockClient;

#[async_trait]
impl GarminClient for MockClient {
    async fn get_social_profile(&self) -> Result<SocialProfile, GarminError> {
        Ok(SocialProfile {
            id: Some(111),
            profile_id: Some(98765),
            display_name: "a1b2c3d4".into(),
            full_name: Some("Test Athlete".into()),
        })
    }
    async fn get_user_settings(&self) -> Result<Value, GarminError> {
        Ok(json!({ "userData": { "measurementSystem": "metric" } }))
    }
    async fn get_full_name(&self) -> Result<String, GarminError> {
        Ok("Test Athlete".into())
    }
    async fn get_unit_system(&self) -> Result<String, GarminError> {
        Ok("metric".into())
    }
    async fn get_user_summary(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "endpoint": "user_summary", "date": date }))
    }
    async fn get_stats_and_body(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "endpoint": "stats_and_body", "date": date }))
    }
    async fn get_steps_data(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_daily_steps(&self, start_date: &str, end_date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "start": start_date, "end": end_date }))
    }
    async fn get_heart_rates(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_rhr_day(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_sleep_data(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "endpoint": "sleep", "date": date }))
    }
    async fn get_stress_data(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_body_battery(&self, start_date: &str, end_date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "start": start_date, "end": end_date }))
    }
    async fn get_body_battery_events(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_respiration_data(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_spo2_data(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_max_metrics(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_hydration_data(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn add_hydration_data(&self, value_ml: f64, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "value_ml": value_ml, "date": date }))
    }
    async fn get_floors(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_intensity_minutes(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_blood_pressure(&self, start_date: &str, end_date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "start": start_date, "end": end_date }))
    }
    async fn get_training_readiness(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_training_status(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_hrv_data(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "endpoint": "hrv", "date": date }))
    }
    async fn get_fitnessage_data(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_hill_score(&self, start_date: &str, end_date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "start": start_date, "end": end_date }))
    }
    async fn get_endurance_score(&self, start_date: &str, end_date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "start": start_date, "end": end_date }))
    }
    async fn get_race_predictions(&self) -> Result<Value, GarminError> {
        Ok(json!([{ "raceType": "5K" }]))
    }
    async fn get_progress_summary_between_dates(
        &self,
        start_date: &str,
        end_date: &str,
        metric: &str,
    ) -> Result<Value, GarminError> {
        Ok(json!({ "start": start_date, "end": end_date, "metric": metric }))
    }
    async fn get_lactate_threshold(
        &self,
        latest: bool,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Value, GarminError> {
        Ok(json!({ "latest": latest, "start": start_date, "end": end_date }))
    }
    async fn request_reload(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_activities(&self, start: u32, limit: u32) -> Result<Value, GarminError> {
        Ok(json!({ "start": start, "limit": limit }))
    }
    async fn get_activities_by_date(
        &self,
        start_date: &str,
        end_date: &str,
        activity_type: Option<&str>,
    ) -> Result<Value, GarminError> {
        Ok(json!({ "start": start_date, "end": end_date, "type": activity_type }))
    }
    async fn get_last_activity(&self) -> Result<Value, GarminError> {
        Ok(json!({ "activityId": 12345678901_u64 }))
    }
    async fn get_activity(&self, activity_id: u64) -> Result<Value, GarminError> {
        if activity_id == 0 {
            return Err(GarminError::NotFound("no activity with id 0".into()));
        }
        Ok(json!({ "activityId": activity_id }))
    }
    async fn get_activity_splits(&self, activity_id: u64) -> Result<Value, GarminError> {
        Ok(json!({ "activityId": activity_id }))
    }
    async fn get_activity_weather(&self, activity_id: u64) -> Result<Value, GarminError> {
        Ok(json!({ "activityId": activity_id }))
    }
    async fn get_activity_hr_in_timezones(&self, activity_id: u64) -> Result<Value, GarminError> {
        Ok(json!({ "activityId": activity_id }))
    }
    async fn get_activity_gear(&self, activity_id: u64) -> Result<Value, GarminError> {
        Ok(json!({ "activityId": activity_id }))
    }
    async fn get_activity_types(&self) -> Result<Value, GarminError> {
        Ok(json!([{ "typeKey": "running" }]))
    }
    async fn download_activity(
        &self,
        _activity_id: u64,
        _format: ActivityDownloadFormat,
        output_path: Option<PathBuf>,
    ) -> Result<Option<String>, GarminError> {
        Ok(match output_path {
            Some(_) => None,
            None => Some("QUJD".into()),
        })
    }
    async fn get_body_composition(&self, start_date: &str, end_date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "start": start_date, "end": end_date }))
    }
    async fn get_weigh_ins(&self, start_date: &str, end_date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "start": start_date, "end": end_date }))
    }
    async fn get_daily_weigh_ins(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn add_weigh_in(&self, weight_kg: f64, date: Option<&str>) -> Result<Value, GarminError> {
        Ok(json!({ "weight": weight_kg, "date": date }))
    }
    async fn add_body_composition(
        &self,
        date: &str,
        weight_kg: f64,
        percent_fat: Option<f64>,
        _percent_hydration: Option<f64>,
        _bone_mass: Option<f64>,
        _muscle_mass: Option<f64>,
        _bmi: Option<f64>,
    ) -> Result<Value, GarminError> {
        Ok(json!({ "date": date, "weight": weight_kg, "percent_fat": percent_fat }))
    }
    async fn delete_weigh_in(&self, _weight_pk: i64, _date: &str) -> Result<(), GarminError> {
        Ok(())
    }
    async fn get_devices(&self) -> Result<Value, GarminError> {
        Ok(json!([{ "deviceId": 999 }]))
    }
    async fn get_device_settings(&self, device_id: u64) -> Result<Value, GarminError> {
        Ok(json!({ "deviceId": device_id }))
    }
    async fn get_device_last_used(&self) -> Result<Value, GarminError> {
        Ok(json!({ "deviceId": 999 }))
    }
    async fn get_primary_training_device(&self) -> Result<Value, GarminError> {
        Ok(json!({ "deviceId": 999 }))
    }
    async fn get_gear(&self) -> Result<Value, GarminError> {
        Ok(json!([{ "uuid": "gear-1" }]))
    }
    async fn get_gear_defaults(&self) -> Result<Value, GarminError> {
        Ok(json!([]))
    }
    async fn get_gear_stats(&self, gear_uuid: &str) -> Result<Value, GarminError> {
        Ok(json!({ "uuid": gear_uuid }))
    }
    async fn get_gear_activities(
        &self,
        gear_uuid: &str,
        start: u32,
        limit: u32,
    ) -> Result<Value, GarminError> {
        Ok(json!({ "uuid": gear_uuid, "start": start, "limit": limit }))
    }
    async fn set_gear_default(
        &self,
        gear_uuid: &str,
        activity_type_pk: u64,
        default: bool,
    ) -> Result<Value, GarminError> {
        Ok(json!({ "uuid": gear_uuid, "typePk": activity_type_pk, "default": default }))
    }
    async fn get_goals(&self, status: &str, start: u32, limit: u32) -> Result<Value, GarminError> {
        Ok(json!({ "status": status, "start": start, "limit": limit }))
    }
    async fn get_earned_badges(&self) -> Result<Value, GarminError> {
        Ok(json!([]))
    }
    async fn get_adhoc_challenges(&self, start: u32, limit: u32) -> Result<Value, GarminError> {
        Ok(json!({ "start": start, "limit": limit }))
    }
    async fn get_badge_challenges(&self, start: u32, limit: u32) -> Result<Value, GarminError> {
        Ok(json!({ "start": start, "limit": limit }))
    }
    async fn get_available_badge_challenges(
        &self,
        start: u32,
        limit: u32,
    ) -> Result<Value, GarminError> {
        Ok(json!({ "start": start, "limit": limit }))
    }
    async fn get_personal_records(&self) -> Result<Value, GarminError> {
        Ok(json!([]))
    }
    async fn get_pregnancy_summary(&self) -> Result<Value, GarminError> {
        Ok(json!({}))
    }
    async fn get_menstrual_data_for_date(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_menstrual_calendar_data(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value, GarminError> {
        Ok(json!({ "start": start_date, "end": end_date }))
    }
    async fn get_workouts(&self, start: u32, limit: u32) -> Result<Value, GarminError> {
        Ok(json!({ "start": start, "limit": limit }))
    }
    async fn get_workout_by_id(&self, workout_id: u64) -> Result<Value, GarminError> {
        Ok(json!({ "workoutId": workout_id }))
    }
    async fn download_workout(
        &self,
        _workout_id: u64,
        output_path: Option<PathBuf>,
    ) -> Result<Option<String>, GarminError> {
        Ok(match output_path {
            Some(_) => None,
            None => Some("RklU".into()),
        })
    }
    async fn upload_workout(&self, workout: &Value) -> Result<Value, GarminError> {
        Ok(workout.clone())
    }
    async fn schedule_workout(&self, workout_id: u64, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "workoutId": workout_id, "date": date }))
    }
    async fn get_scheduled_workouts(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> Result<Value, GarminError> {
        Ok(json!({ "start": start_date, "end": end_date }))
    }
    async fn get_training_plan_workouts(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_nutrition_food_log(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_nutrition_meals(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_nutrition_settings(&self, date: &str) -> Result<Value, GarminError> {
        Ok(json!({ "date": date }))
    }
    async fn get_custom_foods(&self, search: &str, start: u32, limit: u32) -> Result<Value, GarminError> {
        Ok(json!({ "search": search, "start": start, "limit": limit }))
    }
    async fn get_custom_food_serving_units(&self) -> Result<Value, GarminError> {
        Ok(json!(["G", "ML", "OZ"]))
    }
    async fn create_custom_food(&self, food: &CustomFood) -> Result<Value, GarminError> {
        Ok(json!({ "foodName": food.food_name, "calories": food.calories }))
    }
    async fn update_custom_food(
        &self,
        food_id: &str,
        serving_id: &str,
        food: &CustomFood,
    ) -> Result<Value, GarminError> {
        Ok(json!({ "foodId": food_id, "servingId": serving_id, "foodName": food.food_name }))
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
        Ok(json!({
            "mealDate": meal_date,
            "mealTime": meal_time,
            "mealId": meal_id,
            "foodId": food_id,
            "servingId": serving_id,
            "servingQty": serving_qty,
        }))
    }
}

fn handler() -> GarminMcpHandler {
    GarminMcpHandler::new(Arc::new(MockClient))
}

#[tokio::test]
async fn handler_registers_all_tools() {
    let handler = handler();
    let tools = handler.tool_router.list_all();

    for name in [
        "get_full_name",
        "get_unit_system",
        "get_user_profile",
        "get_userprofile_settings",
        "get_user_summary",
        "get_stats_and_body",
        "get_steps_data",
        "get_daily_steps",
        "get_heart_rates",
        "get_rhr_day",
        "get_sleep_data",
        "get_stress_data",
        "get_body_battery",
        "get_body_battery_events",
        "get_respiration_data",
        "get_spo2_data",
        "get_max_metrics",
        "get_hydration_data",
        "add_hydration_data",
        "get_floors",
        "get_intensity_minutes",
        "get_blood_pressure",
        "get_training_readiness",
        "get_training_status",
        "get_hrv_data",
        "get_fitnessage_data",
        "get_hill_score",
        "get_endurance_score",
        "get_race_predictions",
        "get_progress_summary_between_dates",
        "get_lactate_threshold",
        "request_reload",
        "get_activities",
        "get_activities_by_date",
        "get_last_activity",
        "get_activity",
        "get_activity_splits",
        "get_activity_weather",
        "get_activity_hr_in_timezones",
        "get_activity_gear",
        "get_activity_types",
        "download_activity",
        "get_body_composition",
        "get_weigh_ins",
        "get_daily_weigh_ins",
        "add_weigh_in",
        "add_body_composition",
        "delete_weigh_in",
        "get_devices",
        "get_device_settings",
        "get_device_last_used",
        "get_primary_training_device",
        "get_gear",
        "get_gear_defaults",
        "get_gear_stats",
        "get_gear_activities",
        "set_gear_default",
        "get_goals",
        "get_earned_badges",
        "get_adhoc_challenges",
        "get_badge_challenges",
        "get_available_badge_challenges",
        "get_personal_records",
        "get_pregnancy_summary",
        "get_menstrual_data_for_date",
        "get_menstrual_calendar_data",
        "get_workouts",
        "get_workout_by_id",
        "download_workout",
        "upload_workout",
        "schedule_workout",
        "get_scheduled_workouts",
        "get_training_plan_workouts",
        "get_nutrition_daily_food_log",
        "get_nutrition_daily_meals",
        "get_nutrition_daily_settings",
        "get_custom_foods",
        "get_custom_food_serving_units",
        "create_custom_food",
        "update_custom_food",
        "log_food",
    ] {
        assert!(
            tools.iter().any(|t| t.name == name),
            "tool {name} is not registered"
        );
    }
    assert_eq!(handler.tool_count(), 81, "Should register 81 tools");
}

#[tokio::test]
async fn profile_tools_return_typed_results() {
    let handler = handler();

    let name = handler.get_full_name().await.expect("full name");
    assert_eq!(name.0.full_name, "Test Athlete");

    let units = handler.get_unit_system().await.expect("unit system");
    assert_eq!(units.0.unit_system, "metric");

    let profile = handler.get_user_profile().await.expect("profile");
    assert_eq!(profile.0.display_name, "a1b2c3d4");
}

#[tokio::test]
async fn date_tools_forward_the_date() {
    let handler = handler();
    let params = Parameters(DateParam {
        date: "2024-01-15".into(),
    });
    let res = handler.get_sleep_data(params).await.expect("sleep");
    assert_eq!(res.0.value["date"], "2024-01-15");
    assert_eq!(res.0.value["endpoint"], "sleep");

    let res = handler
        .get_hrv_data(Parameters(DateParam {
            date: "2024-01-15".into(),
        }))
        .await
        .expect("hrv");
    assert_eq!(res.0.value["endpoint"], "hrv");
}

#[tokio::test]
async fn range_tools_forward_both_dates() {
    let handler = handler();
    let res = handler
        .get_body_battery(Parameters(DateRangeParams {
            start_date: "2024-01-08".into(),
            end_date: "2024-01-15".into(),
        }))
        .await
        .expect("body battery");
    assert_eq!(res.0.value["start"], "2024-01-08");
    assert_eq!(res.0.value["end"], "2024-01-15");
}

#[tokio::test]
async fn pagination_defaults_are_applied() {
    let handler = handler();
    let res = handler
        .get_activities(Parameters(PaginationParams {
            start: None,
            limit: None,
        }))
        .await
        .expect("activities");
    assert_eq!(res.0.value["start"], 0);
    assert_eq!(res.0.value["limit"], 20);

    let res = handler
        .get_activities(Parameters(PaginationParams {
            start: Some(40),
            limit: Some(10),
        }))
        .await
        .expect("activities");
    assert_eq!(res.0.value["start"], 40);
    assert_eq!(res.0.value["limit"], 10);
}

#[tokio::test]
async fn goals_status_defaults_to_active() {
    let handler = handler();
    let res = handler
        .get_goals(Parameters(GoalsParams {
            status: None,
            start: None,
            limit: None,
        }))
        .await
        .expect("goals");
    assert_eq!(res.0.value["status"], "active");
}

#[tokio::test]
async fn lactate_threshold_defaults_to_latest() {
    let handler = handler();
    let res = handler
        .get_lactate_threshold(Parameters(LactateThresholdParams {
            latest: None,
            start_date: None,
            end_date: None,
        }))
        .await
        .expect("lactate");
    assert_eq!(res.0.value["latest"], true);
}

#[tokio::test]
async fn upstream_errors_surface_as_readable_strings() {
    let handler = handler();
    let err = handler
        .get_activity(Parameters(ActivityIdParam { activity_id: 0 }))
        .await
        .unwrap_err();
    assert!(err.contains("not found"));
    assert!(err.contains("no activity with id 0"));
}

#[tokio::test]
async fn download_tools_report_base64_or_disk() {
    let handler = handler();

    let res = handler
        .download_activity(Parameters(DownloadActivityParams {
            activity_id: 12345,
            format: Some(ActivityDownloadFormat::Tcx),
            output_path: None,
        }))
        .await
        .expect("download");
    assert_eq!(res.0.value["base64"], "QUJD");

    let res = handler
        .download_workout(Parameters(DownloadWorkoutParams {
            workout_id: 777,
            output_path: Some("/tmp/workout.fit".into()),
        }))
        .await
        .expect("download");
    assert_eq!(res.0.value["written_to_disk"], true);
    assert_eq!(res.0.value["path"], "/tmp/workout.fit");
}

#[tokio::test]
async fn delete_weigh_in_reports_deletion() {
    let handler = handler();
    let res = handler
        .delete_weigh_in(Parameters(DeleteWeighInParams {
            weight_pk: 1715,
            date: "2024-01-15".into(),
        }))
        .await
        .expect("delete");
    assert_eq!(res.0.value["deleted"], true);
}

#[tokio::test]
async fn log_food_defaults_to_one_serving() {
    let handler = handler();
    let res = handler
        .log_food(Parameters(LogFoodParams {
            meal_date: "2024-01-15".into(),
            meal_time: "12:30:00".into(),
            meal_id: 5,
            food_id: "food-1".into(),
            serving_id: "serving-1".into(),
            serving_qty: None,
        }))
        .await
        .expect("log food");
    assert_eq!(res.0.value["servingQty"], 1.0);
    assert_eq!(res.0.value["mealId"], 5);
}

#[tokio::test]
async fn custom_food_tools_forward_ids() {
    let handler = handler();
    let food = CustomFood {
        food_name: "Oats".into(),
        calories: 380.0,
        serving_unit: None,
        number_of_units: None,
        carbs: None,
        protein: None,
        fat: None,
        fiber: None,
        sugar: None,
        saturated_fat: None,
        sodium: None,
        cholesterol: None,
        potassium: None,
    };

    let res = handler
        .create_custom_food(Parameters(food.clone()))
        .await
        .expect("create");
    assert_eq!(res.0.value["foodName"], "Oats");

    let res = handler
        .update_custom_food(Parameters(UpdateCustomFoodParams {
            food_id: "food-1".into(),
            serving_id: "serving-1".into(),
            food,
        }))
        .await
        .expect("update");
    assert_eq!(res.0.value["foodId"], "food-1");
    assert_eq!(res.0.value["servingId"], "serving-1");
}

#[tokio::test]
async fn prompts_are_registered() {
    let handler = handler();
    let prompts = handler.prompt_router.list_all();
    assert!(prompts.iter().any(|p| p.name == "daily-health-check"));
    assert!(prompts.iter().any(|p| p.name == "sleep-quality-review"));
    assert!(prompts.iter().any(|p| p.name == "training-readiness-review"));
    assert!(prompts.iter().any(|p| p.name == "activity-deep-dive"));
    assert_eq!(handler.prompt_count(), 4, "Should have exactly 4 prompts");
}

#[tokio::test]
async fn profile_resource_combines_profile_and_settings() {
    let handler = handler();
    let text = handler.profile_resource_text().await.expect("resource");
    let parsed: Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(parsed["profile"]["displayName"], "a1b2c3d4");
    assert_eq!(parsed["settings"]["userData"]["measurementSystem"], "metric");
    assert!(parsed["timestamp"].is_string());
}
