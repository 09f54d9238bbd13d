use rmcp::model::{GetPromptResult, PromptMessage, PromptMessageRole};

pub fn daily_health_check_prompt(date: &str) -> GetPromptResult {
    GetPromptResult::new(vec![PromptMessage::new_text(
        PromptMessageRole::User,
        format!(
            "Review my Garmin health data for {}.\n\nFocus on:\n1. Daily activity (steps, intensity minutes, floors climbed)\n2. Heart rate (resting HR, daily range)\n3. Stress and Body Battery levels through the day\n4. Sleep from the previous night\n5. Anything unusual compared to a typical day\n\nUse get_user_summary, get_heart_rates, get_stress_data, get_body_battery and get_sleep_data for {}. Present a short, readable summary with any recommendations.",
            date, date
        ),
    )])
    .with_description(format!("Daily health review for {}", date))
}

pub fn sleep_quality_review_prompt(date: &str) -> GetPromptResult {
    GetPromptResult::new(vec![PromptMessage::new_text(
        PromptMessageRole::User,
        format!(
            "Analyze my sleep for the night ending {}.\n\nInclude:\n1. Total sleep time and sleep stages (deep, light, REM, awake)\n2. Sleep score and restlessness\n3. Overnight respiration and SpO2 (if available)\n4. Overnight HRV\n5. How this night compares to my needs and what to adjust\n\nUse get_sleep_data for the stages, get_respiration_data and get_spo2_data for overnight vitals, and get_hrv_data for recovery context.",
            date
        ),
    )])
    .with_description(format!("Sleep quality analysis for the night of {}", date))
}

pub fn training_readiness_review_prompt(date: &str) -> GetPromptResult {
    GetPromptResult::new(vec![PromptMessage::new_text(
        PromptMessageRole::User,
        format!(
            "Assess whether I should train hard on {}.\n\nInclude:\n1. Training readiness score and its contributors\n2. Current training status (load, VO2max trend)\n3. Last night's sleep and HRV\n4. Body Battery level\n5. A clear recommendation: hard session, easy session, or rest\n\nUse get_training_readiness, get_training_status, get_sleep_data, get_hrv_data and get_body_battery, then give concise guidance.",
            date
        ),
    )])
    .with_description(format!("Training readiness assessment for {}", date))
}

pub fn activity_deep_dive_prompt(activity_id: u64) -> GetPromptResult {
    GetPromptResult::new(vec![PromptMessage::new_text(
        PromptMessageRole::User,
        format!(
            "Provide a comprehensive analysis of activity {}.\n\nInclude:\n1. Basic metrics (distance, time, pace/speed, elevation, calories)\n2. Heart rate data and time in zones\n3. Lap/split structure\n4. Weather conditions during the activity\n5. Performance insights and comparison to recent similar activities\n\nUse get_activity for the summary, get_activity_splits for lap structure, get_activity_hr_in_timezones for zone distribution, and get_activity_weather for conditions. Compare against get_activities output for context.",
            activity_id
        ),
    )])
    .with_description(format!("Comprehensive analysis of activity {}", activity_id))
}
