//! Declarative selector tables for the target UI
//!
//! Every DOM signpost the workflow relies on lives here, not in control
//! flow. The dashboard's markup has shifted several times (image prompt,
//! then a text heading, then a data-action button); when it shifts again,
//! the fix is editing this table or passing `--markers custom.json`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Signposts for the multi-step sign-in flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginMarkers {
    /// Sign-in entry point
    pub sign_in_url: String,
    /// Identity (email) input
    pub identity_input: String,
    /// Control advancing from identity to secret entry
    pub continue_button: String,
    /// Secret (password) input
    pub secret_input: String,
    /// Form submission control
    pub submit_button: String,
    /// Element that only renders once authentication has succeeded
    pub confirmation: String,
}

impl Default for LoginMarkers {
    fn default() -> Self {
        Self {
            sign_in_url: "https://accounts.gaggleamp.com/sign_in".to_string(),
            identity_input: "#user_email".to_string(),
            continue_button: "#continue-button".to_string(),
            secret_input: "#user_password".to_string(),
            submit_button: "input[type=\"submit\"]".to_string(),
            confirmation: ".ga3-recommended-channels__title".to_string(),
        }
    }
}

/// Signposts for classifying the activity dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityMarkers {
    /// Container rendered when the queue is empty
    pub empty_container: String,
    /// Heading inside the empty-state container
    pub empty_heading: String,
    /// Text the heading must contain for the empty state to be authoritative
    pub empty_text: String,
    /// Control that triggers the bulk-schedule action
    pub action_button: String,
    /// Select-all control that must be checked before the action is valid,
    /// if the current markup has one
    pub select_all: Option<String>,
}

impl Default for ActivityMarkers {
    fn default() -> Self {
        Self {
            empty_container: ".ga3-no-items-prompt".to_string(),
            empty_heading: ".no-items-heading".to_string(),
            empty_text: "All Caught Up!".to_string(),
            action_button:
                "button[data-action=\"click->ga3--widgets--bulk-schedule#bulkSchedule\"]"
                    .to_string(),
            select_all: Some(
                "input[data-action=\"change->ga3--widgets--bulk-schedule#toggleAll\"]".to_string(),
            ),
        }
    }
}

/// The full marker set for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSet {
    pub login: LoginMarkers,
    pub activity: ActivityMarkers,
}

impl MarkerSet {
    /// Load a marker set from a JSON file; absent fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_dashboard_selectors() {
        let markers = MarkerSet::default();
        assert_eq!(markers.login.identity_input, "#user_email");
        assert_eq!(markers.activity.empty_text, "All Caught Up!");
        assert!(markers.activity.action_button.contains("bulk-schedule"));
        assert!(markers.activity.select_all.is_some());
    }

    #[test]
    fn test_partial_json_override() {
        let json = r#"{
            "activity": {
                "action_button": "button.schedule-all",
                "select_all": null
            }
        }"#;

        let markers: MarkerSet = serde_json::from_str(json).unwrap();
        assert_eq!(markers.activity.action_button, "button.schedule-all");
        assert!(markers.activity.select_all.is_none());
        // Untouched sections keep defaults
        assert_eq!(markers.login.continue_button, "#continue-button");
        assert_eq!(markers.activity.empty_heading, ".no-items-heading");
    }

    #[test]
    fn test_round_trip() {
        let markers = MarkerSet::default();
        let json = serde_json::to_string(&markers).unwrap();
        let back: MarkerSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.activity.action_button, markers.activity.action_button);
        assert_eq!(back.login.sign_in_url, markers.login.sign_in_url);
    }
}
