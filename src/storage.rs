//! Local persistence: user preferences and run exports.
//!
//! Only user preferences survive between invocations; run state is always
//! re-fetched from the service.

use crate::model::{Lead, SearchParameters, SearchRun, DEFAULT_QUALITY_LEVEL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "leadgen-search";
const PREFERENCES_FILE: &str = "preferences.json";

/// Persisted user preferences. Kept apart from transient run state.
///
/// `poll_interval` and `timeout` are humantime strings (`"2s"`, `"500ms"`) and
/// apply when the matching command-line flag is not given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_quality")]
    pub quality_level: f64,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<Duration>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

fn default_quality() -> f64 {
    DEFAULT_QUALITY_LEVEL
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            quality_level: DEFAULT_QUALITY_LEVEL,
            poll_interval: None,
            timeout: None,
        }
    }
}

impl Preferences {
    /// Copy of these preferences with the quality level taken from `params`.
    pub fn with_parameters(&self, params: &SearchParameters) -> Self {
        Self {
            quality_level: params.quality_level(),
            ..self.clone()
        }
    }

    /// Search parameters seeded from the saved preferences (no manual override).
    pub fn to_parameters(&self) -> SearchParameters {
        SearchParameters::new(self.quality_level, None)
    }
}

fn base_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn preferences_path() -> PathBuf {
    base_dir().join(PREFERENCES_FILE)
}

/// Load preferences from `path`; a missing file yields defaults.
pub fn load_preferences_from(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        return Ok(Preferences::default());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("read preferences {}", path.display()))?;
    let prefs: Preferences = serde_json::from_str(&data)
        .with_context(|| format!("parse preferences {}", path.display()))?;
    Ok(prefs)
}

pub fn save_preferences_to(path: &Path, prefs: &Preferences) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("create preferences dir")?;
    }
    let data = serde_json::to_string_pretty(prefs)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn load_preferences() -> Result<Preferences> {
    load_preferences_from(&preferences_path())
}

pub fn save_preferences(prefs: &Preferences) -> Result<PathBuf> {
    let path = preferences_path();
    save_preferences_to(&path, prefs)?;
    Ok(path)
}

/// Write the full run snapshot as pretty JSON.
pub fn export_json(path: &Path, run: &SearchRun) -> Result<()> {
    let data = serde_json::to_string_pretty(run)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

const CSV_HEADER: [&str; 10] = [
    "Name",
    "Email",
    "Phone",
    "Company",
    "Company Size",
    "Intent Score",
    "Source",
    "Status",
    "Accuracy",
    "Source URL",
];

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render leads as CSV, one row per lead.
pub fn leads_csv(leads: &[Lead]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for lead in leads {
        let row = [
            csv_field(&lead.name),
            csv_field(lead.email.as_deref().unwrap_or("")),
            csv_field(lead.phone.as_deref().unwrap_or("")),
            csv_field(&lead.company),
            lead.company_size.as_str().to_string(),
            format!("{:.1}", lead.intent_score),
            csv_field(&lead.source),
            lead.status.as_str().to_string(),
            lead.accuracy.map(|a| a.as_str()).unwrap_or("").to_string(),
            csv_field(lead.source_url.as_deref().unwrap_or("")),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn export_csv(path: &Path, leads: &[Lead]) -> Result<()> {
    std::fs::write(path, leads_csv(leads)).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Lead, LeadAccuracy, LeadStatus, SearchStatus};

    fn sample_run() -> SearchRun {
        SearchRun {
            id: "s1".into(),
            client_profile_id: "p1".into(),
            status: SearchStatus::Completed,
            progress: 1.0,
            sources: vec![],
            leads: vec![Lead {
                id: "l1".into(),
                name: "Doe, Jane".into(),
                email: Some("jane@example.com".into()),
                phone: None,
                company: "Say \"Hi\" Ltd".into(),
                company_size: crate::model::CompanySize::Small,
                source: "clutch".into(),
                source_url: None,
                intent_score: 71.26,
                score_breakdown: Default::default(),
                status: LeadStatus::Contacted,
                accuracy: Some(LeadAccuracy::Verified),
                notes: None,
            }],
            error_message: None,
            started_at: None,
            completed_at: None,
            quality_setting: Some(0.7),
        }
    }

    #[test]
    fn missing_preferences_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = load_preferences_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn preferences_survive_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(PREFERENCES_FILE);
        let prefs = Preferences {
            quality_level: 0.25,
            poll_interval: Some(Duration::from_secs(3)),
            ..Default::default()
        };
        save_preferences_to(&path, &prefs).unwrap();
        assert_eq!(load_preferences_from(&path).unwrap(), prefs);
    }

    #[test]
    fn durations_are_humantime_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PREFERENCES_FILE);
        std::fs::write(
            &path,
            r#"{ "quality_level": 0.4, "poll_interval": "2s 500ms", "timeout": "1m" }"#,
        )
        .unwrap();
        let prefs = load_preferences_from(&path).unwrap();
        assert_eq!(prefs.poll_interval, Some(Duration::from_millis(2500)));
        assert_eq!(prefs.timeout, Some(Duration::from_secs(60)));

        let written = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(written, serde_json::json!({ "quality_level": 0.7 }));
    }

    #[test]
    fn saving_quality_keeps_other_preferences() {
        let prefs = Preferences {
            timeout: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        let updated = prefs.with_parameters(&SearchParameters::new(0.2, None));
        assert_eq!(updated.quality_level, 0.2);
        assert_eq!(updated.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn out_of_range_saved_quality_is_clamped_on_use() {
        let prefs = Preferences {
            quality_level: 4.0,
            ..Default::default()
        };
        assert_eq!(prefs.to_parameters().quality_level(), 1.0);
    }

    #[test]
    fn csv_quotes_fields_that_need_it() {
        let csv = leads_csv(&sample_run().leads);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER.join(","));
        assert_eq!(
            lines.next().unwrap(),
            "\"Doe, Jane\",jane@example.com,,\"Say \"\"Hi\"\" Ltd\",small,71.3,clutch,contacted,verified,"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn json_export_writes_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        export_json(&path, &sample_run()).unwrap();
        let back: SearchRun =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.leads.len(), 1);
    }
}
