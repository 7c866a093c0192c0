use crate::metrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use time::{Date, OffsetDateTime};

/// Default quality level used when no preference has been saved.
pub const DEFAULT_QUALITY_LEVEL: f64 = 0.7;

/// Connection settings for the remote search service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub user_agent: String,
}

/// Service timestamps. RFC 3339 is accepted as is; ISO 8601 without an offset
/// (what the service writes for naive UTC datetimes) is read as UTC.
mod timestamp {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;
    use time::{OffsetDateTime, PrimitiveDateTime};

    pub fn parse(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
        OffsetDateTime::parse(raw, &Rfc3339).or_else(|_| {
            let naive = format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
            );
            PrimitiveDateTime::parse(raw, naive).map(PrimitiveDateTime::assume_utc)
        })
    }

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::option::serialize(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| parse(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Client-visible lifecycle status of a search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    #[default]
    Idle,
    // The service reports queued and running searches separately; both are in flight here.
    #[serde(alias = "pending", alias = "in_progress")]
    Searching,
    Completed,
    Cancelled,
    #[serde(alias = "failed")]
    Error,
}

impl SearchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SearchStatus::Completed | SearchStatus::Cancelled | SearchStatus::Error
        )
    }

    /// Wire value, used for query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            SearchStatus::Idle => "idle",
            SearchStatus::Searching => "searching",
            SearchStatus::Completed => "completed",
            SearchStatus::Cancelled => "cancelled",
            SearchStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    #[default]
    Pending,
    Querying,
    Success,
    Failed,
}

/// State of one lead source, reported incrementally across polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceState {
    pub name: String,
    #[serde(default)]
    pub status: SourceStatus,
    #[serde(default)]
    pub leads_found: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Solo,
    Small,
    Medium,
    Enterprise,
    #[default]
    Unknown,
}

impl CompanySize {
    pub fn as_str(self) -> &'static str {
        match self {
            CompanySize::Solo => "solo",
            CompanySize::Small => "small",
            CompanySize::Medium => "medium",
            CompanySize::Enterprise => "enterprise",
            CompanySize::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Responded,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Responded => "responded",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadAccuracy {
    Verified,
    EmailBounced,
    PhoneInvalid,
    WrongPerson,
    CompanyMismatch,
}

impl LeadAccuracy {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadAccuracy::Verified => "verified",
            LeadAccuracy::EmailBounced => "email_bounced",
            LeadAccuracy::PhoneInvalid => "phone_invalid",
            LeadAccuracy::WrongPerson => "wrong_person",
            LeadAccuracy::CompanyMismatch => "company_mismatch",
        }
    }
}

/// A lead discovered by a search run. Scores are computed server-side and treated as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub company_size: CompanySize,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub intent_score: f64,
    #[serde(default)]
    pub score_breakdown: BTreeMap<String, f64>,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub accuracy: Option<LeadAccuracy>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Snapshot of one search run as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRun {
    pub id: String,
    pub client_profile_id: String,
    pub status: SearchStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub sources: Vec<SourceState>,
    #[serde(default)]
    pub leads: Vec<Lead>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default, with = "timestamp")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(default, with = "timestamp")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub quality_setting: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideMode {
    /// Merge manual criteria with the profile's inferred criteria.
    #[default]
    Supplement,
    /// Use only the manual criteria.
    Replace,
}

/// User-supplied filter criteria layered over a client profile's inferred criteria.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManualOverride {
    pub mode: OverrideMode,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub company_size: Option<CompanySize>,
    #[serde(default)]
    pub budget_min: Option<f64>,
    #[serde(default)]
    pub budget_max: Option<f64>,
    #[serde(default)]
    pub industry: Option<String>,
}

/// User-controlled search input, held independently of any run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParameters {
    quality_level: f64,
    pub manual_override: Option<ManualOverride>,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            quality_level: DEFAULT_QUALITY_LEVEL,
            manual_override: None,
        }
    }
}

impl SearchParameters {
    pub fn new(quality_level: f64, manual_override: Option<ManualOverride>) -> Self {
        let mut params = Self {
            manual_override,
            ..Default::default()
        };
        params.set_quality_level(quality_level);
        params
    }

    pub fn quality_level(&self) -> f64 {
        self.quality_level
    }

    /// Store `level` clamped to `[0, 1]`. NaN leaves the current value in place.
    /// Returns the stored value.
    pub fn set_quality_level(&mut self, level: f64) -> f64 {
        if !level.is_nan() {
            self.quality_level = level.clamp(0.0, 1.0);
        }
        self.quality_level
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSearchRequest {
    pub client_profile_id: String,
    pub quality_level: f64,
    pub manual_override: Option<ManualOverride>,
}

impl CreateSearchRequest {
    pub fn new(client_profile_id: &str, params: &SearchParameters) -> Self {
        Self {
            client_profile_id: client_profile_id.to_string(),
            quality_level: params.quality_level(),
            manual_override: params.manual_override.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHistory {
    pub searches: Vec<SearchRun>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Filters for the history listing.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub status: Option<SearchStatus>,
    pub limit: Option<u32>,
}

impl HistoryQuery {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Effective page size, bounded to what the service accepts.
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

/// Partial lead update sent as a PATCH body. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeadUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<LeadAccuracy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LeadUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.accuracy.is_none() && self.notes.is_none()
    }

    /// Apply the set fields to `lead` in place.
    pub fn apply_to(&self, lead: &mut Lead) {
        if let Some(status) = self.status {
            lead.status = status;
        }
        if let Some(accuracy) = self.accuracy {
            lead.accuracy = Some(accuracy);
        }
        if let Some(notes) = self.notes.as_ref() {
            lead.notes = Some(notes.clone());
        }
    }
}

/// Sort key for lead listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSort {
    #[default]
    IntentScore,
    CreatedAt,
    Company,
    Name,
}

impl LeadSort {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadSort::IntentScore => "intent_score",
            LeadSort::CreatedAt => "created_at",
            LeadSort::Company => "company",
            LeadSort::Name => "name",
        }
    }
}

/// Filters and paging for the lead listing of the active client profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub status: Option<LeadStatus>,
    pub source: Option<String>,
    pub min_score: Option<f64>,
    pub sort_by: LeadSort,
    pub ascending: bool,
}

impl LeadQuery {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn effective_page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn effective_page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
            .clamp(1, Self::MAX_PAGE_SIZE)
    }

    /// Minimum intent score bounded to `[0, 100]`; NaN means no filter.
    pub fn effective_min_score(&self) -> Option<f64> {
        self.min_score
            .filter(|s| !s.is_nan())
            .map(|s| s.clamp(0.0, 100.0))
    }
}

fn first_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    LeadQuery::DEFAULT_PAGE_SIZE
}

/// One page of leads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadPage {
    pub leads: Vec<Lead>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl LeadPage {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadStatusChange {
    #[serde(default)]
    pub previous_status: Option<LeadStatus>,
    pub new_status: LeadStatus,
    #[serde(default, with = "timestamp")]
    pub changed_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A single lead with the run it came from and its status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDetail {
    #[serde(flatten)]
    pub lead: Lead,
    #[serde(default)]
    pub search_id: Option<String>,
    #[serde(default)]
    pub status_history: Vec<LeadStatusChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub id: String,
    pub company_name: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub is_active: bool,
}

/// Period and source filters for profile analytics. The service defaults to the last 30 days.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsQuery {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadOutcomeMetrics {
    pub total_leads: u64,
    pub status_new: u64,
    pub status_contacted: u64,
    pub status_responded: u64,
    pub status_converted: u64,
    pub status_lost: u64,
    pub accuracy_verified: u64,
    pub accuracy_email_bounced: u64,
    pub accuracy_phone_invalid: u64,
    pub accuracy_wrong_person: u64,
    pub accuracy_company_mismatch: u64,
    pub accuracy_unclassified: u64,
}

impl LeadOutcomeMetrics {
    pub fn response_rate(&self) -> f64 {
        metrics::rate(self.status_responded, self.status_contacted)
    }

    pub fn conversion_rate(&self) -> f64 {
        metrics::rate(self.status_converted, self.total_leads)
    }

    /// Verified share of the leads that received accuracy feedback.
    pub fn accuracy_rate(&self) -> f64 {
        let classified = self.accuracy_verified
            + self.accuracy_email_bounced
            + self.accuracy_phone_invalid
            + self.accuracy_wrong_person
            + self.accuracy_company_mismatch;
        metrics::rate(self.accuracy_verified, classified)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchMetrics {
    pub total_searches: u64,
    pub successful_searches: u64,
    pub failed_searches: u64,
    pub cancelled_searches: u64,
    pub avg_leads_per_search: f64,
    pub avg_sources_per_search: f64,
    pub avg_source_success_rate: f64,
}

impl SearchMetrics {
    pub fn success_rate(&self) -> f64 {
        metrics::rate(self.successful_searches, self.total_searches)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceMetrics {
    pub source: String,
    pub total_leads: u64,
    pub leads_contacted: u64,
    pub leads_responded: u64,
    pub leads_converted: u64,
    pub leads_lost: u64,
    pub avg_intent_score: f64,
}

impl SourceMetrics {
    pub fn response_rate(&self) -> f64 {
        metrics::rate(self.leads_responded, self.leads_contacted)
    }

    pub fn conversion_rate(&self) -> f64 {
        metrics::rate(self.leads_converted, self.total_leads)
    }
}

/// Outcomes of the leads whose intent score falls in one range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreCorrelation {
    pub score_range_start: f64,
    pub score_range_end: f64,
    pub total_leads: u64,
    pub converted_count: u64,
    pub lost_count: u64,
    pub responded_count: u64,
}

impl ScoreCorrelation {
    pub fn conversion_rate(&self) -> f64 {
        metrics::rate(self.converted_count, self.total_leads)
    }
}

/// Lead outcome and search analytics for the active client profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileAnalytics {
    pub profile_id: String,
    #[serde(default, with = "timestamp")]
    pub period_start: Option<OffsetDateTime>,
    #[serde(default, with = "timestamp")]
    pub period_end: Option<OffsetDateTime>,
    #[serde(default)]
    pub outcome_metrics: LeadOutcomeMetrics,
    #[serde(default)]
    pub search_metrics: SearchMetrics,
    #[serde(default)]
    pub source_metrics: Vec<SourceMetrics>,
    #[serde(default)]
    pub score_correlations: Vec<ScoreCorrelation>,
}

#[derive(Debug, Clone)]
pub enum SearchEvent {
    StatusChanged {
        search_id: Option<String>,
        status: SearchStatus,
    },
    /// Sources are read through the controller's `sources()` projection.
    Progress {
        search_id: String,
        progress: f64,
        leads_found: usize,
    },
    Info(InfoEvent),
    Finished {
        // Boxed to keep SearchEvent small; runs carry the full lead list.
        run: Box<SearchRun>,
    },
    Failed {
        message: String,
    },
    Reset,
}

/// Structured info events emitted by the controller and consumed by CLI layers.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    PollingStarted { search_id: String },
    PollingStopped { search_id: String },
    PollFailed { search_id: String, message: String },
    CancelFailed { message: String },
}

impl InfoEvent {
    /// Render a human-readable message for CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::PollingStarted { search_id } => {
                format!("Tracking search {}", search_id)
            }
            InfoEvent::PollingStopped { search_id } => {
                format!("Stopped tracking search {}", search_id)
            }
            InfoEvent::PollFailed { search_id, message } => {
                format!("Status check for {} failed (will retry): {}", search_id, message)
            }
            InfoEvent::CancelFailed { message } => format!("Cancel failed: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quality_level_is_clamped() {
        let mut params = SearchParameters::default();
        assert_eq!(params.set_quality_level(1.4), 1.0);
        assert_eq!(params.set_quality_level(-0.2), 0.0);
        assert_eq!(params.set_quality_level(0.35), 0.35);
        assert_eq!(params.set_quality_level(f64::NAN), 0.35);
        assert_eq!(SearchParameters::new(3.0, None).quality_level(), 1.0);
    }

    #[test]
    fn service_status_vocabulary_is_accepted() {
        let parse = |s: &str| serde_json::from_value::<SearchStatus>(json!(s)).unwrap();
        assert_eq!(parse("pending"), SearchStatus::Searching);
        assert_eq!(parse("in_progress"), SearchStatus::Searching);
        assert_eq!(parse("searching"), SearchStatus::Searching);
        assert_eq!(parse("failed"), SearchStatus::Error);
        assert_eq!(parse("cancelled"), SearchStatus::Cancelled);
        assert!(parse("completed").is_terminal());
        assert!(!parse("idle").is_terminal());
    }

    #[test]
    fn minimal_snapshot_decodes_with_defaults() {
        let run: SearchRun = serde_json::from_value(json!({
            "id": "s1",
            "client_profile_id": "p1",
            "status": "searching",
            "started_at": "2025-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(run.progress, 0.0);
        assert!(run.leads.is_empty());
        assert!(run.sources.is_empty());
        assert!(run.started_at.is_some());
        assert!(run.completed_at.is_none());
    }

    #[test]
    fn naive_service_timestamps_are_read_as_utc() {
        let run: SearchRun = serde_json::from_value(json!({
            "id": "s1",
            "client_profile_id": "p1",
            "status": "in_progress",
            "started_at": "2025-03-01T10:00:00.123456",
            "completed_at": null
        }))
        .unwrap();
        let started = run.started_at.unwrap();
        assert_eq!(started.offset(), time::UtcOffset::UTC);
        assert_eq!(started.microsecond(), 123_456);
        assert_eq!(run.status, SearchStatus::Searching);
        assert!(run.completed_at.is_none());

        let whole_seconds = timestamp::parse("2025-03-01T10:00:00").unwrap();
        assert_eq!(whole_seconds.unix_timestamp(), started.unix_timestamp());
        let with_offset = timestamp::parse("2025-03-01T12:00:00+02:00").unwrap();
        assert_eq!(with_offset.unix_timestamp(), whole_seconds.unix_timestamp());
        assert!(timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn timestamps_serialize_as_rfc3339() {
        let run: SearchRun = serde_json::from_value(json!({
            "id": "s1",
            "client_profile_id": "p1",
            "status": "completed",
            "completed_at": "2025-03-01T10:00:00"
        }))
        .unwrap();
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["completed_at"], json!("2025-03-01T10:00:00Z"));
    }

    #[test]
    fn lead_detail_keeps_lead_fields_and_history() {
        let detail: LeadDetail = serde_json::from_value(json!({
            "id": "l1",
            "name": "Jane",
            "company": "Acme",
            "source": "reddit",
            "intent_score": 81.5,
            "score_breakdown": { "keyword_score": 30.0 },
            "status": "contacted",
            "search_id": "s1",
            "raw_data": { "ignored": true },
            "created_at": "2025-03-01T10:00:00.5",
            "status_history": [
                { "previous_status": "new", "new_status": "contacted", "changed_at": "2025-03-02T09:00:00" }
            ]
        }))
        .unwrap();
        assert_eq!(detail.lead.id, "l1");
        assert_eq!(detail.lead.status, LeadStatus::Contacted);
        assert_eq!(detail.search_id.as_deref(), Some("s1"));
        assert_eq!(detail.status_history.len(), 1);
        assert_eq!(detail.status_history[0].previous_status, Some(LeadStatus::New));
    }

    #[test]
    fn lead_query_bounds() {
        let q = LeadQuery::default();
        assert_eq!(q.effective_page(), 1);
        assert_eq!(q.effective_page_size(), 20);
        assert_eq!(q.effective_min_score(), None);

        let q = LeadQuery {
            page: Some(0),
            page_size: Some(1000),
            min_score: Some(140.0),
            ..Default::default()
        };
        assert_eq!(q.effective_page(), 1);
        assert_eq!(q.effective_page_size(), 100);
        assert_eq!(q.effective_min_score(), Some(100.0));

        let q = LeadQuery {
            min_score: Some(f64::NAN),
            ..Default::default()
        };
        assert_eq!(q.effective_min_score(), None);
    }

    #[test]
    fn lead_page_counts_pages() {
        let page: LeadPage = serde_json::from_value(json!({ "leads": [], "total": 41 })).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 20);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn analytics_rates_are_percentages() {
        let analytics: ProfileAnalytics = serde_json::from_value(json!({
            "profile_id": "p1",
            "period_start": "2025-02-01T00:00:00",
            "period_end": "2025-03-01T00:00:00",
            "outcome_metrics": {
                "total_leads": 8,
                "status_contacted": 3,
                "status_responded": 1,
                "status_converted": 2,
                "accuracy_verified": 3,
                "accuracy_email_bounced": 1
            },
            "search_metrics": { "total_searches": 4, "successful_searches": 3 }
        }))
        .unwrap();
        let outcomes = &analytics.outcome_metrics;
        assert_eq!(outcomes.response_rate(), 33.33);
        assert_eq!(outcomes.conversion_rate(), 25.0);
        assert_eq!(outcomes.accuracy_rate(), 75.0);
        assert_eq!(analytics.search_metrics.success_rate(), 75.0);
        assert!(analytics.source_metrics.is_empty());
        assert_eq!(SourceMetrics::default().conversion_rate(), 0.0);
    }

    #[test]
    fn lead_update_skips_unset_fields() {
        let update = LeadUpdate {
            status: Some(LeadStatus::Contacted),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "status": "contacted" })
        );
        assert!(LeadUpdate::default().is_empty());
    }

    #[test]
    fn history_limit_is_bounded() {
        assert_eq!(HistoryQuery::default().effective_limit(), 20);
        let q = HistoryQuery {
            limit: Some(500),
            ..Default::default()
        };
        assert_eq!(q.effective_limit(), 100);
        let q = HistoryQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(q.effective_limit(), 1);
    }
}
