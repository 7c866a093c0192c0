//! Text summary builder for CLI output.
//!
//! Formats search runs, lead listings and analytics into human-readable lines for text mode.

use crate::metrics;
use crate::model::{
    Lead, LeadDetail, LeadPage, ProfileAnalytics, SearchRun, SourceState, SourceStatus,
};
use time::OffsetDateTime;

/// Number of leads listed in the summary.
const TOP_LEADS: usize = 10;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn source_status_label(status: SourceStatus) -> &'static str {
    match status {
        SourceStatus::Pending => "pending",
        SourceStatus::Querying => "querying",
        SourceStatus::Success => "ok",
        SourceStatus::Failed => "failed",
    }
}

/// One-line progress indicator used while a run is being tracked.
pub(crate) fn progress_line(progress: f64, leads_found: usize) -> String {
    format!(
        "Progress: {:>5.1}%  leads found: {}",
        progress.clamp(0.0, 1.0) * 100.0,
        leads_found
    )
}

/// Compact per-source state, e.g. `Sources: reddit ok (3), upwork querying (0)`.
pub(crate) fn sources_line(sources: &[SourceState]) -> Option<String> {
    if sources.is_empty() {
        return None;
    }
    let parts: Vec<String> = sources
        .iter()
        .map(|s| format!("{} {} ({})", s.name, source_status_label(s.status), s.leads_found))
        .collect();
    Some(format!("Sources: {}", parts.join(", ")))
}

fn lead_line(lead: &Lead) -> String {
    format!(
        "  {:>5.1}  {} @ {} [{}] {}",
        lead.intent_score,
        lead.name,
        lead.company,
        lead.source,
        lead.status.as_str()
    )
}

fn date_label(at: Option<OffsetDateTime>) -> String {
    at.map(|t| t.date().to_string()).unwrap_or_else(|| "?".into())
}

/// Build a text summary of a run snapshot.
pub(crate) fn build_text_summary(run: &SearchRun) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!("Search {} ({})", run.id, run.status));
    lines.push(format!("Client profile: {}", run.client_profile_id));
    if let Some(q) = run.quality_setting {
        lines.push(format!("Quality: {:.2}", q));
    }
    lines.push(progress_line(run.progress, run.leads.len()));
    if let Some(err) = run.error_message.as_deref() {
        if !err.trim().is_empty() {
            lines.push(format!("Error: {}", err));
        }
    }

    if !run.sources.is_empty() {
        lines.push("Sources:".to_string());
        for source in &run.sources {
            lines.push(format!(
                "  {:<12} {:<9} {} leads",
                source.name,
                source_status_label(source.status),
                source.leads_found
            ));
        }
    }

    let scores: Vec<f64> = run.leads.iter().map(|l| l.intent_score).collect();
    if let Some((mean, median, p25, p75)) = metrics::compute_metrics(&scores) {
        lines.push(format!(
            "Intent score: avg {:.1} med {:.1} p25 {:.1} p75 {:.1}",
            mean, median, p25, p75
        ));
    }
    if !scores.is_empty() {
        let bands = metrics::score_bands(&scores);
        lines.push(format!(
            "Intent bands: high {} / medium {} / low {}",
            bands.high, bands.medium, bands.low
        ));
    }

    let mut ranked: Vec<_> = run.leads.iter().collect();
    ranked.sort_by(|a, b| b.intent_score.total_cmp(&a.intent_score));
    if !ranked.is_empty() {
        lines.push(format!("Top leads ({} of {}):", ranked.len().min(TOP_LEADS), ranked.len()));
        for lead in ranked.into_iter().take(TOP_LEADS) {
            lines.push(format!(
                "  {:>5.1}  {} @ {} [{}]",
                lead.intent_score, lead.name, lead.company, lead.source
            ));
        }
    }

    TextSummary { lines }
}

pub(crate) fn build_lead_page_summary(page: &LeadPage) -> TextSummary {
    let mut lines = vec![format!(
        "Leads: page {} of {} ({} total)",
        page.page,
        page.total_pages().max(1),
        page.total
    )];
    for lead in &page.leads {
        lines.push(format!("{}  {}", lead_line(lead), lead.id));
    }
    TextSummary { lines }
}

pub(crate) fn build_lead_detail(detail: &LeadDetail) -> TextSummary {
    let lead = &detail.lead;
    let mut lines = vec![
        format!("{} @ {} ({})", lead.name, lead.company, lead.id),
        format!(
            "Status: {}{}",
            lead.status.as_str(),
            lead.accuracy
                .map(|a| format!(", {}", a.as_str()))
                .unwrap_or_default()
        ),
        format!("Intent score: {:.1}", lead.intent_score),
        format!("Source: {}", lead.source),
    ];
    if let Some(email) = lead.email.as_deref() {
        lines.push(format!("Email: {email}"));
    }
    if let Some(phone) = lead.phone.as_deref() {
        lines.push(format!("Phone: {phone}"));
    }
    if let Some(url) = lead.source_url.as_deref() {
        lines.push(format!("URL: {url}"));
    }
    if let Some(search_id) = detail.search_id.as_deref() {
        lines.push(format!("Found by search: {search_id}"));
    }
    if !detail.status_history.is_empty() {
        lines.push("History:".to_string());
        for change in &detail.status_history {
            lines.push(format!(
                "  {}  {} -> {}",
                date_label(change.changed_at),
                change.previous_status.map(|s| s.as_str()).unwrap_or("-"),
                change.new_status.as_str()
            ));
        }
    }
    TextSummary { lines }
}

pub(crate) fn build_analytics_summary(analytics: &ProfileAnalytics) -> TextSummary {
    let outcomes = &analytics.outcome_metrics;
    let searches = &analytics.search_metrics;
    let mut lines = vec![
        format!(
            "Analytics for {} ({} to {})",
            analytics.profile_id,
            date_label(analytics.period_start),
            date_label(analytics.period_end)
        ),
        format!(
            "Leads: {} total, {} contacted, {} responded, {} converted, {} lost",
            outcomes.total_leads,
            outcomes.status_contacted,
            outcomes.status_responded,
            outcomes.status_converted,
            outcomes.status_lost
        ),
        format!(
            "Rates: response {:.2}%  conversion {:.2}%  accuracy {:.2}%",
            outcomes.response_rate(),
            outcomes.conversion_rate(),
            outcomes.accuracy_rate()
        ),
        format!(
            "Searches: {} total, {:.2}% successful, {:.1} leads per search",
            searches.total_searches,
            searches.success_rate(),
            searches.avg_leads_per_search
        ),
    ];

    if !analytics.source_metrics.is_empty() {
        lines.push("By source:".to_string());
        for source in &analytics.source_metrics {
            lines.push(format!(
                "  {:<12} {:>4} leads  response {:>6.2}%  conversion {:>6.2}%  avg score {:.1}",
                source.source,
                source.total_leads,
                source.response_rate(),
                source.conversion_rate(),
                source.avg_intent_score
            ));
        }
    }
    if !analytics.score_correlations.is_empty() {
        lines.push("By intent score:".to_string());
        for band in &analytics.score_correlations {
            lines.push(format!(
                "  {:>3.0}-{:<3.0} {:>4} leads  conversion {:>6.2}%",
                band.score_range_start,
                band.score_range_end,
                band.total_leads,
                band.conversion_rate()
            ));
        }
    }
    TextSummary { lines }
}
