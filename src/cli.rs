use crate::api::{HttpApiClient, LeadService, ProfileService, SearchService, StaticToken};
use crate::leads::LeadBoard;
use crate::model::{
    AnalyticsQuery, ApiConfig, ClientProfile, CompanySize, HistoryQuery, LeadAccuracy, LeadQuery,
    LeadSort, LeadStatus, LeadUpdate, ManualOverride, OverrideMode, SearchEvent, SearchParameters,
    SearchRun, SearchStatus,
};
use crate::orchestrator::{self, SearchLifecycleController, DEFAULT_POLL_INTERVAL};
use crate::storage::{self, Preferences};
use crate::text_summary;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

/// Parse a value using its wire (serde) spelling, e.g. `in_progress` or `email_bounced`.
fn parse_wire<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("invalid value '{s}'"))
}

/// Calendar date in `YYYY-MM-DD` form.
fn parse_date(s: &str) -> Result<time::Date, String> {
    time::Date::parse(s, time::macros::format_description!("[year]-[month]-[day]"))
        .map_err(|_| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "leadgen-search",
    version,
    about = "Start, follow and manage lead-generation searches"
)]
pub struct Cli {
    /// Base URL of the search service
    #[arg(long, env = "LEADGEN_API_URL", default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Bearer token for the search service
    #[arg(long, env = "LEADGEN_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Print JSON results (no progress lines on stdout)
    #[arg(long, global = true)]
    pub json: bool,

    /// Run silently: suppress all output except errors (for cron usage)
    #[arg(long, global = true)]
    pub silent: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Interval between status checks while a search is running [default: saved preference or 1500ms]
    #[arg(long)]
    pub poll_interval: Option<humantime::Duration>,

    /// Per-request timeout [default: saved preference or 30s]
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Start a search for a client profile and follow it to completion
    Search(SearchArgs),
    /// Follow an already running search
    Watch {
        search_id: String,
        #[command(flatten)]
        exports: ExportArgs,
    },
    /// Cancel a running search
    Cancel { search_id: String },
    /// Show the current state of a search
    Status { search_id: String },
    /// List past searches for a client profile
    History(HistoryArgs),
    /// List leads across searches
    Leads(LeadsArgs),
    /// Show a lead, or update it when a status, accuracy or note is given
    Lead(LeadArgs),
    /// Outcome analytics for the active client profile
    Analytics(AnalyticsArgs),
    /// Show the active client profile
    Profile,
}

#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    /// Client profile to search for [default: the active profile]
    #[arg(long)]
    pub profile: Option<String>,

    /// Quality vs speed trade-off in [0, 1]; out-of-range values are clamped
    #[arg(long, allow_negative_numbers = true)]
    pub quality: Option<f64>,

    /// Remember the quality level for future searches
    #[arg(long)]
    pub save_quality: bool,

    #[command(flatten)]
    pub manual: OverrideArgs,

    #[command(flatten)]
    pub exports: ExportArgs,
}

/// Manual criteria layered over the profile's inferred criteria.
#[derive(Debug, Args, Clone, Default)]
pub struct OverrideArgs {
    /// How manual criteria combine with the profile: supplement or replace
    #[arg(long, value_parser = parse_wire::<OverrideMode>)]
    pub override_mode: Option<OverrideMode>,

    /// Keyword to search for (repeatable)
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    #[arg(long)]
    pub location: Option<String>,

    /// solo, small, medium, enterprise
    #[arg(long, value_parser = parse_wire::<CompanySize>)]
    pub company_size: Option<CompanySize>,

    #[arg(long)]
    pub budget_min: Option<f64>,

    #[arg(long)]
    pub budget_max: Option<f64>,

    #[arg(long)]
    pub industry: Option<String>,
}

impl OverrideArgs {
    /// `None` when no manual criterion was given, so the profile is used unmodified.
    pub fn to_override(&self) -> Option<ManualOverride> {
        let any_set = self.override_mode.is_some()
            || !self.keywords.is_empty()
            || self.location.is_some()
            || self.company_size.is_some()
            || self.budget_min.is_some()
            || self.budget_max.is_some()
            || self.industry.is_some();
        if !any_set {
            return None;
        }
        Some(ManualOverride {
            mode: self.override_mode.unwrap_or_default(),
            keywords: self.keywords.clone(),
            location: self.location.clone(),
            company_size: self.company_size,
            budget_min: self.budget_min,
            budget_max: self.budget_max,
            industry: self.industry.clone(),
        })
    }
}

#[derive(Debug, Args, Clone, Default)]
pub struct ExportArgs {
    /// Export the finished run as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Export the leads of the finished run as CSV
    #[arg(long)]
    pub export_csv: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct HistoryArgs {
    /// Client profile [default: the active profile]
    #[arg(long)]
    pub profile: Option<String>,

    /// Only show searches with this status
    #[arg(long, value_parser = parse_wire::<SearchStatus>)]
    pub status: Option<SearchStatus>,

    /// Maximum number of searches (1-100)
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Args, Clone, Default)]
pub struct LeadsArgs {
    /// new, contacted, responded, converted, lost
    #[arg(long, value_parser = parse_wire::<LeadStatus>)]
    pub status: Option<LeadStatus>,

    /// Only leads found on this source
    #[arg(long)]
    pub source: Option<String>,

    /// Minimum intent score (0-100)
    #[arg(long, allow_negative_numbers = true)]
    pub min_score: Option<f64>,

    /// intent_score, created_at, company, name
    #[arg(long, value_parser = parse_wire::<LeadSort>)]
    pub sort_by: Option<LeadSort>,

    /// Sort ascending instead of descending
    #[arg(long)]
    pub asc: bool,

    #[arg(long)]
    pub page: Option<u32>,

    /// Leads per page (1-100)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Write the listed leads as CSV
    #[arg(long)]
    pub export_csv: Option<PathBuf>,
}

impl LeadsArgs {
    pub fn to_query(&self) -> LeadQuery {
        LeadQuery {
            page: self.page,
            page_size: self.page_size,
            status: self.status,
            source: self.source.clone(),
            min_score: self.min_score,
            sort_by: self.sort_by.unwrap_or_default(),
            ascending: self.asc,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct LeadArgs {
    pub lead_id: String,

    /// new, contacted, responded, converted, lost
    #[arg(long, value_parser = parse_wire::<LeadStatus>)]
    pub status: Option<LeadStatus>,

    /// verified, email_bounced, phone_invalid, wrong_person, company_mismatch
    #[arg(long, value_parser = parse_wire::<LeadAccuracy>)]
    pub accuracy: Option<LeadAccuracy>,

    #[arg(long)]
    pub notes: Option<String>,
}

impl LeadArgs {
    pub fn to_update(&self) -> LeadUpdate {
        LeadUpdate {
            status: self.status,
            accuracy: self.accuracy,
            notes: self.notes.clone(),
        }
    }
}

#[derive(Debug, Args, Clone, Default)]
pub struct AnalyticsArgs {
    /// Start of the period (YYYY-MM-DD)
    #[arg(long = "from", value_parser = parse_date)]
    pub start_date: Option<time::Date>,

    /// End of the period (YYYY-MM-DD)
    #[arg(long = "to", value_parser = parse_date)]
    pub end_date: Option<time::Date>,

    /// Only count leads from this source (repeatable)
    #[arg(long = "source")]
    pub sources: Vec<String>,
}

/// Build an `ApiConfig` from CLI arguments; flags win over saved preferences.
pub fn build_config(args: &Cli, prefs: &Preferences) -> ApiConfig {
    let poll_interval = args
        .poll_interval
        .map(Duration::from)
        .or(prefs.poll_interval)
        .filter(|d| !d.is_zero())
        .unwrap_or(DEFAULT_POLL_INTERVAL);
    let timeout = args
        .timeout
        .map(Duration::from)
        .or(prefs.timeout)
        .filter(|d| !d.is_zero())
        .unwrap_or(DEFAULT_TIMEOUT);
    ApiConfig {
        base_url: args.base_url.clone(),
        timeout,
        poll_interval,
        user_agent: format!("leadgen-search/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// The explicit `--profile`, else the service's active client profile.
async fn resolve_profile(profiles: &dyn ProfileService, explicit: Option<&str>) -> Result<String> {
    if let Some(id) = explicit {
        return Ok(id.to_string());
    }
    match profiles.active_profile().await {
        Ok(Some(profile)) => {
            tracing::info!(profile_id = %profile.id, "using active client profile");
            Ok(profile.id)
        }
        Ok(None) => Err(anyhow::anyhow!("no active client profile; pass --profile")),
        Err(e) => Err(anyhow::anyhow!(
            e.user_message("Failed to load active client profile")
        )),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that --silent can only be used with --json
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }

    let prefs = storage::load_preferences().unwrap_or_else(|e| {
        tracing::warn!(error = %format!("{e:#}"), "could not load preferences, using defaults");
        Preferences::default()
    });
    let cfg = build_config(&args, &prefs);
    let tokens = Arc::new(StaticToken::new(args.token.clone()));
    let client = Arc::new(HttpApiClient::new(&cfg, tokens).context("failed to create API client")?);

    let (out_tx, out_handle) = spawn_output_writer();
    let res = match &args.command {
        Command::Search(search) => run_search(&args, &cfg, &prefs, client, search, &out_tx).await,
        Command::Watch { search_id, exports } => {
            run_watch(&args, &cfg, client, search_id, exports, &out_tx).await
        }
        Command::Cancel { search_id } => run_cancel(&args, &cfg, client, search_id, &out_tx).await,
        Command::Status { search_id } => run_status(&args, client, search_id, &out_tx).await,
        Command::History(history) => run_history(&args, &cfg, client, history, &out_tx).await,
        Command::Leads(leads) => run_leads(&args, client, leads, &out_tx).await,
        Command::Lead(lead) => run_lead(&args, client, lead, &out_tx).await,
        Command::Analytics(analytics) => run_analytics(&args, client, analytics, &out_tx).await,
        Command::Profile => run_profile(&args, client, &out_tx).await,
    };

    drop(out_tx);
    let _ = out_handle.await;
    res
}

fn print_run(args: &Cli, run: &SearchRun, out_tx: &mpsc::UnboundedSender<OutputLine>) -> Result<()> {
    if args.json {
        let out = serde_json::to_string_pretty(run)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else if !args.silent {
        for line in text_summary::build_text_summary(run).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    Ok(())
}

/// JSON to stdout with `--json`, otherwise the text lines unless silenced.
fn print_json_or_lines<T: serde::Serialize>(
    args: &Cli,
    value: &T,
    lines: impl FnOnce() -> Vec<String>,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    if args.json {
        let out = serde_json::to_string_pretty(value)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else if !args.silent {
        for line in lines() {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    Ok(())
}

fn profile_lines(profile: &ClientProfile) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", profile.company_name, profile.id)];
    if !profile.industry.is_empty() {
        lines.push(format!("Industry: {}", profile.industry));
    }
    if !profile.services.is_empty() {
        lines.push(format!("Services: {}", profile.services.join(", ")));
    }
    lines
}

async fn run_search(
    args: &Cli,
    cfg: &ApiConfig,
    prefs: &Preferences,
    client: Arc<HttpApiClient>,
    search: &SearchArgs,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let profile_id = resolve_profile(client.as_ref(), search.profile.as_deref()).await?;
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<SearchEvent>();
    let mut ctl = SearchLifecycleController::with_events(
        client,
        prefs.to_parameters(),
        cfg.poll_interval,
        evt_tx,
    );
    if let Some(q) = search.quality {
        ctl.set_quality_level(q);
    }
    ctl.set_manual_override(search.manual.to_override());

    ctl.start_search(&profile_id)
        .await
        .context("search could not be started")?;

    let save = search.save_quality.then(|| ctl.parameters().clone());
    follow_run(args, &mut ctl, evt_rx, &search.exports, save.as_ref(), out_tx).await
}

async fn run_watch(
    args: &Cli,
    cfg: &ApiConfig,
    client: Arc<HttpApiClient>,
    search_id: &str,
    exports: &ExportArgs,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<SearchEvent>();
    let mut ctl = SearchLifecycleController::with_events(
        client,
        SearchParameters::default(),
        cfg.poll_interval,
        evt_tx,
    );
    ctl.resume_search(search_id)
        .await
        .with_context(|| format!("could not load search {search_id}"))?;
    follow_run(args, &mut ctl, evt_rx, exports, None, out_tx).await
}

/// Render controller events until the run leaves `searching`. Ctrl-C cancels the run.
async fn follow_run(
    args: &Cli,
    ctl: &mut SearchLifecycleController,
    mut evt_rx: mpsc::UnboundedReceiver<SearchEvent>,
    exports: &ExportArgs,
    save_parameters: Option<&SearchParameters>,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let show_progress = !args.silent && !args.json;
    let mut cancel_requested = false;

    let finished = loop {
        tokio::select! {
            ev = evt_rx.recv() => {
                match ev {
                    Some(SearchEvent::Progress { search_id, progress, leads_found }) => {
                        if show_progress {
                            let _ = out_tx.send(OutputLine::Stderr(format!(
                                "{search_id}: {}",
                                text_summary::progress_line(progress, leads_found)
                            )));
                            if let Some(line) = text_summary::sources_line(&ctl.sources()) {
                                let _ = out_tx.send(OutputLine::Stderr(line));
                            }
                        }
                    }
                    Some(SearchEvent::Info(info)) => {
                        if !args.silent {
                            let _ = out_tx.send(OutputLine::Stderr(info.to_message()));
                        }
                    }
                    Some(SearchEvent::StatusChanged { search_id, status }) => {
                        if show_progress {
                            let line = match search_id {
                                Some(id) => format!("{id}: {status}"),
                                None => format!("Status: {status}"),
                            };
                            let _ = out_tx.send(OutputLine::Stderr(line));
                        }
                        // Polling stops on any non-searching status; only terminal ones produce Finished.
                        if status != SearchStatus::Searching && !status.is_terminal() {
                            break ctl.snapshot().run;
                        }
                    }
                    Some(SearchEvent::Finished { run }) => break Some(*run),
                    Some(SearchEvent::Failed { message }) => {
                        return Err(anyhow::anyhow!(message));
                    }
                    Some(SearchEvent::Reset) | None => break ctl.snapshot().run,
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancel_requested => {
                cancel_requested = true;
                if !args.silent {
                    let line = match ctl.current_run_id() {
                        Some(id) => format!(
                            "Cancelling search {id} ({})…",
                            text_summary::progress_line(ctl.progress(), ctl.leads().len())
                        ),
                        None => "Cancelling…".to_string(),
                    };
                    let _ = out_tx.send(OutputLine::Stderr(line));
                }
                if let Err(e) = ctl.cancel_search().await {
                    // Run keeps its last known status; polling resumes and Ctrl-C can be retried.
                    cancel_requested = false;
                    let message = ctl.error().unwrap_or_else(|| e.to_string());
                    let _ = out_tx.send(OutputLine::Stderr(format!("Cancel failed: {message}")));
                    if let Some(id) = ctl.current_run_id() {
                        let status = ctl.poll_once(&id).await;
                        if ctl.is_polling() {
                            let _ = out_tx.send(OutputLine::Stderr(format!(
                                "{id} is still {status}; press Ctrl-C again to retry"
                            )));
                        }
                    }
                }
            }
        }
    };
    // The final snapshot is taken; release the run so no poller outlives the command.
    ctl.reset();

    let run = finished.context("search ended without a final snapshot")?;
    let processed = orchestrator::process_run_completion(exports, save_parameters, &run);

    if args.json {
        let out = serde_json::to_string_pretty(&run)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else if !args.silent {
        for line in processed.summary {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    if !args.silent {
        for msg in processed.export_messages {
            let _ = out_tx.send(OutputLine::Stderr(msg));
        }
        if let Some(path) = processed.saved_preferences {
            let _ = out_tx.send(OutputLine::Stderr(format!("Saved preferences: {}", path.display())));
        }
    }

    if run.status == SearchStatus::Error {
        let reason = run
            .error_message
            .clone()
            .unwrap_or_else(|| "search failed".to_string());
        return Err(anyhow::anyhow!("search {} ended with an error: {}", run.id, reason));
    }
    Ok(())
}

async fn run_cancel(
    args: &Cli,
    cfg: &ApiConfig,
    client: Arc<HttpApiClient>,
    search_id: &str,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let mut ctl =
        SearchLifecycleController::new(client, SearchParameters::default(), cfg.poll_interval);
    ctl.resume_search(search_id)
        .await
        .with_context(|| format!("could not load search {search_id}"))?;
    ctl.cancel_search().await.context("cancel failed")?;

    let snapshot = ctl.snapshot();
    let run = snapshot.run.context("no search to cancel")?;
    print_run(args, &run, out_tx)
}

async fn run_status(
    args: &Cli,
    client: Arc<HttpApiClient>,
    search_id: &str,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let run = client
        .get_search(search_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("Failed to fetch search status")))?;
    print_run(args, &run, out_tx)
}

async fn run_history(
    args: &Cli,
    cfg: &ApiConfig,
    client: Arc<HttpApiClient>,
    history: &HistoryArgs,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let profile_id = resolve_profile(client.as_ref(), history.profile.as_deref()).await?;
    let ctl = SearchLifecycleController::new(client, SearchParameters::default(), cfg.poll_interval);
    let query = HistoryQuery {
        status: history.status,
        limit: history.limit,
    };
    let runs = ctl.fetch_history(&profile_id, &query).await?;

    if args.json {
        let out = serde_json::to_string_pretty(&runs)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else if !args.silent {
        if runs.is_empty() {
            let _ = out_tx.send(OutputLine::Stderr("No searches yet".into()));
        }
        for run in &runs {
            let started = run
                .started_at
                .and_then(|t| t.format(&time::format_description::well_known::Rfc3339).ok())
                .unwrap_or_else(|| "-".into());
            let _ = out_tx.send(OutputLine::Stdout(format!(
                "{}  {:<10} {:>3} leads  {}",
                run.id,
                run.status.as_str(),
                run.leads.len(),
                started
            )));
        }
    }
    Ok(())
}

async fn run_leads(
    args: &Cli,
    client: Arc<HttpApiClient>,
    leads: &LeadsArgs,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let page = client
        .list_leads(&leads.to_query())
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("Failed to list leads")))?;

    print_json_or_lines(
        args,
        &page,
        || text_summary::build_lead_page_summary(&page).lines,
        out_tx,
    )?;

    if let Some(path) = &leads.export_csv {
        storage::export_csv(path, &page.leads)?;
        if !args.silent {
            let _ = out_tx.send(OutputLine::Stderr(format!("Exported CSV: {}", path.display())));
        }
    }
    Ok(())
}

async fn run_lead(
    args: &Cli,
    client: Arc<HttpApiClient>,
    lead: &LeadArgs,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let detail = match client.get_lead(&lead.lead_id).await {
        Ok(detail) => detail,
        Err(e) if e.is_not_found() => anyhow::bail!("lead {} not found", lead.lead_id),
        Err(e) => anyhow::bail!(e.user_message("Failed to load lead")),
    };

    let update = lead.to_update();
    if update.is_empty() {
        return print_json_or_lines(
            args,
            &detail,
            || text_summary::build_lead_detail(&detail).lines,
            out_tx,
        );
    }

    let mut board = LeadBoard::new(vec![detail.lead]);
    let updated = match board.update_lead(client.as_ref(), &lead.lead_id, &update).await {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(kept) = board.get(&lead.lead_id) {
                tracing::info!(lead_id = %kept.id, status = kept.status.as_str(), "lead left unchanged");
            }
            return Err(e.into());
        }
    };

    print_json_or_lines(
        args,
        &updated,
        || {
            vec![format!(
                "{} @ {}: {}{}",
                updated.name,
                updated.company,
                updated.status.as_str(),
                updated
                    .accuracy
                    .map(|a| format!(" ({})", a.as_str()))
                    .unwrap_or_default()
            )]
        },
        out_tx,
    )
}

async fn run_analytics(
    args: &Cli,
    client: Arc<HttpApiClient>,
    analytics: &AnalyticsArgs,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    if let (Some(start), Some(end)) = (analytics.start_date, analytics.end_date) {
        if start > end {
            anyhow::bail!("--from {start} is after --to {end}");
        }
    }
    let query = AnalyticsQuery {
        start_date: analytics.start_date,
        end_date: analytics.end_date,
        sources: analytics.sources.clone(),
    };
    let report = client
        .profile_analytics(&query)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("Failed to load analytics")))?;

    print_json_or_lines(
        args,
        &report,
        || text_summary::build_analytics_summary(&report).lines,
        out_tx,
    )
}

async fn run_profile(
    args: &Cli,
    client: Arc<HttpApiClient>,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let profile = client
        .active_profile()
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message("Failed to load active client profile")))?;

    print_json_or_lines(
        args,
        &profile,
        || match &profile {
            Some(p) => profile_lines(p),
            None => vec!["No active client profile".to_string()],
        },
        out_tx,
    )
}
