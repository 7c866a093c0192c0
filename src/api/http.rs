use super::{ApiError, LeadService, ProfileService, SearchService, TokenProvider};
use crate::model::{
    AnalyticsQuery, ApiConfig, ClientProfile, CreateSearchRequest, HistoryQuery, Lead, LeadDetail,
    LeadPage, LeadQuery, LeadUpdate, ProfileAnalytics, SearchHistory, SearchRun,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Pull a displayable `detail` out of an error body. Validation failures carry a
/// structured detail, which is rendered as compact JSON.
fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// REST client for the lead-generation search service.
#[derive(Clone)]
pub struct HttpApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpApiClient {
    pub fn new(cfg: &ApiConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
        let base_url = Url::parse(&cfg.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", cfg.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(cfg.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<R: DeserializeOwned>(&self, req: RequestBuilder) -> Result<R, ApiError> {
        let token = self.tokens.bearer_token()?;
        let resp = req.bearer_auth(token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(%status, body = %body, "service returned error status");
            return Err(ApiError::Status {
                status,
                detail: extract_detail(&body),
            });
        }
        Ok(resp.json::<R>().await?)
    }
}

#[async_trait]
impl SearchService for HttpApiClient {
    async fn create_search(&self, request: &CreateSearchRequest) -> Result<SearchRun, ApiError> {
        let url = self.endpoint(&["v1", "searches"]);
        self.send(self.http.post(url).json(request)).await
    }

    async fn get_search(&self, search_id: &str) -> Result<SearchRun, ApiError> {
        let url = self.endpoint(&["v1", "searches", search_id]);
        self.send(self.http.get(url)).await
    }

    async fn cancel_search(&self, search_id: &str) -> Result<SearchRun, ApiError> {
        let url = self.endpoint(&["v1", "searches", search_id, "cancel"]);
        self.send(self.http.post(url)).await
    }

    async fn list_searches(
        &self,
        client_profile_id: &str,
        query: &HistoryQuery,
    ) -> Result<SearchHistory, ApiError> {
        let mut url = self.endpoint(&["v1", "searches"]);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("client_profile_id", client_profile_id);
            if let Some(status) = query.status {
                pairs.append_pair("status", status.as_str());
            }
            pairs.append_pair("limit", &query.effective_limit().to_string());
        }
        self.send(self.http.get(url)).await
    }
}

#[async_trait]
impl LeadService for HttpApiClient {
    async fn list_leads(&self, query: &LeadQuery) -> Result<LeadPage, ApiError> {
        let mut url = self.endpoint(&["v1", "leads"]);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &query.effective_page().to_string());
            pairs.append_pair("page_size", &query.effective_page_size().to_string());
            if let Some(status) = query.status {
                pairs.append_pair("status", status.as_str());
            }
            if let Some(source) = query.source.as_deref() {
                pairs.append_pair("source", source);
            }
            if let Some(min_score) = query.effective_min_score() {
                pairs.append_pair("min_score", &min_score.to_string());
            }
            pairs.append_pair("sort_by", query.sort_by.as_str());
            pairs.append_pair("sort_desc", if query.ascending { "false" } else { "true" });
        }
        self.send(self.http.get(url)).await
    }

    async fn get_lead(&self, lead_id: &str) -> Result<LeadDetail, ApiError> {
        let url = self.endpoint(&["v1", "leads", lead_id]);
        self.send(self.http.get(url)).await
    }

    async fn update_lead(&self, lead_id: &str, update: &LeadUpdate) -> Result<Lead, ApiError> {
        let url = self.endpoint(&["v1", "leads", lead_id]);
        self.send(self.http.patch(url).json(update)).await
    }
}

#[async_trait]
impl ProfileService for HttpApiClient {
    async fn active_profile(&self) -> Result<Option<ClientProfile>, ApiError> {
        let url = self.endpoint(&["v1", "client-profiles", "active"]);
        self.send(self.http.get(url)).await
    }

    async fn profile_analytics(&self, query: &AnalyticsQuery) -> Result<ProfileAnalytics, ApiError> {
        let mut url = self.endpoint(&["v1", "analytics", "profile"]);
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(start) = query.start_date {
                pairs.append_pair("start_date", &start.to_string());
            }
            if let Some(end) = query.end_date {
                pairs.append_pair("end_date", &end.to_string());
            }
            for source in &query.sources {
                pairs.append_pair("sources", source);
            }
        }
        self.send(self.http.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StaticToken;
    use crate::model::{LeadSort, LeadStatus, SearchParameters, SearchStatus};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> HttpApiClient {
        let cfg = ApiConfig {
            base_url: format!("{}/", server.uri()),
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1500),
            user_agent: "leadgen-search/test".into(),
        };
        HttpApiClient::new(&cfg, Arc::new(StaticToken::new(token.map(String::from)))).unwrap()
    }

    fn run_json(id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "client_profile_id": "p1",
            "status": status,
            "progress": 0.0,
            "sources": [{ "name": "reddit", "status": "querying", "leads_found": 0 }],
            "leads": []
        })
    }

    #[tokio::test]
    async fn create_posts_parameters_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/searches"))
            .and(header("authorization", "Bearer t0k"))
            .and(body_json(json!({
                "client_profile_id": "p1",
                "quality_level": 0.5,
                "manual_override": null
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(run_json("s1", "pending")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t0k"));
        let req = CreateSearchRequest::new("p1", &SearchParameters::new(0.5, None));
        let run = client.create_search(&req).await.unwrap();
        assert_eq!(run.id, "s1");
        assert_eq!(run.status, SearchStatus::Searching);
        assert_eq!(run.sources.len(), 1);
    }

    #[tokio::test]
    async fn error_detail_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/searches"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({ "detail": "A search is already in progress for this profile." })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t0k"));
        let req = CreateSearchRequest::new("p1", &SearchParameters::default());
        let err = client.create_search(&req).await.unwrap_err();
        match &err {
            ApiError::Status { status, detail } => {
                assert_eq!(*status, StatusCode::CONFLICT);
                assert_eq!(
                    detail.as_deref(),
                    Some("A search is already in progress for this profile.")
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_has_no_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/searches/s1"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t0k"));
        let err = client.get_search("s1").await.unwrap_err();
        assert_eq!(err.user_message("Failed to fetch search status"), "Failed to fetch search status");
    }

    #[tokio::test]
    async fn cancel_and_poll_hit_run_paths() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/searches/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_json("s1", "in_progress")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/searches/s1/cancel"))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_json("s1", "cancelled")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t0k"));
        assert_eq!(client.get_search("s1").await.unwrap().status, SearchStatus::Searching);
        assert_eq!(client.cancel_search("s1").await.unwrap().status, SearchStatus::Cancelled);
    }

    #[tokio::test]
    async fn history_sends_profile_filter_and_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/searches"))
            .and(query_param("client_profile_id", "p1"))
            .and(query_param("status", "completed"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "searches": [run_json("s1", "completed"), run_json("s2", "completed")],
                "total": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t0k"));
        let query = HistoryQuery {
            status: Some(SearchStatus::Completed),
            limit: Some(5),
        };
        let history = client.list_searches("p1", &query).await.unwrap();
        assert_eq!(history.searches.len(), 2);
        assert_eq!(history.total, Some(2));
    }

    #[tokio::test]
    async fn lead_update_is_a_patch() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v1/leads/l1"))
            .and(body_json(json!({ "status": "contacted" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "l1",
                "name": "Ada",
                "company": "Acme",
                "source": "upwork",
                "intent_score": 82.5,
                "status": "contacted"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t0k"));
        let update = LeadUpdate {
            status: Some(LeadStatus::Contacted),
            ..Default::default()
        };
        let lead = client.update_lead("l1", &update).await.unwrap();
        assert_eq!(lead.status, LeadStatus::Contacted);
    }

    #[tokio::test]
    async fn lead_listing_sends_filters_and_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/leads"))
            .and(query_param("page", "2"))
            .and(query_param("page_size", "100"))
            .and(query_param("status", "responded"))
            .and(query_param("source", "reddit"))
            .and(query_param("min_score", "60.5"))
            .and(query_param("sort_by", "company"))
            .and(query_param("sort_desc", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "leads": [{ "id": "l1", "name": "Ada", "company": "Acme", "intent_score": 71.0 }],
                "total": 101,
                "page": 2,
                "page_size": 100
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t0k"));
        let query = LeadQuery {
            page: Some(2),
            page_size: Some(250),
            status: Some(LeadStatus::Responded),
            source: Some("reddit".into()),
            min_score: Some(60.5),
            sort_by: LeadSort::Company,
            ascending: true,
        };
        let page = client.list_leads(&query).await.unwrap();
        assert_eq!(page.leads.len(), 1);
        assert_eq!(page.total_pages(), 2);
    }

    #[tokio::test]
    async fn lead_detail_is_fetched_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/leads/l9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "l9",
                "name": "Grace",
                "company": "Hopper Ltd",
                "search_id": "s3",
                "status": "new",
                "created_at": "2025-03-01T10:00:00.123456",
                "status_history": []
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/leads/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Lead not found" })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t0k"));
        let detail = client.get_lead("l9").await.unwrap();
        assert_eq!(detail.lead.company, "Hopper Ltd");
        assert_eq!(detail.search_id.as_deref(), Some("s3"));

        let err = client.get_lead("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn active_profile_may_be_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/client-profiles/active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/client-profiles/active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p1",
                "user_id": "u1",
                "company_name": "Northwind",
                "industry": "web development",
                "services": ["shopify"],
                "is_active": true
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t0k"));
        assert_eq!(client.active_profile().await.unwrap(), None);
        let profile = client.active_profile().await.unwrap().unwrap();
        assert_eq!(profile.id, "p1");
        assert!(profile.is_active);
    }

    #[tokio::test]
    async fn analytics_sends_period_and_sources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/analytics/profile"))
            .and(query_param("start_date", "2025-02-01"))
            .and(query_param("end_date", "2025-03-01"))
            .and(query_param("sources", "reddit"))
            .and(query_param("sources", "upwork"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "profile_id": "p1",
                "period_start": "2025-02-01T00:00:00",
                "period_end": "2025-03-01T00:00:00",
                "outcome_metrics": { "total_leads": 10, "status_converted": 1 },
                "search_metrics": { "total_searches": 2, "successful_searches": 2 },
                "source_metrics": [{ "source": "reddit", "total_leads": 6 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t0k"));
        let query = AnalyticsQuery {
            start_date: Some(time::macros::date!(2025 - 02 - 01)),
            end_date: Some(time::macros::date!(2025 - 03 - 01)),
            sources: vec!["reddit".into(), "upwork".into()],
        };
        let analytics = client.profile_analytics(&query).await.unwrap();
        assert_eq!(analytics.outcome_metrics.conversion_rate(), 10.0);
        assert_eq!(analytics.search_metrics.success_rate(), 100.0);
        assert_eq!(analytics.source_metrics[0].source, "reddit");
    }

    #[tokio::test]
    async fn missing_token_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client.get_search("s1").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[test]
    fn ids_are_percent_encoded_into_one_segment() {
        let cfg = ApiConfig {
            base_url: "https://api.example.com/base".into(),
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1500),
            user_agent: "t".into(),
        };
        let client = HttpApiClient::new(&cfg, Arc::new(StaticToken::default())).unwrap();
        let url = client.endpoint(&["v1", "searches", "a/b"]);
        assert_eq!(url.as_str(), "https://api.example.com/base/v1/searches/a%2Fb");
    }

    #[test]
    fn structured_detail_is_rendered_as_json() {
        let body = r#"{"detail":[{"loc":["query","quality_setting"],"msg":"too large"}]}"#;
        let detail = extract_detail(body).unwrap();
        assert!(detail.contains("too large"));
        assert_eq!(extract_detail(r#"{"detail":null}"#), None);
        assert_eq!(extract_detail("not json"), None);
    }
}
