use crate::config::Config;
use crate::epics::extract::{parse_status, parse_story};
use crate::epics::pagination::{next_cursor, page_items, PageCursor};
use crate::epics::{StatusTable, Story};
use crate::error::{BillingError, Result};
use reqwest::{Client, Url};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// Epics API client
pub struct EpicsClient {
    base_url: String,
    app_id: String,
    token: String,
    client: Client,
    page_size: u32,
    max_pages: u32,
}

impl EpicsClient {
    /// Create a new Epics API client from the run configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.api_base().to_string(),
            app_id: config.mendix_app_id.clone(),
            token: config.mendix_pat.clone(),
            client,
            page_size: config.page_size,
            max_pages: config.max_pages,
        })
    }

    /// Fetch the project's status table
    pub async fn fetch_statuses(&self) -> Result<StatusTable> {
        let url = format!("{}/projects/{}/statuses", self.base_url, self.app_id);
        let payload = self.get_json(&url).await?;

        let statuses: Vec<_> = page_items(&payload, "statuses")
            .iter()
            .filter_map(parse_status)
            .collect();

        Ok(StatusTable::new(statuses))
    }

    /// Fetch and parse every story of the project
    pub async fn fetch_stories(&self) -> Result<Vec<Story>> {
        let records = self.fetch_all_story_records().await?;
        Ok(records.iter().map(parse_story).collect())
    }

    /// Walk all story pages and return the raw records in order.
    ///
    /// Stops when a page has no next cursor, comes back empty, points at a
    /// page already requested or at another host, or `max_pages` is reached.
    pub async fn fetch_all_story_records(&self) -> Result<Vec<Value>> {
        let stories_url = format!("{}/projects/{}/stories", self.base_url, self.app_id);

        let mut records = Vec::new();
        let mut seen = HashSet::from([
            PageCursor::Offset(0),
            PageCursor::Link(stories_url.clone()),
        ]);
        let mut cursor: Option<PageCursor> = None;
        let mut pages: u32 = 0;

        loop {
            let url = self.page_url(&stories_url, cursor.as_ref());
            let payload = self.get_json(&url).await?;
            seen.insert(PageCursor::Link(url));
            pages += 1;

            let items = page_items(&payload, "stories");
            tracing::debug!(page = pages, records = items.len(), "Fetched stories page");
            if items.is_empty() {
                break;
            }
            records.extend(items);

            let Some(next) = next_cursor(&payload, &self.base_url) else {
                break;
            };

            if let PageCursor::Link(link) = &next {
                if !self.is_same_origin(link) {
                    tracing::warn!(link = %link, "Next page link leaves the Epics host, stopping pagination");
                    break;
                }
            }

            if !seen.insert(next.clone()) {
                tracing::warn!(cursor = ?next, "Stories page cursor repeated, stopping pagination");
                break;
            }

            if pages >= self.max_pages {
                tracing::warn!(
                    max_pages = self.max_pages,
                    "Reached page limit, remaining stories were not fetched"
                );
                break;
            }

            cursor = Some(next);
        }

        tracing::info!(pages, records = records.len(), "Fetched all stories");
        Ok(records)
    }

    /// URL requested for a cursor; the first page carries only the page size
    fn page_url(&self, stories_url: &str, cursor: Option<&PageCursor>) -> String {
        match cursor {
            None => format!("{}?limit={}", stories_url, self.page_size),
            Some(PageCursor::Link(url)) => url.clone(),
            Some(PageCursor::Offset(offset)) => {
                format!("{}?limit={}&offset={}", stories_url, self.page_size, offset)
            }
        }
    }

    /// Whether `url` has the same scheme, host and port as the API base.
    /// The PAT is only ever sent there.
    fn is_same_origin(&self, url: &str) -> bool {
        match (Url::parse(url), Url::parse(&self.base_url)) {
            (Ok(url), Ok(base)) => url.origin() == base.origin(),
            _ => false,
        }
    }

    /// Authenticated GET returning the JSON body. Non-success is an error.
    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("MxToken {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BillingError::epics_api(format!(
                "GET {} failed with status {}: {}",
                url, status, error_text
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epics::StatusRef;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const STORIES_PATH: &str = "/projects/app-1/stories";

    fn test_config(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.epics_api_base = server.uri();
        config.mendix_pat = "pat-123".to_string();
        config.mendix_app_id = "app-1".to_string();
        config.page_size = 2;
        config
    }

    #[tokio::test]
    async fn test_fetch_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/app-1/statuses"))
            .and(header("Authorization", "MxToken pat-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statuses": [
                    { "id": "s-1", "name": "To Do" },
                    { "id": "s-2", "name": "Done" },
                    { "name": "No id" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EpicsClient::new(&test_config(&server)).unwrap();
        let table = client.fetch_statuses().await.unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("s-2").unwrap().name, "Done");
    }

    #[tokio::test]
    async fn test_fetch_stories_follows_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .and(query_param("limit", "2"))
            .and(query_param_is_missing("page"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stories": [
                    { "title": "A", "points": 2, "status": "Done" },
                    { "title": "B", "points": 1, "status": "In Progress" }
                ],
                "links": { "next": { "href": "/projects/app-1/stories?page=2" } }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stories": [{ "title": "C", "storyPoints": 5, "statusId": "s-2" }],
                "links": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EpicsClient::new(&test_config(&server)).unwrap();
        let stories = client.fetch_stories().await.unwrap();

        let titles: Vec<_> = stories.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(stories[2].points, 5.0);
        assert_eq!(stories[2].status, StatusRef::Key("s-2".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_stories_array_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "title": "Only", "points": 1 }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = EpicsClient::new(&test_config(&server)).unwrap();
        let records = client.fetch_all_story_records().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_offset_terminates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .and(query_param_is_missing("offset"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stories": [{ "title": "A" }, { "title": "B" }],
                "nextOffset": 2
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stories": [{ "title": "C" }],
                "nextOffset": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EpicsClient::new(&test_config(&server)).unwrap();
        let records = client.fetch_all_story_records().await.unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_offset_back_to_start_terminates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stories": [{ "title": "A" }],
                "offset": 0,
                "nextOffset": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EpicsClient::new(&test_config(&server)).unwrap();
        let records = client.fetch_all_story_records().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_next_link_to_first_page_terminates() {
        let server = MockServer::start().await;
        let first_page = format!("{}{}?limit=2", server.uri(), STORIES_PATH);
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stories": [{ "title": "A", "points": 2, "status": "Done" }],
                "links": { "next": first_page }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EpicsClient::new(&test_config(&server)).unwrap();
        let stories = client.fetch_stories().await.unwrap();

        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].title, "A");
    }

    #[tokio::test]
    async fn test_next_link_to_other_host_is_not_followed() {
        let server = MockServer::start().await;
        let elsewhere = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stories": [{ "title": "A" }],
                "links": { "next": format!("{}{}?page=2", elsewhere.uri(), STORIES_PATH) }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stories": [{ "title": "B" }]
            })))
            .expect(0)
            .mount(&elsewhere)
            .await;

        let client = EpicsClient::new(&test_config(&server)).unwrap();
        let records = client.fetch_all_story_records().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_max_pages_caps_endless_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .respond_with(|req: &Request| {
                let offset: u64 = req
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "offset")
                    .and_then(|(_, v)| v.parse().ok())
                    .unwrap_or(0);
                ResponseTemplate::new(200).set_body_json(json!({
                    "stories": [{ "title": format!("S{}", offset) }],
                    "nextOffset": offset + 1
                }))
            })
            .expect(3)
            .mount(&server)
            .await;

        let mut config = test_config(&server);
        config.max_pages = 3;
        let client = EpicsClient::new(&config).unwrap();
        let records = client.fetch_all_story_records().await.unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_page_stops() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stories": [],
                "links": { "next": "https://elsewhere.test/never" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EpicsClient::new(&test_config(&server)).unwrap();
        assert!(client.fetch_all_story_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let client = EpicsClient::new(&test_config(&server)).unwrap();
        let err = client.fetch_stories().await.unwrap_err();

        assert!(matches!(err, BillingError::EpicsApi(_)));
        let message = err.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("bad token"));
    }

    #[tokio::test]
    async fn test_error_on_second_page_discards_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .and(query_param_is_missing("offset"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "stories": [{ "title": "A" }],
                "nextOffset": 1
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(STORIES_PATH))
            .and(query_param("offset", "1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = EpicsClient::new(&test_config(&server)).unwrap();
        assert!(client.fetch_all_story_records().await.is_err());
    }
}
