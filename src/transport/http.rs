use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};
use ureq::Agent;

use crate::config::{Category, Credentials, ExportConfig, RetryPolicy};
use crate::constants::request::{
    API_KEY_PARAM, RATE_LIMIT_EXCEEDED_STATUS_CODE, SUCCESSFUL_CALL_STATUS_CODE,
};
use crate::errors::ExportError;
use crate::types::RecordId;

/// Blocking delay used for request pacing.
pub trait Pause: Send + Sync {
    /// Block the current thread for `duration`.
    fn pause(&self, duration: Duration);
}

/// Real pause backed by `thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// Blocking client for the provider's detail endpoint and snapshot host.
pub struct CatalogClient {
    agent: Agent,
    snapshot_agent: Agent,
    api_base_url: String,
    api_key: String,
    retry: RetryPolicy,
    pause: Arc<dyn Pause>,
}

impl CatalogClient {
    /// Build a client from run configuration and the loaded credentials.
    ///
    /// Detail requests are bounded end to end by `request_timeout`, body
    /// included. Snapshot downloads get their own, longer, `snapshot_timeout`.
    pub fn new(config: &ExportConfig, credentials: &Credentials) -> Self {
        Self {
            agent: build_agent(config.request_timeout, config.request_timeout),
            snapshot_agent: build_agent(config.request_timeout, config.snapshot_timeout),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
            retry: config.retry.clone(),
            pause: Arc::new(ThreadPause),
        }
    }

    /// Replace the pause implementation.
    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    /// Detail endpoint for one identifier, without query parameters.
    pub fn detail_endpoint(&self, category: &Category, id: RecordId) -> String {
        format!("{}/{}/{}", self.api_base_url, category.name, id)
    }

    /// Query parameters sent with every detail request of `category`: the API
    /// key first, then the category's extras.
    pub fn detail_query<'a>(&'a self, category: &'a Category) -> Vec<(&'a str, &'a str)> {
        std::iter::once((API_KEY_PARAM, self.api_key.as_str()))
            .chain(category.extra_params.iter().copied())
            .collect()
    }

    /// Fetch the detail payload for one identifier.
    pub fn make_detail_request(
        &self,
        category: &Category,
        id: RecordId,
    ) -> Result<Option<Value>, ExportError> {
        self.make_request(
            &self.detail_endpoint(category, id),
            &self.detail_query(category),
        )
    }

    /// GET `url` with `query` appended, rate limiting and bounded retry.
    ///
    /// Query values are percent-encoded by the agent and never appear in logs
    /// or errors. Returns `Ok(None)` once `max_attempts` responses have failed.
    /// Transport failures (connection refused, timeouts) are returned as errors
    /// and are never retried.
    pub fn make_request(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>, ExportError> {
        for attempt in 0..self.retry.max_attempts {
            let mut request = self.agent.get(url);
            for &(key, value) in query {
                request = request.query(key, value);
            }
            let response = request.call().map_err(|source| ExportError::Transport {
                url: url.to_string(),
                source,
            })?;
            let status = response.status().as_u16();
            if status == RATE_LIMIT_EXCEEDED_STATUS_CODE {
                warn!(
                    "[catalog_export:http] rate limit exceeded; cooling down for {:.1}s",
                    self.retry.rate_limit_cooldown.as_secs_f64()
                );
                self.pause.pause(self.retry.rate_limit_cooldown);
            }
            self.pause.pause(self.retry.min_interval);
            if status == SUCCESSFUL_CALL_STATUS_CODE {
                let body = response.into_body().read_to_string().map_err(|source| {
                    ExportError::Transport {
                        url: url.to_string(),
                        source,
                    }
                })?;
                return Ok(Some(serde_json::from_str(&body)?));
            }
            debug!(
                "[catalog_export:http] attempt {} of {} returned status {} for {}",
                attempt + 1,
                self.retry.max_attempts,
                status,
                url
            );
            self.pause.pause(self.retry.failure_backoff);
        }
        Ok(None)
    }

    /// Single unpaced GET returning the status and a streaming body reader.
    pub fn open_stream(&self, url: &str) -> Result<(u16, impl Read + 'static), ExportError> {
        let response = self
            .snapshot_agent
            .get(url)
            .call()
            .map_err(|source| ExportError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = response.status().as_u16();
        Ok((status, response.into_body().into_reader()))
    }
}

fn build_agent(connect_timeout: Duration, total_timeout: Duration) -> Agent {
    let agent_config = Agent::config_builder()
        .http_status_as_error(false)
        .timeout_connect(Some(connect_timeout))
        .timeout_global(Some(total_timeout))
        .build();
    Agent::new_with_config(agent_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MOVIE;
    use crate::test_support::{RecordingPause, ScriptedServer, query_pairs, request_path};

    fn client(base_url: &str, pause: Arc<RecordingPause>) -> CatalogClient {
        let config = ExportConfig {
            api_base_url: base_url.to_string(),
            ..ExportConfig::default()
        };
        let credentials = Credentials {
            api_key: "secret".to_string(),
        };
        CatalogClient::new(&config, &credentials).with_pause(pause)
    }

    #[test]
    fn detail_endpoint_and_query_follow_category() {
        let client = client("https://api.example.test/3/", Arc::default());
        assert_eq!(
            client.detail_endpoint(&MOVIE, 550),
            "https://api.example.test/3/movie/550"
        );
        assert_eq!(
            client.detail_query(&MOVIE),
            vec![
                ("api_key", "secret"),
                ("append_to_response", "credits,keywords")
            ]
        );
    }

    #[test]
    fn detail_query_without_extras_has_only_the_key() {
        let client = client("https://api.example.test/3", Arc::default());
        let bare = Category {
            name: "person",
            extra_params: &[],
            sub_entity: None,
            keyword_wrapper: None,
        };
        assert_eq!(client.detail_query(&bare), vec![("api_key", "secret")]);
    }

    #[test]
    fn rate_limited_then_success_returns_body_after_cooldown() {
        let server = ScriptedServer::spawn_json(vec![(429, "{}"), (200, r#"{"id": 11}"#)]);
        let pause = Arc::new(RecordingPause::default());
        let client = client(&server.base_url, Arc::clone(&pause));

        let value = client
            .make_request(&format!("{}/movie/11", server.base_url), &[])
            .unwrap();

        assert_eq!(value, Some(serde_json::json!({"id": 11})));
        assert_eq!(server.hits(), 2);
        assert!(pause.total() >= Duration::from_secs(10));
        assert_eq!(
            pause.pauses(),
            vec![
                Duration::from_secs(10),
                Duration::from_millis(250),
                Duration::from_secs(1),
                Duration::from_millis(250),
            ]
        );
    }

    #[test]
    fn repeated_server_errors_exhaust_after_three_requests() {
        let server = ScriptedServer::spawn_json(vec![
            (500, "oops"),
            (500, "oops"),
            (500, "oops"),
            (200, r#"{"id": 1}"#),
        ]);
        let pause = Arc::new(RecordingPause::default());
        let client = client(&server.base_url, Arc::clone(&pause));

        let value = client
            .make_request(&format!("{}/movie/1", server.base_url), &[])
            .unwrap();

        assert_eq!(value, None);
        assert_eq!(server.hits(), 3);
        assert_eq!(pause.total(), Duration::from_millis(3 * 1250));
    }

    #[test]
    fn detail_request_sends_key_and_extras() {
        let server = ScriptedServer::spawn_json(vec![(200, r#"{"id": 550}"#)]);
        let client = client(&server.base_url, Arc::default());

        let value = client.make_detail_request(&MOVIE, 550).unwrap();

        assert_eq!(value, Some(serde_json::json!({"id": 550})));
        let lines = server.request_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(request_path(&lines[0]), "/movie/550");
        assert_eq!(
            query_pairs(&lines[0]),
            vec![
                ("api_key".to_string(), "secret".to_string()),
                (
                    "append_to_response".to_string(),
                    "credits,keywords".to_string()
                ),
            ]
        );
    }

    #[test]
    fn reserved_characters_in_the_key_are_encoded() {
        let server = ScriptedServer::spawn_json(vec![(200, r#"{"id": 5}"#)]);
        let config = ExportConfig {
            api_base_url: server.base_url.clone(),
            ..ExportConfig::default()
        };
        let credentials = Credentials {
            api_key: "a&b=c#d".to_string(),
        };
        let client = CatalogClient::new(&config, &credentials).with_pause(Arc::new(RecordingPause::default()));

        client.make_detail_request(&MOVIE, 5).unwrap();

        let line = &server.request_lines()[0];
        assert!(!line.contains("a&b=c#d"), "raw key on the wire: {line}");
        assert_eq!(
            query_pairs(line),
            vec![
                ("api_key".to_string(), "a&b=c#d".to_string()),
                (
                    "append_to_response".to_string(),
                    "credits,keywords".to_string()
                ),
            ]
        );
    }

    #[test]
    fn invalid_json_on_success_is_an_error() {
        let server = ScriptedServer::spawn_json(vec![(200, "not json")]);
        let client = client(&server.base_url, Arc::default());
        let result = client.make_request(&format!("{}/movie/1", server.base_url), &[]);
        assert!(matches!(result, Err(ExportError::Json(_))));
    }

    #[test]
    fn connection_failures_propagate_without_the_key() {
        let client = client("http://127.0.0.1:1", Arc::default());
        let result = client.make_detail_request(&MOVIE, 1);
        match result {
            Err(ExportError::Transport { url, .. }) => {
                assert_eq!(url, "http://127.0.0.1:1/movie/1");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn stalled_body_times_out() {
        let server = ScriptedServer::spawn_stalled_body(Duration::from_secs(5));
        let config = ExportConfig {
            api_base_url: server.base_url.clone(),
            request_timeout: Duration::from_millis(300),
            ..ExportConfig::default()
        };
        let credentials = Credentials {
            api_key: "secret".to_string(),
        };
        let client = CatalogClient::new(&config, &credentials).with_pause(Arc::new(RecordingPause::default()));

        let started = std::time::Instant::now();
        let result = client.make_detail_request(&MOVIE, 1);

        assert!(matches!(result, Err(ExportError::Transport { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
