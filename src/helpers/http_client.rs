use std::time::Duration;

use log::{debug, error};
use serde_json::Value;
use thiserror::Error;

/// Error types that can occur when interacting with HTTP endpoints.
///
/// 401 and 204 get their own variants because the poller's state machine
/// branches on them: 401 triggers a token re-acquisition and 204 means
/// "nothing is playing", neither of which is a failure of the service.
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("HTTP request error: {0}")]
    RequestError(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Unauthorized (HTTP 401): {0}")]
    Unauthorized(String),

    #[error("Server error (HTTP {status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Empty response from server")]
    EmptyResponse,
}

/// A trait for HTTP client implementations
/// This version avoids generic methods to enable dynamic dispatch
pub trait HttpClient: Send + Sync + std::fmt::Debug {
    /// Send a GET request with headers and return the JSON body.
    ///
    /// A 204 response maps to `EmptyResponse`, a 401 to `Unauthorized`,
    /// any other non-success status to `ServerError`.
    fn get_json_with_headers(&self, url: &str, headers: &[(&str, &str)])
        -> Result<Value, HttpClientError>;

    /// Send a POST request with a form-encoded body and custom headers,
    /// returning the JSON body.
    fn post_form_with_headers(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Value, HttpClientError>;

    /// Clone the client as a boxed trait object
    fn clone_box(&self) -> Box<dyn HttpClient>;
}

impl Clone for Box<dyn HttpClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

fn log_header(name: &str, value: &str) {
    debug!("Adding header '{}': '{}'", name, if name == "Authorization" {
        // Don't log the full credential but show the first few characters
        if value.len() > 15 {
            format!("{}...", &value[0..15])
        } else {
            "[hidden]".to_string()
        }
    } else {
        value.to_string()
    });
}

fn status_error(code: u16, body: String) -> HttpClientError {
    if code == 401 {
        error!("HTTP 401 Unauthorized: {}", body);
        HttpClientError::Unauthorized(body)
    } else {
        error!("HTTP error {}: {}", code, body);
        HttpClientError::ServerError { status: code, body }
    }
}

fn parse_json_body(response: ureq::Response) -> Result<Value, HttpClientError> {
    let response_text = match response.into_string() {
        Ok(text) => text,
        Err(e) => {
            debug!("Failed to read response body: {}", e);
            return Err(HttpClientError::ParseError(format!(
                "Failed to read response body: {}",
                e
            )));
        }
    };

    if response_text.is_empty() {
        return Err(HttpClientError::EmptyResponse);
    }

    match serde_json::from_str::<Value>(&response_text) {
        Ok(json_value) => Ok(json_value),
        Err(e) => {
            debug!("Failed to parse JSON response: {}", e);
            debug!("Response text: {}", response_text);
            Err(HttpClientError::ParseError(e.to_string()))
        }
    }
}

/// An HTTP client implementation using ureq
#[derive(Clone, Debug)]
pub struct UreqHttpClient {
    timeout: Duration,
}

impl Default for UreqHttpClient {
    fn default() -> Self {
        Self::new(10)
    }
}

impl UreqHttpClient {
    /// Create a new HTTP client with the specified timeout
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl HttpClient for UreqHttpClient {
    fn get_json_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Value, HttpClientError> {
        debug!("GET request to {}", url);

        let mut request = ureq::get(url).timeout(self.timeout);
        for &(name, value) in headers {
            log_header(name, value);
            request = request.set(name, value);
        }

        let response = match request.call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, response)) => {
                let body = response
                    .into_string()
                    .unwrap_or_else(|_| "<failed to read response body>".to_string());
                return Err(status_error(code, body));
            }
            Err(e) => {
                error!("GET request failed: {}", e);
                return Err(HttpClientError::RequestError(e.to_string()));
            }
        };

        debug!("GET request succeeded with status: {}", response.status());

        if response.status() == 204 {
            return Err(HttpClientError::EmptyResponse);
        }

        parse_json_body(response)
    }

    fn post_form_with_headers(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Value, HttpClientError> {
        debug!("POST form request to {}", url);

        let mut request = ureq::post(url).timeout(self.timeout);
        for &(name, value) in headers {
            log_header(name, value);
            request = request.set(name, value);
        }

        let response = match request.send_form(form) {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, response)) => {
                let body = response
                    .into_string()
                    .unwrap_or_else(|_| "<failed to read response body>".to_string());
                return Err(status_error(code, body));
            }
            Err(e) => {
                error!("POST form request failed: {}", e);
                return Err(HttpClientError::RequestError(e.to_string()));
            }
        };

        parse_json_body(response)
    }

    fn clone_box(&self) -> Box<dyn HttpClient> {
        Box::new(self.clone())
    }
}

/// Create a new HTTP client using the default implementation
pub fn new_http_client(timeout_secs: u64) -> Box<dyn HttpClient> {
    Box::new(UreqHttpClient::new(timeout_secs))
}

#[cfg(test)]
pub mod mock {
    //! Scripted HTTP client for tests. Responses are consumed in order and
    //! every request is recorded for later assertions.

    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: &'static str,
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub form: Vec<(String, String)>,
    }

    #[derive(Debug, Clone, Default)]
    pub struct ScriptedHttpClient {
        responses: Arc<Mutex<VecDeque<Result<Value, HttpClientError>>>>,
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    impl ScriptedHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the next response
        pub fn push(&self, response: Result<Value, HttpClientError>) {
            self.responses.lock().push_back(response);
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }

        fn record(&self, method: &'static str, url: &str, headers: &[(&str, &str)], form: &[(&str, &str)]) {
            self.requests.lock().push(RecordedRequest {
                method,
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                form: form
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });
        }

        fn next_response(&self) -> Result<Value, HttpClientError> {
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(HttpClientError::RequestError("no scripted response".to_string())))
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn get_json_with_headers(
            &self,
            url: &str,
            headers: &[(&str, &str)],
        ) -> Result<Value, HttpClientError> {
            self.record("GET", url, headers, &[]);
            self.next_response()
        }

        fn post_form_with_headers(
            &self,
            url: &str,
            form: &[(&str, &str)],
            headers: &[(&str, &str)],
        ) -> Result<Value, HttpClientError> {
            self.record("POST", url, headers, form);
            self.next_response()
        }

        fn clone_box(&self) -> Box<dyn HttpClient> {
            Box::new(self.clone())
        }
    }
}
