//! Native HTTP client using reqwest

use super::{HttpError, HttpResponse, HttpTransport};
use reqwest::Client;
use std::time::Duration;

pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::RequestFailed {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

impl HttpTransport for HttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();

        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| HttpError::ParseError {
            message: e.to_string(),
        })?;

        let response = HttpResponse {
            status,
            body,
            headers,
        };

        if status == 429 {
            return Err(HttpError::RateLimited {
                retry_after: response.retry_after(),
            });
        }

        Ok(response)
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout
    } else if e.is_connect() {
        HttpError::Connect {
            message: e.to_string(),
        }
    } else if e.is_builder() {
        HttpError::InvalidUrl {
            url: e.url().map(|u| u.to_string()).unwrap_or_default(),
        }
    } else {
        HttpError::RequestFailed {
            message: e.to_string(),
        }
    }
}
