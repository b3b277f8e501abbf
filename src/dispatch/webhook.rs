use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::{Ack, DispatchError, Transport};

/// HTTP POST of the report as `application/json`. Any 2xx is success.
pub struct WebhookTransport {
    url: Url,
    client: Client,
}

impl WebhookTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let url = Url::parse(endpoint)
            .map_err(|e| DispatchError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DispatchError::InvalidEndpoint(format!(
                "{endpoint}: webhook needs an http or https url"
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }
}

impl Transport for WebhookTransport {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn send(&self, payload: &[u8]) -> Result<Ack, DispatchError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(Ack {
            bytes_sent: payload.len(),
            status: Some(status.as_u16()),
        })
    }
}

fn classify(err: reqwest::Error) -> DispatchError {
    if err.is_timeout() {
        DispatchError::Timeout
    } else if err.is_connect() {
        DispatchError::Unreachable(err.to_string())
    } else {
        DispatchError::Http(err)
    }
}
