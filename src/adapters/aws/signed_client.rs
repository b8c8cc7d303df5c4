use crate::utils::error::{ExportError, Result};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningParams, SigningSettings};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::SystemTime;
use url::Url;

/// JSON-over-HTTPS client signing every request with SigV4.
#[derive(Clone)]
pub struct SignedClient {
    http: Client,
    credentials: SharedCredentialsProvider,
    region: String,
    service: &'static str,
    endpoint: Url,
}

impl std::fmt::Debug for SignedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedClient")
            .field("region", &self.region)
            .field("service", &self.service)
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl SignedClient {
    pub fn new(
        http: Client,
        credentials: SharedCredentialsProvider,
        region: impl Into<String>,
        service: &'static str,
        endpoint: &str,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| ExportError::InvalidConfigValueError {
            field: format!("{}_endpoint", service),
            value: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            http,
            credentials,
            region: region.into(),
            service,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Endpoint URL with `segments` appended to its path.
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ExportError::config(format!("{} cannot be used as a base URL", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a signed request and decodes the JSON answer. Non-2xx answers
    /// become [`ExportError::ServiceError`].
    pub async fn send_json(
        &self,
        method: Method,
        url: Url,
        headers: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let body = match body {
            Some(value) => serde_json::to_vec(value)?,
            None => Vec::new(),
        };
        let mut all_headers: Vec<(&str, &str)> = headers.to_vec();
        if !body.is_empty() && !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
            all_headers.push(("content-type", "application/json"));
        }

        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| ExportError::CredentialsError {
                message: e.to_string(),
            })?;
        let identity: Identity = credentials.into();
        let params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(self.service)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| ExportError::SigningError {
                message: e.to_string(),
            })?
            .into();

        let signable = SignableRequest::new(
            method.as_str(),
            url.as_str(),
            all_headers.iter().copied(),
            SignableBody::Bytes(&body),
        )
        .map_err(|e| ExportError::SigningError {
            message: e.to_string(),
        })?;
        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| ExportError::SigningError {
                message: e.to_string(),
            })?
            .into_parts();

        let mut request = self.http.request(method.clone(), url.clone());
        for (name, value) in &all_headers {
            request = request.header(*name, *value);
        }
        for (name, value) in instructions.headers() {
            request = request.header(name, value);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        tracing::debug!("{} {} {}", self.service, method, url.path());
        let response = request.send().await?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(service_error(self.service, status, &response_headers, &bytes));
        }
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Maps an AWS JSON error answer (REST-JSON or JSON 1.1) to a service error.
pub fn service_error(service: &str, status: StatusCode, headers: &HeaderMap, body: &[u8]) -> ExportError {
    let document: Option<Value> = serde_json::from_slice(body).ok();
    let field = |name: &str| {
        document
            .as_ref()
            .and_then(|d| d.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let code = headers
        .get("x-amzn-errortype")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(':').next().unwrap_or(v).to_string())
        .or_else(|| field("__type").map(|t| t.rsplit('#').next().unwrap_or(&t).to_string()))
        .or_else(|| field("Code"))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
    let message = field("Message")
        .or_else(|| field("message"))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    ExportError::ServiceError {
        service: service.to_string(),
        status: status.as_u16(),
        code,
        message,
    }
}
