//! reqwest client for the hospital appointment REST API.
//!
//! Resource layout under the configured base URL:
//! - `GET    /appointments/user/{userId}` — every appointment of a user
//! - `GET    /appointments/?patient_id=…` / `?doctor_id=…` — role-scoped list
//! - `POST   /appointments/` — create, returns the stored record
//! - `GET|PUT|DELETE /appointments/{id}` — single appointment

use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use super::{ApiError, AppointmentApi, FetchScope};
use crate::config::ClientConfig;
use crate::models::{Appointment, AppointmentId, NewAppointment};

/// HTTP implementation of [`AppointmentApi`].
pub struct HttpAppointmentApi {
    base_url: Url,
    client: reqwest::Client,
    auth_token: Option<String>,
}

impl HttpAppointmentApi {
    /// Build a client from `config`.
    ///
    /// Only the connect timeout is applied unless `request_timeout_secs` is set.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("'{}': {e}", config.base_url)))?;

        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "'{}' is not an http(s) URL",
                config.base_url
            )));
        }

        let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        tracing::debug!(base_url = %base_url, "Appointment API client created");

        Ok(Self {
            base_url,
            client,
            auth_token: config.auth_token.clone(),
        })
    }

    /// Client configured from `AURA_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(&ClientConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    // ── URL construction ────────────────────────────────────

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base URLs are rejected in new(), so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn collection_url(&self) -> Url {
        self.endpoint(&["appointments", ""])
    }

    fn item_url(&self, id: &AppointmentId) -> Url {
        self.endpoint(&["appointments", id.as_str()])
    }

    fn scope_url(&self, scope: &FetchScope) -> Url {
        match scope {
            FetchScope::User(id) => self.endpoint(&["appointments", "user", id.as_str()]),
            FetchScope::Patient(id) => {
                let mut url = self.collection_url();
                url.query_pairs_mut().append_pair("patient_id", id.as_str());
                url
            }
            FetchScope::Doctor(id) => {
                let mut url = self.collection_url();
                url.query_pairs_mut().append_pair("doctor_id", id.as_str());
                url
            }
        }
    }

    // ── Request plumbing ────────────────────────────────────

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ApiError::Connection(self.base_url.to_string())
            } else if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::ResponseParsing(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| ApiError::ResponseParsing(e.to_string()))
    }
}

impl AppointmentApi for HttpAppointmentApi {
    async fn list(&self, scope: &FetchScope) -> Result<Vec<Appointment>, ApiError> {
        let response = self.send(self.client.get(self.scope_url(scope))).await?;
        Self::decode(response).await
    }

    async fn get(&self, id: &AppointmentId) -> Result<Appointment, ApiError> {
        let response = self.send(self.client.get(self.item_url(id))).await?;
        Self::decode(response).await
    }

    async fn create(&self, appointment: &NewAppointment) -> Result<Appointment, ApiError> {
        let request = self.client.post(self.collection_url()).json(appointment);
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    async fn delete(&self, id: &AppointmentId) -> Result<(), ApiError> {
        self.send(self.client.delete(self.item_url(id))).await?;
        Ok(())
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, ApiError> {
        let request = self
            .client
            .put(self.item_url(&appointment.id))
            .json(appointment);
        let response = self.send(request).await?;
        Self::decode(response).await
    }
}
