use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::ACCEPT};
use serde::de::DeserializeOwned;

use crate::domain::employee::Employee;
use crate::domain::status::TicketStatus;
use crate::domain::ticket::{Ticket, TicketId};
use crate::error::{AppError, AppResult};
use crate::services::{CollectionSource, StatusEndpoint};

const TICKETS_PATH: &str = "tickets/";
const EMPLOYEES_PATH: &str = "mitarbeiter/";

/// HTTP client for the CMS that stores tickets and employees.
#[derive(Clone)]
pub struct CmsClient {
    http: Client,
    base_url: String,
}

impl CmsClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> AppResult<Self> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(AppError::Configuration(
                "backend base URL must not be empty".to_string(),
            ));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| AppError::Configuration(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn tickets(&self) -> JsonCollection<Ticket> {
        JsonCollection::new(self.http.clone(), self.endpoint(TICKETS_PATH))
    }

    pub fn employees(&self) -> JsonCollection<Employee> {
        JsonCollection::new(self.http.clone(), self.endpoint(EMPLOYEES_PATH))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn status_endpoint(&self, status: TicketStatus, id: &TicketId) -> String {
        self.endpoint(&format!("api/{}/{}/", status.action_name(), id))
    }
}

#[async_trait]
impl StatusEndpoint for CmsClient {
    async fn set_status(&self, status: TicketStatus, id: &TicketId) -> AppResult<String> {
        if id.is_empty() {
            return Err(AppError::InvalidInput(
                "ticket id must not be empty".to_string(),
            ));
        }

        let url = self.status_endpoint(status, id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| AppError::Transport(format!("failed to call {url}: {err}")))?;

        let code = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read response>".to_string());

        if !code.is_success() {
            return Err(AppError::Rejected(format!(
                "backend responded with {code}: {}",
                body.trim()
            )));
        }

        let confirmation = body.trim();
        if confirmation.is_empty() {
            return Err(AppError::Rejected(format!(
                "no confirmation for ticket {id}"
            )));
        }
        if confirmation.contains("not allowed") {
            return Err(AppError::Rejected(confirmation.to_string()));
        }

        Ok(confirmation.to_string())
    }
}

/// A JSON array endpoint decoded into `T` records.
pub struct JsonCollection<T> {
    http: Client,
    url: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonCollection<T> {
    pub fn new(http: Client, url: String) -> Self {
        Self {
            http,
            url,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<T> CollectionSource<T> for JsonCollection<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> AppResult<Vec<T>> {
        let response = self
            .http
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| AppError::Transport(format!("failed to call {}: {err}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Transport(format!(
                "{} responded with {status}",
                self.url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|err| AppError::Transport(format!("failed to read {}: {err}", self.url)))?;

        serde_json::from_str::<Vec<T>>(&body)
            .map_err(|err| AppError::Decode(format!("invalid collection at {}: {err}", self.url)))
    }
}
