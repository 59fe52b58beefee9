//! HTTP client for the schedule service.

use std::time::Duration;

use agenda_core::{
    AgendaError, AgendaResult, Category, CategoryId, Color, Event, EventDraft, EventId,
    EventPatch, EventQuery, EventService, FetchedEvent,
};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::wire::{CategoryBody, CategoryRecord, ErrorBody, EventBody, EventRecord};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials attached to every request.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Session {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// What a request was about, used to give status codes a meaning.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Events,
    Event(EventId),
    Categories,
    Category(CategoryId),
}

/// `EventService` backed by the REST API.
pub struct HttpService {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl HttpService {
    pub fn new(base_url: &str, session: Session) -> AgendaResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AgendaError::Config(format!("Could not build HTTP client: {e}")))?;

        Ok(HttpService {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, target: Target) -> AgendaResult<Response> {
        let response = self
            .session
            .authorize(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "Service responded");
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
        Err(status_error(status, message, target))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, target: Target) -> AgendaResult<T> {
        self.send(request, target)
            .await?
            .json()
            .await
            .map_err(|e| AgendaError::Serialization(e.to_string()))
    }
}

fn saved_id(id: EventId) -> AgendaResult<i64> {
    match id {
        EventId::Saved(id) => Ok(id),
        EventId::Temporary(_) => Err(AgendaError::Validation(format!(
            "Event {id} has not been saved yet"
        ))),
    }
}

fn transport_error(error: reqwest::Error) -> AgendaError {
    if error.is_timeout() {
        AgendaError::Timeout(REQUEST_TIMEOUT.as_secs())
    } else {
        AgendaError::Remote(error.to_string())
    }
}

fn status_error(status: StatusCode, message: String, target: Target) -> AgendaError {
    match (status, target) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => AgendaError::Unauthorized(message),
        (StatusCode::NOT_FOUND, Target::Event(id)) => AgendaError::EventNotFound(id),
        (StatusCode::NOT_FOUND, Target::Category(id)) => AgendaError::CategoryNotFound(id),
        (StatusCode::CONFLICT, Target::Category(id)) => AgendaError::CategoryInUse(id),
        _ => AgendaError::Remote(format!("{} {}", status.as_u16(), message)),
    }
}

#[async_trait]
impl EventService for HttpService {
    /// GET /events
    async fn list_events(&self, query: &EventQuery) -> AgendaResult<Vec<FetchedEvent>> {
        let mut params = vec![
            ("start", query.range.start.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ("end", query.range.end.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ];
        if let Some(category) = query.category {
            params.push(("categoryId", category.to_string()));
        }
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }

        let records: Vec<EventRecord> = self
            .fetch(self.http.get(self.url("/events")).query(&params), Target::Events)
            .await?;
        records.into_iter().map(EventRecord::into_fetched).collect()
    }

    /// GET /events without a range returns masters only.
    async fn list_masters(&self) -> AgendaResult<Vec<Event>> {
        let records: Vec<EventRecord> = self
            .fetch(self.http.get(self.url("/events")), Target::Events)
            .await?;
        records.into_iter().map(EventRecord::into_event).collect()
    }

    /// POST /events
    async fn create_event(&self, draft: &EventDraft) -> AgendaResult<Event> {
        let body = EventBody::from(&EventPatch::from(draft));
        let record: EventRecord = self
            .fetch(self.http.post(self.url("/events")).json(&body), Target::Events)
            .await?;
        record.into_event()
    }

    /// PUT /events/:id
    async fn update_event(&self, id: EventId, patch: &EventPatch) -> AgendaResult<Event> {
        let path = format!("/events/{}", saved_id(id)?);
        let record: EventRecord = self
            .fetch(
                self.http.put(self.url(&path)).json(&EventBody::from(patch)),
                Target::Event(id),
            )
            .await?;
        record.into_event()
    }

    /// DELETE /events/:id
    async fn delete_event(&self, id: EventId) -> AgendaResult<()> {
        let path = format!("/events/{}", saved_id(id)?);
        self.send(self.http.delete(self.url(&path)), Target::Event(id))
            .await?;
        Ok(())
    }

    /// GET /categories
    async fn list_categories(&self) -> AgendaResult<Vec<Category>> {
        let records: Vec<CategoryRecord> = self
            .fetch(self.http.get(self.url("/categories")), Target::Categories)
            .await?;
        Ok(records.into_iter().map(Category::from).collect())
    }

    /// POST /categories
    async fn create_category(&self, name: &str, color: &Color) -> AgendaResult<Category> {
        let body = CategoryBody {
            name,
            color: color.as_str(),
        };
        let record: CategoryRecord = self
            .fetch(self.http.post(self.url("/categories")).json(&body), Target::Categories)
            .await?;
        Ok(record.into())
    }

    /// PUT /categories/:id
    async fn update_category(
        &self,
        id: CategoryId,
        name: &str,
        color: &Color,
    ) -> AgendaResult<Category> {
        let body = CategoryBody {
            name,
            color: color.as_str(),
        };
        let record: CategoryRecord = self
            .fetch(
                self.http.put(self.url(&format!("/categories/{id}"))).json(&body),
                Target::Category(id),
            )
            .await?;
        Ok(record.into())
    }

    /// DELETE /categories/:id
    async fn delete_category(&self, id: CategoryId) -> AgendaResult<()> {
        self.send(
            self.http.delete(self.url(&format!("/categories/{id}"))),
            Target::Category(id),
        )
        .await?;
        Ok(())
    }
}
