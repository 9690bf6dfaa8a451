use crate::api::error::{FetchError, RemoteError};
use crate::api::types::{ApiErrorBody, Profile, ProjectInfo};
use crate::config::Config;
use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("projq/", env!("CARGO_PKG_VERSION"));

/// Remote source of project records.
///
/// The cache layer only talks to this trait, so it can be driven by a stub in
/// tests.
#[async_trait]
pub trait ProjectsApi: Send + Sync {
  /// `GET /platform/projects`
  async fn fetch_list(
    &self,
    signal: CancellationToken,
    headers: Option<HeaderMap>,
  ) -> Result<Vec<ProjectInfo>, FetchError>;

  /// `GET /platform/projects/{ref}`
  async fn fetch_detail(
    &self,
    project_ref: &str,
    signal: CancellationToken,
  ) -> Result<ProjectInfo, FetchError>;
}

/// Platform API client wrapper
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl ApiClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_api_token()?;
    Self::with_base_url(&config.api.url, Some(token))
  }

  /// Build a client against an explicit base URL.
  pub fn with_base_url(base_url: &str, token: Option<String>) -> Result<Self> {
    let base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API url '{}': {}", base_url, e))?;

    let http = reqwest::Client::builder()
      .user_agent(USER_AGENT)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      token,
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
    let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|e| RemoteError::transport(format!("invalid url {}: {}", joined, e)))
  }

  fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RemoteError> {
    let request = self.http.request(method, self.endpoint(path)?);
    Ok(match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    })
  }

  /// Get the signed-in user's profile
  pub async fn fetch_profile(&self) -> Result<Profile, FetchError> {
    let request = self.request(Method::GET, "/platform/profile")?;
    let response = send(request).await?;
    Ok(decode_json(response).await?)
  }

  /// Pause a project
  pub async fn pause_project(&self, project_ref: &str) -> Result<(), FetchError> {
    let path = format!("/platform/projects/{}/pause", project_ref);
    let request = self.request(Method::POST, &path)?;
    send(request).await?;
    Ok(())
  }

  /// Restore a paused project
  pub async fn restore_project(&self, project_ref: &str) -> Result<(), FetchError> {
    let path = format!("/platform/projects/{}/restore", project_ref);
    let request = self.request(Method::POST, &path)?;
    send(request).await?;
    Ok(())
  }
}

#[async_trait]
impl ProjectsApi for ApiClient {
  async fn fetch_list(
    &self,
    signal: CancellationToken,
    headers: Option<HeaderMap>,
  ) -> Result<Vec<ProjectInfo>, FetchError> {
    let mut request = self.request(Method::GET, "/platform/projects")?;
    if let Some(headers) = headers {
      request = request.headers(headers);
    }

    let projects: Vec<ProjectInfo> = cancellable(&signal, async move {
      let response = send(request).await?;
      decode_json(response).await
    })
    .await?;

    debug!(count = projects.len(), "fetched project list");
    Ok(projects)
  }

  async fn fetch_detail(
    &self,
    project_ref: &str,
    signal: CancellationToken,
  ) -> Result<ProjectInfo, FetchError> {
    let path = format!("/platform/projects/{}", project_ref);
    let request = self.request(Method::GET, &path)?;

    cancellable(&signal, async move {
      let response = send(request).await?;
      decode_json(response).await
    })
    .await
  }
}

/// Race a request against its cancellation signal.
async fn cancellable<T, F>(signal: &CancellationToken, fut: F) -> Result<T, FetchError>
where
  F: Future<Output = Result<T, RemoteError>>,
{
  tokio::select! {
    biased;
    _ = signal.cancelled() => Err(FetchError::Cancelled),
    result = fut => result.map_err(FetchError::from),
  }
}

/// Send a request, turning non-success statuses into `RemoteError::Transport`.
async fn send(request: RequestBuilder) -> Result<Response, RemoteError> {
  let response = request.send().await?;
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  // Prefer the message from the error body, fall back to the reason phrase
  let body = response.text().await.unwrap_or_default();
  let message = serde_json::from_str::<ApiErrorBody>(&body)
    .ok()
    .and_then(ApiErrorBody::into_message)
    .or_else(|| status.canonical_reason().map(String::from))
    .unwrap_or_else(|| "unknown error".to_string());

  warn!(status = status.as_u16(), %message, "platform request failed");
  Err(RemoteError::status(status.as_u16(), message))
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
  let bytes = response.bytes().await?;
  serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
}
