use std::fmt;
use std::string::FromUtf8Error;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://192.168.2.1";
pub const LIST_PATH: &str = "/DataLogs?Action=LIST";

#[derive(Debug, Error)]
pub enum DataLogError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Status(#[from] HttpStatusError),
    #[error("listing is not valid UTF-8: {0}")]
    Decode(#[from] FromUtf8Error),
}

impl DataLogError {
    pub fn status_kind(&self) -> Option<HttpStatusKind> {
        match self {
            DataLogError::Status(err) => Some(err.kind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatusKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Other,
}

impl HttpStatusKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => HttpStatusKind::Unauthorized,
            StatusCode::FORBIDDEN => HttpStatusKind::Forbidden,
            StatusCode::NOT_FOUND => HttpStatusKind::NotFound,
            _ => HttpStatusKind::Other,
        }
    }
}

/// Non-success response from the controller, tagged with its status class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStatusError {
    pub kind: HttpStatusKind,
    pub status: StatusCode,
    pub reason: String,
}

impl HttpStatusError {
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            kind: HttpStatusKind::from_status(status),
            status,
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.status.as_u16();
        match self.kind {
            HttpStatusKind::Unauthorized => {
                write!(f, "HTTP {code}: Unauthorized (missing authorization)")
            }
            HttpStatusKind::Forbidden => write!(f, "HTTP {code}: Forbidden (access denied)"),
            HttpStatusKind::NotFound => write!(f, "HTTP {code}: Resource not found"),
            HttpStatusKind::Other => write!(f, "HTTP {code}: {}", self.reason),
        }
    }
}

impl std::error::Error for HttpStatusError {}

#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// The controller ships a self-signed certificate, so validation is off by default.
    pub accept_invalid_certs: bool,
    pub timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            accept_invalid_certs: true,
            timeout: None,
        }
    }
}

#[derive(Clone)]
pub struct DataLogClient {
    http: Client,
    base_url: String,
}

impl DataLogClient {
    pub fn new() -> Result<Self, DataLogError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, DataLogError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    pub fn with_options(base_url: &str, options: ClientOptions) -> Result<Self, DataLogError> {
        Url::parse(base_url)?;
        let mut builder = Client::builder().danger_accept_invalid_certs(options.accept_invalid_certs);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn listing_url(&self) -> Result<Url, DataLogError> {
        Ok(Url::parse(&format!("{}{}", self.base_url, LIST_PATH))?)
    }

    /// Download URL for a listed path; listed paths are absolute on the controller.
    pub fn file_url(&self, remote_path: &str) -> Result<Url, DataLogError> {
        Ok(Url::parse(&format!("{}{}", self.base_url, remote_path))?)
    }

    pub async fn fetch_listing(&self) -> Result<Vec<String>, DataLogError> {
        let response = self.http.get(self.listing_url()?).send().await?;
        let response = Self::check_status(response)?;
        let body = String::from_utf8(response.bytes().await?.to_vec())?;
        Ok(parse_listing(&body))
    }

    /// Issues the GET for a listed file and returns the response once its status is a success.
    pub async fn fetch_file(&self, remote_path: &str) -> Result<Response, DataLogError> {
        let response = self.http.get(self.file_url(remote_path)?).send().await?;
        Ok(Self::check_status(response)?)
    }

    fn check_status(response: Response) -> Result<Response, HttpStatusError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(HttpStatusError::from_status(response.status()))
        }
    }
}

pub fn parse_listing(body: &str) -> Vec<String> {
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
