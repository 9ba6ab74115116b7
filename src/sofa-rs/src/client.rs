use crate::{ClientError, Database, Result};
use reqwest::header::ETAG;
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use sofa_core::models::unquote_etag;
use sofa_core::Config;

/// Document store REST API client
///
/// Cloning is cheap: clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    client: HttpClient,
}

impl Client {
    /// Create a new client connected to the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: HttpClient::new(),
        }
    }

    /// Create a client from configuration, applying the request timeout
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: config.url.clone(),
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get an existing database
    #[tracing::instrument(skip(self))]
    pub async fn database(&self, name: &str) -> Result<Database> {
        let url = self.database_url(name)?;
        let response = self.execute("database", self.client.get(url)).await?;

        match response.status() {
            StatusCode::OK => Ok(Database::new(self.clone(), name)),
            StatusCode::NOT_FOUND => Err(ClientError::DatabaseNotFound(name.to_string())),
            _ => Err(unexpected_status("database", response).await),
        }
    }

    /// Create a new database
    #[tracing::instrument(skip(self))]
    pub async fn create_database(&self, name: &str) -> Result<Database> {
        let url = self.database_url(name)?;
        let response = self.execute("create_database", self.client.put(url)).await?;

        if response.status() != StatusCode::CREATED {
            return Err(unexpected_status("create_database", response).await);
        }

        tracing::info!(db = %name, "Database created");
        Ok(Database::new(self.clone(), name))
    }

    /// Get a database, creating it only if the server reports it missing.
    /// Any other failure of the lookup is returned as is.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create_database(&self, name: &str) -> Result<Database> {
        match self.database(name).await {
            Err(ClientError::DatabaseNotFound(_)) => self.create_database(name).await,
            other => other,
        }
    }

    /// Delete a database. Deleting a missing database succeeds.
    ///
    /// The request goes to the server `db` was obtained from.
    #[tracing::instrument(skip(self, db), fields(db = %db.name()))]
    pub async fn delete_database(&self, db: &Database) -> Result<()> {
        let owner = db.client();
        let url = owner.database_url(db.name())?;
        let response = owner.execute("delete_database", owner.http().delete(url)).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => {
                tracing::info!("Database deleted");
                Ok(())
            }
            _ => Err(unexpected_status("delete_database", response).await),
        }
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.client
    }

    /// Root of the named database. An empty name would address the server root.
    fn database_url(&self, name: &str) -> Result<Url> {
        if name.is_empty() {
            return Err(ClientError::InvalidRequest("database name is empty".to_string()));
        }
        self.url(&[name, ""])
    }

    /// Base URL extended by the given path segments, each percent-encoded
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::InvalidRequest(format!("invalid base url '{}': {}", self.base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidRequest(format!("base url '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    /// Issue one request and hand back the response whatever its status
    pub(crate) async fn execute(&self, op: &'static str, request: RequestBuilder) -> Result<Response> {
        let request = request
            .build()
            .map_err(|e| ClientError::InvalidRequest(format!("{}: {}", op, e)))?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self.client.execute(request).await.map_err(|e| {
            tracing::warn!(op, %method, %url, "HTTP request failed: {}", e);
            ClientError::Request(e)
        })?;

        tracing::debug!(op, %method, %url, status = response.status().as_u16(), "HTTP response");
        Ok(response)
    }
}

/// Revision carried by the response's entity tag, unquoted
pub(crate) fn revision(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(unquote_etag)
        .filter(|rev| !rev.is_empty())
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.bytes().await.map_err(ClientError::Body)?;
    Ok(serde_json::from_slice(&body)?)
}

pub(crate) async fn unexpected_status(op: &'static str, response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match body.trim() {
        "" => status.canonical_reason().unwrap_or_default().to_string(),
        text => text.to_string(),
    };

    tracing::warn!(op, status = status.as_u16(), %message, "Unexpected HTTP status");
    ClientError::Server {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_url_encodes_segments() {
        let client = Client::new("http://localhost:5984");
        let url = client.url(&["tests", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5984/tests/a%20b%2Fc");
    }

    #[test]
    fn test_url_database_root_keeps_trailing_slash() {
        let client = Client::new("http://localhost:5984/");
        let url = client.url(&["tests", ""]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5984/tests/");
    }

    #[test]
    fn test_url_keeps_base_path() {
        let client = Client::new("http://proxy.local/couch");
        let url = client.url(&["tests", "doc1"]).unwrap();
        assert_eq!(url.as_str(), "http://proxy.local/couch/tests/doc1");
    }

    #[test]
    fn test_url_rejects_bad_base() {
        let client = Client::new("not a url");
        assert!(matches!(
            client.url(&["tests"]),
            Err(ClientError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_database_url_rejects_empty_name() {
        let client = Client::new("http://localhost:5984");
        assert!(matches!(
            client.database_url(""),
            Err(ClientError::InvalidRequest(_))
        ));
        assert_eq!(
            client.database_url("tests").unwrap().as_str(),
            "http://localhost:5984/tests/"
        );
    }

    #[test]
    fn test_from_config() {
        let config = Config::default()
            .with_url("http://127.0.0.1:5999")
            .with_timeout(Duration::from_millis(250));
        let client = Client::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:5999");
    }
}
