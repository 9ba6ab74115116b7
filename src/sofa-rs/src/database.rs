use crate::client::{read_json, revision, unexpected_status};
use crate::{Client, ClientError, Result, View};
use reqwest::header::IF_MATCH;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sofa_core::models::{envelope, AllDocsRow, Fetched, ViewResponse};

/// Handle to one database on the server
///
/// Obtained from [`Client::database`], [`Client::create_database`] or
/// [`Client::get_or_create_database`].
#[derive(Debug, Clone)]
pub struct Database {
    client: Client,
    name: String,
}

impl Database {
    pub(crate) fn new(client: Client, name: &str) -> Self {
        Self {
            client,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    fn url(&self, id: &str) -> Result<Url> {
        if id.is_empty() {
            return Err(ClientError::InvalidRequest("document id is empty".to_string()));
        }
        self.client.url(&[self.name.as_str(), id])
    }

    /// Current revision of a document, or `None` if it does not exist
    #[tracing::instrument(skip(self), fields(db = %self.name))]
    pub async fn rev(&self, id: &str) -> Result<Option<String>> {
        let request = self.client.http().head(self.url(id)?);
        let response = self.client.execute("rev", request).await?;

        match response.status() {
            StatusCode::OK => match revision(&response) {
                Some(rev) => Ok(Some(rev)),
                None => Err(ClientError::InvalidResponse("missing ETag header".to_string())),
            },
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(unexpected_status("rev", response).await),
        }
    }

    /// Fetch a document and decode its body
    ///
    /// A missing document is reported as [`ClientError::NotFound`].
    #[tracing::instrument(skip(self), fields(db = %self.name))]
    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> Result<Fetched<T>> {
        let request = self.client.http().get(self.url(id)?);
        let response = self.client.execute("get", request).await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(ClientError::NotFound),
            _ => return Err(unexpected_status("get", response).await),
        }

        let rev = revision(&response).unwrap_or_default();
        let doc = read_json(response).await?;
        Ok(Fetched { doc, rev })
    }

    /// Insert a new document under `id`, returning its first revision
    pub async fn put<T: Serialize + ?Sized>(&self, id: &str, doc: &T) -> Result<String> {
        self.write(id, None, doc).await
    }

    /// Insert a new document under a freshly generated id.
    /// Returns `(id, rev)`.
    pub async fn put_new<T: Serialize + ?Sized>(&self, doc: &T) -> Result<(String, String)> {
        let id = sofa_core::new_id();
        let rev = self.write(&id, None, doc).await?;
        Ok((id, rev))
    }

    /// Replace a document whose current revision is `rev`.
    ///
    /// A stale `rev` makes the server reject the write; that rejection is
    /// returned as [`ClientError::Server`] and nothing is retried.
    pub async fn update<T: Serialize + ?Sized>(&self, id: &str, rev: &str, doc: &T) -> Result<String> {
        self.write(id, Some(rev), doc).await
    }

    /// Insert or replace a document at whatever revision it has now.
    ///
    /// The revision lookup and the write are two requests; a concurrent
    /// writer in between makes the write fail with a conflict.
    pub async fn put_or_update<T: Serialize + ?Sized>(&self, id: &str, doc: &T) -> Result<String> {
        match self.rev(id).await? {
            None => self.put(id, doc).await,
            Some(rev) => self.update(id, &rev, doc).await,
        }
    }

    #[tracing::instrument(skip(self, doc), fields(db = %self.name))]
    async fn write<T: Serialize + ?Sized>(&self, id: &str, rev: Option<&str>, doc: &T) -> Result<String> {
        let body = envelope(id, rev, doc)?;
        let request = self.client.http().put(self.url(id)?).json(&body);
        let response = self.client.execute("put", request).await?;

        if response.status() != StatusCode::CREATED {
            return Err(unexpected_status("put", response).await);
        }

        revision(&response).ok_or_else(|| ClientError::InvalidResponse("missing ETag header".to_string()))
    }

    /// Delete a document at revision `rev`. Deleting a missing document succeeds.
    #[tracing::instrument(skip(self), fields(db = %self.name))]
    pub async fn delete(&self, id: &str, rev: &str) -> Result<()> {
        let request = self.client.http().delete(self.url(id)?).header(IF_MATCH, rev);
        let response = self.client.execute("delete", request).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            status if status.is_success() => Ok(()),
            _ => Err(unexpected_status("delete", response).await),
        }
    }

    /// Ids of every document, in the order the server lists them
    #[tracing::instrument(skip(self), fields(db = %self.name))]
    pub async fn all_ids(&self) -> Result<Vec<String>> {
        let request = self.client.http().get(self.url("_all_docs")?);
        let response = self.client.execute("all_ids", request).await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(ClientError::DatabaseNotFound(self.name.clone())),
            _ => return Err(unexpected_status("all_ids", response).await),
        }

        let all: ViewResponse<AllDocsRow> = read_json(response).await?;
        Ok(all.rows.into_iter().map(|row| row.id).collect())
    }

    /// Reference a view `view` defined in design document `design`
    pub fn view(&self, design: &str, view: &str) -> View {
        View::new(self.clone(), design, view)
    }
}
