use crate::client::{read_json, unexpected_status};
use crate::{ClientError, Database, Result};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sofa_core::models::ViewResponse;

/// A view inside a design document of one database
#[derive(Debug, Clone)]
pub struct View {
    db: Database,
    design: String,
    name: String,
}

impl View {
    pub(crate) fn new(db: Database, design: &str, name: &str) -> Self {
        Self {
            db,
            design: design.to_string(),
            name: name.to_string(),
        }
    }

    pub fn design(&self) -> &str {
        &self.design
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every row the view emits
    pub async fn all<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        Ok(self.query::<Value, R>(None, None).await?.rows)
    }

    /// Rows with `start <= key <= end`; either bound may be left open
    pub async fn range<K, R>(&self, start: Option<&K>, end: Option<&K>) -> Result<Vec<R>>
    where
        K: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        Ok(self.query(start, end).await?.rows)
    }

    /// Like [`View::range`] but returns the whole response envelope
    #[tracing::instrument(skip_all, fields(db = %self.db.name(), design = %self.design, view = %self.name))]
    pub async fn query<K, R>(&self, start: Option<&K>, end: Option<&K>) -> Result<ViewResponse<R>>
    where
        K: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(start, end)?;
        tracing::debug!(%url, "Query URL");
        let request = self.db.client().http().get(url);
        let response = self.db.client().execute("view", request).await?;

        match response.status() {
            StatusCode::OK => read_json(response).await,
            StatusCode::NOT_FOUND => Err(ClientError::NotFound),
            _ => Err(unexpected_status("view", response).await),
        }
    }

    /// Bounds are JSON-encoded; an open bound is left out of the query string
    fn url<K: Serialize + ?Sized>(&self, start: Option<&K>, end: Option<&K>) -> Result<Url> {
        let mut url = self.db.client().url(&[
            self.db.name(),
            "_design",
            self.design.as_str(),
            "_view",
            self.name.as_str(),
        ])?;

        for (param, bound) in [("startkey", start), ("endkey", end)] {
            if let Some(bound) = bound {
                let key = serde_json::to_string(bound)?;
                url.query_pairs_mut().append_pair(param, &key);
            }
        }

        Ok(url)
    }
}
