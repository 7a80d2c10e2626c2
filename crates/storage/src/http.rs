use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::repository::{Collection, PersistentStore, RemoteDataSource, Storage, StorageError};

/// Remote data source speaking to a REST document server
/// (`/questions`, `/quizzes`, `/results`, `/users`).
///
/// Updates are sent as `PATCH` so the server merges fields shallowly.
#[derive(Clone)]
pub struct HttpDataSource {
    client: Client,
    base: Url,
}

impl HttpDataSource {
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if `base` cannot carry a path or the
    /// HTTP client cannot be built.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, StorageError> {
        if base.cannot_be_a_base() {
            return Err(StorageError::Connection(format!(
                "{base} cannot be used as an API base url"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self { client, base })
    }

    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, collection: Collection, id: Option<u64>) -> Result<Url, StorageError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                StorageError::Connection("base url cannot carry a path".into())
            })?;
            segments.pop_if_empty().push(collection.as_str());
            if let Some(id) = id {
                segments.push(&id.to_string());
            }
        }
        Ok(url)
    }
}

fn transport(e: reqwest::Error) -> StorageError {
    if e.is_decode() {
        StorageError::Serialization(e.to_string())
    } else {
        StorageError::Network(e.to_string())
    }
}

fn check(response: Response) -> Result<Response, StorageError> {
    match status_error(response.status()) {
        Some(e) => Err(e),
        None => Ok(response),
    }
}

/// Server errors count as unreachable; other failures are definite answers.
fn status_error(status: StatusCode) -> Option<StorageError> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::NOT_FOUND => StorageError::NotFound,
        StatusCode::CONFLICT => StorageError::Conflict,
        s if s.is_server_error() => StorageError::Network(format!("server answered {s}")),
        s => StorageError::Status(s.as_u16()),
    })
}

async fn json_body(response: Response) -> Result<Value, StorageError> {
    check(response)?.json::<Value>().await.map_err(transport)
}

#[async_trait]
impl RemoteDataSource for HttpDataSource {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StorageError> {
        let url = self.endpoint(collection, None)?;
        debug!(%url, "GET collection");
        let response = self.client.get(url).send().await.map_err(transport)?;
        let body = json_body(response).await?;
        match body {
            Value::Array(items) => Ok(items),
            _ => Err(StorageError::Serialization(format!(
                "{collection} listing is not a JSON array"
            ))),
        }
    }

    async fn get(&self, collection: Collection, id: u64) -> Result<Value, StorageError> {
        let url = self.endpoint(collection, Some(id))?;
        debug!(%url, "GET entity");
        let response = self.client.get(url).send().await.map_err(transport)?;
        json_body(response).await
    }

    async fn create(&self, collection: Collection, entity: Value) -> Result<Value, StorageError> {
        let url = self.endpoint(collection, None)?;
        debug!(%url, "POST entity");
        let response = self
            .client
            .post(url)
            .json(&entity)
            .send()
            .await
            .map_err(transport)?;
        json_body(response).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: u64,
        patch: Value,
    ) -> Result<Value, StorageError> {
        let url = self.endpoint(collection, Some(id))?;
        debug!(%url, "PATCH entity");
        let response = self
            .client
            .patch(url)
            .json(&patch)
            .send()
            .await
            .map_err(transport)?;
        json_body(response).await
    }

    async fn delete(&self, collection: Collection, id: u64) -> Result<(), StorageError> {
        let url = self.endpoint(collection, Some(id))?;
        debug!(%url, "DELETE entity");
        let response = self.client.delete(url).send().await.map_err(transport)?;
        check(response).map(|_| ())
    }
}

impl Storage {
    /// Build a `Storage` whose remote tier is the REST server at `base`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the client cannot be configured.
    pub fn http(
        base: Url,
        timeout: Duration,
        local: Arc<dyn PersistentStore>,
    ) -> Result<Self, StorageError> {
        let remote: Arc<dyn RemoteDataSource> = Arc::new(HttpDataSource::new(base, timeout)?);
        Ok(Self { remote, local })
    }
}
