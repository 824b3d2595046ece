use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::store::{DocumentStore, StoreError};

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self, extra: Option<HeaderMap>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.service_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.service_key))?,
        );

        if let Some(extra) = extra {
            headers.extend(extra);
        }

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self.client.request(method, &url)
            .headers(self.get_headers(extra_headers)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        Ok(response)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        let response = self.send(method, path, body, None).await?;
        Ok(response.json::<T>().await?)
    }

    /// Like [`request`](Self::request) for calls whose response body is empty
    /// or irrelevant (`return=minimal` writes, deletes).
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<()> {
        self.send(method, path, body, extra_headers).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DocumentRow {
    document: Value,
}

/// Document store backed by PostgREST. Each collection is a table with an
/// `id` primary key and a `document` jsonb column.
pub struct SupabaseDocumentStore {
    supabase: SupabaseClient,
}

impl SupabaseDocumentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

fn backend(e: anyhow::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl DocumentStore for SupabaseDocumentStore {
    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=minimal"),
        );

        self.supabase.execute(
            Method::POST,
            &format!("/rest/v1/{}", collection),
            Some(json!({ "id": id, "document": document })),
            Some(headers),
        ).await.map_err(backend)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let path = format!("/rest/v1/{}?id=eq.{}&select=document", collection, id);
        let rows: Vec<DocumentRow> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(backend)?;

        Ok(rows.into_iter().next().map(|row| row.document))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let path = format!("/rest/v1/{}?select=document", collection);
        let rows: Vec<DocumentRow> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(backend)?;

        Ok(rows.into_iter().map(|row| row.document).collect())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let path = format!("/rest/v1/{}?id=eq.{}", collection, id);
        self.supabase.execute(Method::DELETE, &path, None, None).await.map_err(backend)
    }
}
