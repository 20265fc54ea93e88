use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

pub const PREFER_REPRESENTATION: &str = "return=representation";
pub const PREFER_IGNORE_DUPLICATES: &str = "resolution=ignore-duplicates,return=representation";

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

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
                409 => anyhow!("Conflict: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        // DELETE/PATCH without a representation come back empty
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Array(vec![]))?);
        }

        let data = serde_json::from_str::<T>(&text)?;
        Ok(data)
    }

    /// `SELECT` rows from a PostgREST table. `query` is the raw filter string
    /// without the leading `?`.
    pub async fn select<T>(&self, table: &str, query: &str, auth_token: Option<&str>) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let path = table_path(table, query);
        self.request(Method::GET, &path, auth_token, None).await
    }

    pub async fn insert<T>(&self, table: &str, query: &str, rows: Value,
                           prefer: &'static str, auth_token: Option<&str>) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let path = table_path(table, query);
        self.request_with_headers(Method::POST, &path, auth_token, Some(rows), Some(prefer_header(prefer))).await
    }

    pub async fn update<T>(&self, table: &str, query: &str, patch: Value,
                           auth_token: Option<&str>) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let path = table_path(table, query);
        self.request_with_headers(
            Method::PATCH,
            &path,
            auth_token,
            Some(patch),
            Some(prefer_header(PREFER_REPRESENTATION)),
        ).await
    }

    pub async fn delete<T>(&self, table: &str, query: &str, auth_token: Option<&str>) -> Result<Vec<T>>
    where T: DeserializeOwned {
        let path = table_path(table, query);
        self.request_with_headers(
            Method::DELETE,
            &path,
            auth_token,
            None,
            Some(prefer_header(PREFER_REPRESENTATION)),
        ).await
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

fn table_path(table: &str, query: &str) -> String {
    if query.is_empty() {
        format!("/rest/v1/{}", table)
    } else {
        format!("/rest/v1/{}?{}", table, query)
    }
}

fn prefer_header(value: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static(value));
    headers
}
