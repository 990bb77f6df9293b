use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::auth::UserProfile;

/// Non-success answer from the REST endpoint, kept typed so callers can
/// tell a unique-constraint rejection (409) apart from other failures.
#[derive(Debug, Error)]
#[error("API error ({status}): {body}")]
pub struct ApiError {
    pub status: u16,
    pub body: String,
}

impl ApiError {
    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
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

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
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

            return Err(anyhow!(ApiError {
                status: status.as_u16(),
                body: error_text,
            }));
        }

        // DELETE and minimal-return writes answer with an empty body.
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }

        let data = serde_json::from_slice::<T>(&bytes)?;
        Ok(data)
    }

    /// Look up a row of the external `users` table.
    pub async fn get_user(&self, user_id: i64, auth_token: &str) -> Result<Option<UserProfile>> {
        let path = format!(
            "/rest/v1/users?id=eq.{}&select=id,fullname,username,email,role,avatar_url",
            user_id
        );

        let result: Vec<Value> = self.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        match result.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    /// Headers asking PostgREST to echo written rows back.
    pub fn return_representation() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AppConfig {
        AppConfig {
            supabase_url: server.uri(),
            supabase_anon_key: "anon".to_string(),
            supabase_jwt_secret: "secret".to_string(),
            appointment_duration_minutes: 60,
            port: 3000,
        }
    }

    #[tokio::test]
    async fn sends_api_key_and_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server));
        let rows: Vec<Value> = client
            .request(Method::GET, "/rest/v1/users", Some("tok"), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn surfaces_conflict_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"code": "23505"})))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server));
        let err = client
            .request::<Vec<Value>>(Method::POST, "/rest/v1/appointments", None, Some(json!({})))
            .await
            .unwrap_err();
        let api = err.downcast_ref::<ApiError>().unwrap();
        assert!(api.is_conflict());
    }

    #[tokio::test]
    async fn get_user_returns_none_for_unknown_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server));
        assert!(client.get_user(99, "tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_body_decodes_as_unit() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = SupabaseClient::new(&config_for(&server));
        let result: () = client
            .request(Method::DELETE, "/rest/v1/appointments", None, None)
            .await
            .unwrap();
        assert_eq!(result, ());
    }
}
