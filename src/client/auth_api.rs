use std::sync::Arc;

use reqwest::{Client, Response, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, warn};

use super::store::{Action, Store};
use crate::{
    auth::dto::{AccessTokenResponse, LoginRequest},
    users::dto::MessageResponse,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("invalid base url: {0}")]
    BaseUrl(String),
}

/// Bindings for the `/auth` endpoints. Results are dispatched into the shared
/// [`Store`]; the refresh cookie lives in the HTTP client's cookie jar.
#[derive(Clone)]
pub struct AuthClient {
    http: Client,
    base_url: Url,
    store: Arc<Store>,
}

impl AuthClient {
    pub fn new(base_url: &str, store: Arc<Store>) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::BaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::BaseUrl(base_url.to_string()));
        }
        let http = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url,
            store,
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn check(res: Response) -> Result<Response, ClientError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let message = match res.json::<MessageResponse>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
        };
        Err(ClientError::Api { status, message })
    }

    /// Submits credentials; on success stores and returns the access token.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<String, ClientError> {
        let res = self
            .http
            .post(self.endpoint(&["auth"]))
            .json(credentials)
            .send()
            .await?;
        let body: AccessTokenResponse = Self::check(res).await?.json().await?;
        self.store.dispatch(Action::SetCredentials {
            access_token: body.access_token.clone(),
        });
        debug!("logged in");
        Ok(body.access_token)
    }

    /// Ends the server session and clears local credentials. A failed request
    /// is logged and the client still ends up logged out.
    pub async fn send_logout(&self) {
        let result = match self.http.post(self.endpoint(&["auth", "logout"])).send().await {
            Ok(res) => Self::check(res).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!(error = %e, "logout request failed");
        }
        self.store.dispatch(Action::LogOut);
    }

    /// Silently obtains a new access token. Failures are logged and leave the
    /// stored credentials untouched.
    pub async fn refresh(&self) -> Option<String> {
        let result = async {
            let res = self
                .http
                .get(self.endpoint(&["auth", "refresh"]))
                .send()
                .await?;
            let body: AccessTokenResponse = Self::check(res).await?.json().await?;
            Ok::<_, ClientError>(body.access_token)
        }
        .await;

        match result {
            Ok(access_token) => {
                self.store.dispatch(Action::SetCredentials {
                    access_token: access_token.clone(),
                });
                Some(access_token)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                None
            }
        }
    }

    pub async fn resend_confirmation_email(&self, email: &str) -> Result<(), ClientError> {
        let res = self
            .http
            .get(self.endpoint(&["auth", "verification", "resend", email]))
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        matchers::{body_json, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    async fn client(server: &MockServer) -> AuthClient {
        AuthClient::new(&server.uri(), Arc::new(Store::default())).unwrap()
    }

    #[tokio::test]
    async fn login_stores_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .and(body_json(json!({ "username": "alice", "password": "pw123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "abc" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        let token = client
            .login(&LoginRequest {
                username: Some("alice".into()),
                password: Some("pw123".into()),
            })
            .await
            .unwrap();
        assert_eq!(token, "abc");
        assert_eq!(client.store().current_token().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn login_failure_surfaces_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Unauthorized" })),
            )
            .mount(&server)
            .await;

        let client = client(&server).await;
        let err = client.login(&LoginRequest::default()).await.unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.store().current_token(), None);
    }

    #[tokio::test]
    async fn logout_clears_credentials_even_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client(&server).await;
        client.store().dispatch(Action::SetCredentials {
            access_token: "old".into(),
        });
        client.send_logout().await;
        assert_eq!(client.store().current_token(), None);
    }

    #[tokio::test]
    async fn refresh_updates_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "fresh" })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        assert_eq!(client.refresh().await.as_deref(), Some("fresh"));
        assert_eq!(client.store().current_token().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn refresh_failure_keeps_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/refresh"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "Forbidden" })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        assert_eq!(client.refresh().await, None);
        assert_eq!(client.store().current_token(), None);
    }

    #[tokio::test]
    async fn resend_confirmation_encodes_email_in_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/verification/resend/a%20b@x.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "sent" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        client.resend_confirmation_email("a b@x.com").await.unwrap();
    }

    #[test]
    fn rejects_unusable_base_url() {
        let store = Arc::new(Store::default());
        assert!(matches!(
            AuthClient::new("mailto:someone@x.com", store.clone()),
            Err(ClientError::BaseUrl(_))
        ));
        assert!(matches!(
            AuthClient::new("not a url", store),
            Err(ClientError::BaseUrl(_))
        ));
    }
}
