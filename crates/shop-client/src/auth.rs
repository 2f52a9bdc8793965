//! Login, user creation and role lookup.

use crate::client::ApiClient;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use shop_core::{AuthSession, Role, ShopError, ShopResult};
use tracing::{info, instrument};

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    fn validate(&self) -> ShopResult<()> {
        let mut missing = Vec::new();
        if self.email.trim().is_empty() {
            missing.push(shop_core::FieldError::required("email"));
        }
        if self.password.is_empty() {
            missing.push(shop_core::FieldError::required("password"));
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ShopError::Validation(missing))
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct RoleResponse {
    role: String,
}

impl ApiClient {
    /// Exchange credentials for a token and store it in `session`
    #[instrument(skip(self, session, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, session: &mut AuthSession, credentials: &Credentials) -> ShopResult<()> {
        credentials.validate()?;

        let response: TokenResponse = self
            .send(self.request(Method::POST, &["login"])?.json(credentials))
            .await?;

        session.login_as(response.token, &credentials.email)?;
        info!("Logged in");
        Ok(())
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn create_user(&self, credentials: &Credentials) -> ShopResult<()> {
        credentials.validate()?;
        self.send_empty(self.request(Method::POST, &["createuser"])?.json(credentials))
            .await
    }

    /// Look up the role for `email` and remember it on the session
    #[instrument(skip(self, session))]
    pub async fn fetch_role(&self, session: &mut AuthSession, email: &str) -> ShopResult<Role> {
        let request = self.authed(Method::GET, &["role", email], session)?;
        let response: RoleResponse = self.send(request).await?;

        let role = Role::parse(&response.role);
        session.set_role(role);
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use serde_json::json;
    use shop_core::{MemoryTokenStore, StoredLogin, TokenStore};
    use std::sync::Arc;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_login_persists_token_and_role_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({"email": "admin@shop.test", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/role/admin@shop.test"))
            .and(header("Authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"role": "admin"})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryTokenStore::default());
        let mut session = AuthSession::load(store.clone()).unwrap();
        let client = ApiClient::new(ApiConfig::new(server.uri())).unwrap();

        client
            .login(&mut session, &Credentials::new("admin@shop.test", "secret"))
            .await
            .unwrap();
        assert_eq!(
            store.load().unwrap(),
            Some(StoredLogin::new("tok-1", Some("admin@shop.test".to_string())))
        );

        let role = client.fetch_role(&mut session, "admin@shop.test").await.unwrap();
        assert_eq!(role, Role::Admin);
        assert!(session.require_admin().is_ok());
    }

    #[tokio::test]
    async fn test_bad_credentials_leave_session_logged_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid credentials"})))
            .mount(&server)
            .await;

        let mut session = AuthSession::load(Arc::new(MemoryTokenStore::default())).unwrap();
        let client = ApiClient::new(ApiConfig::new(server.uri())).unwrap();

        let err = client
            .login(&mut session, &Credentials::new("a@b.c", "wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, ShopError::Auth(_)));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_empty_credentials_are_rejected_locally() {
        let server = MockServer::start().await;
        let client = ApiClient::new(ApiConfig::new(server.uri())).unwrap();

        let err = client
            .create_user(&Credentials::new(" ", ""))
            .await
            .unwrap_err();

        assert_eq!(err.field_errors().len(), 2);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
