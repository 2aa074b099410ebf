//! Shared harness: the real router over an in-memory store

#![allow(dead_code)]

use std::time::Duration;

use api::{AppConfig, AppState, create_router, store::MemoryStore};
use auth::{JwtConfig, TokenService};
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "Sup3rSecret";

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `name=value` of the refresh cookie, if one was set
    pub fn refresh_cookie(&self) -> Option<String> {
        self.set_cookie()
            .and_then(|cookie| cookie.split(';').next().map(str::to_string))
    }

    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with("refreshToken="))
            .map(str::to_string)
    }
}

/// A signed-up account
pub struct Account {
    pub id: Uuid,
    pub token: String,
    pub cookie: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = MemoryStore::new();
        let tokens = TokenService::new(JwtConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            access_token_expiry: Duration::from_secs(15 * 60),
            refresh_token_expiry: Duration::from_secs(7 * 24 * 60 * 60),
        });
        let state = AppState::new(store.clone(), tokens, config);

        Self {
            router: create_router(state),
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-real-ip", "203.0.113.10");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.call(Method::PATCH, uri, Some(token), Some(body)).await
    }

    /// POST with only the cookie header, as a browser would refresh or log out
    pub async fn with_cookie(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("x-real-ip", "203.0.113.10");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn signup(&self, email: &str, name: &str, role: &str, company: Option<&str>) -> Account {
        let response = self
            .call(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "name": name,
                    "role": role,
                    "company": company,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

        Account {
            id: response.body["user"]["id"].as_str().unwrap().parse().unwrap(),
            token: response.body["accessToken"].as_str().unwrap().to_string(),
            cookie: response.refresh_cookie().unwrap(),
        }
    }

    pub async fn applicant(&self, email: &str) -> Account {
        self.signup(email, "John Doe", "applicant", None).await
    }

    pub async fn recruiter(&self, email: &str, company: &str) -> Account {
        self.signup(email, "Jane Recruiter", "recruiter", Some(company)).await
    }

    pub async fn admin(&self, email: &str) -> Account {
        let account = self.signup(email, "Ada Admin", "applicant", None).await;
        assert!(self.store.grant_admin(account.id).await);
        account
    }

    /// Create an application through the API and return its id
    pub async fn create_application(&self, token: &str, company: &str) -> String {
        let response = self
            .post(
                "/api/applications",
                token,
                json!({
                    "company": company,
                    "roleTitle": "Backend Engineer",
                    "workMode": "remote",
                    "employmentType": "fulltime",
                    "status": "applied",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }
}
