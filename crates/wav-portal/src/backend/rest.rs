use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    Account, AccountCreated, AccountId, AccountMetadata, ApplicationRow, Backend, BackendError,
    BackendErrorKind, ProfileRow, Session, Table,
};
use crate::config::BackendConfig;

/// Client for a hosted auth + REST database service (GoTrue/PostgREST conventions).
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a AccountMetadata,
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Sign-up answers either with a session (auto-confirm) or with the bare user.
#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<RemoteUser>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: RemoteUser,
}

impl RemoteUser {
    fn into_account(self, fallback_email: &str) -> Account {
        Account {
            id: AccountId(self.id),
            email: self.email.unwrap_or_else(|| fallback_email.to_string()),
        }
    }
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder().build().map_err(|err| {
            BackendError::unavailable(format!("http client setup failed: {err}"))
        })?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    /// Adds the project key and a bearer token (the anon key when no user token applies).
    fn authorize(&self, request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await.map_err(|err| {
            BackendError::unavailable(format!("backend request failed: {err}"))
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(%status, "backend rejected request");
        Err(error_from_response(status, &body))
    }

    async fn json<T: DeserializeOwned>(&self, response: Response) -> Result<T, BackendError> {
        response.json::<T>().await.map_err(|err| {
            BackendError::new(
                BackendErrorKind::Other,
                format!("unexpected backend payload: {err}"),
            )
        })
    }

    async fn insert<T>(
        &self,
        table: Table,
        row: &T,
        session: Option<&Session>,
    ) -> Result<(), BackendError>
    where
        T: Serialize + Sync,
    {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(&[row]);
        self.send(self.authorize(request, user_token(session)))
            .await?;
        Ok(())
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: Table,
        column: &str,
        id: &AccountId,
        session: Option<&Session>,
    ) -> Result<Option<T>, BackendError> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&[(column, format!("eq.{id}")), ("select", "*".to_string())])
            .header(header::ACCEPT, "application/json");
        let response = self
            .send(self.authorize(request, user_token(session)))
            .await?;
        let mut rows: Vec<T> = self.json(response).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }
}

fn user_token(session: Option<&Session>) -> Option<&str> {
    session.map(|session| session.access_token.as_str())
}

/// Maps an error response to a structured error. Postgres error codes win over wording.
fn error_from_response(status: StatusCode, body: &str) -> BackendError {
    let payload: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let message = ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("backend responded with {status}"));

    let kind = match payload.get("code").and_then(Value::as_str) {
        Some("22001") => BackendErrorKind::ValueTooLong,
        Some("23505") => BackendErrorKind::Conflict,
        Some("42501") => BackendErrorKind::Unauthorized,
        _ => match BackendErrorKind::classify(&message) {
            BackendErrorKind::Other if status.is_server_error() => BackendErrorKind::Unavailable,
            BackendErrorKind::Other if status == StatusCode::UNAUTHORIZED => {
                BackendErrorKind::Unauthorized
            }
            kind => kind,
        },
    };

    BackendError::new(kind, message)
}

#[async_trait]
impl Backend for RestBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        metadata: &AccountMetadata,
    ) -> Result<AccountCreated, BackendError> {
        let request = self.client.post(self.auth_url("signup")).json(&SignUpRequest {
            email,
            password,
            data: metadata,
        });
        let response = self.send(self.authorize(request, None)).await?;
        let body: SignUpResponse = self.json(response).await?;

        let user = match (body.user, body.id) {
            (Some(user), _) => user,
            (None, Some(id)) => RemoteUser {
                id,
                email: body.email,
            },
            (None, None) => {
                return Err(BackendError::new(
                    BackendErrorKind::Other,
                    "sign-up response did not include a user",
                ))
            }
        };

        let account = user.into_account(email);
        let session = body.access_token.map(|access_token| Session {
            account: account.clone(),
            access_token,
        });

        Ok(AccountCreated { account, session })
    }

    async fn insert_profile(
        &self,
        profile: &ProfileRow,
        session: Option<&Session>,
    ) -> Result<(), BackendError> {
        self.insert(Table::Profiles, profile, session).await
    }

    async fn insert_application(
        &self,
        application: &ApplicationRow,
        session: Option<&Session>,
    ) -> Result<(), BackendError> {
        self.insert(Table::Applications, application, session)
            .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });
        let response = self.send(self.authorize(request, None)).await?;
        let body: TokenResponse = self.json(response).await?;

        Ok(Session {
            account: body.user.into_account(email),
            access_token: body.access_token,
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<(), BackendError> {
        let request = self.client.post(self.auth_url("logout"));
        self.send(self.authorize(request, Some(&session.access_token)))
            .await?;
        Ok(())
    }

    async fn current_user(&self, session: &Session) -> Result<Option<Account>, BackendError> {
        let request = self.client.get(self.auth_url("user"));
        match self
            .send(self.authorize(request, Some(&session.access_token)))
            .await
        {
            Ok(response) => {
                let user: RemoteUser = self.json(response).await?;
                Ok(Some(user.into_account(&session.account.email)))
            }
            Err(err)
                if matches!(
                    err.kind,
                    BackendErrorKind::Unauthorized | BackendErrorKind::InvalidCredentials
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_profile(
        &self,
        id: &AccountId,
        session: Option<&Session>,
    ) -> Result<Option<ProfileRow>, BackendError> {
        self.select_one(Table::Profiles, "id", id, session).await
    }

    async fn fetch_application(
        &self,
        user_id: &AccountId,
        session: Option<&Session>,
    ) -> Result<Option<ApplicationRow>, BackendError> {
        self.select_one(Table::Applications, "user_id", user_id, session)
            .await
    }
}
