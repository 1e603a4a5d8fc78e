//! HTTP client for the clinical/billing API.

use crate::error::ApiError;
use crate::session_store::SessionStore;
use nexusclin_core::{
    AgendaItem, AssistantReply, AssistantRequest, Atendimento, AuditResponse,
    ChangePasswordRequest, Competencia, CreateEvolucaoRequest, CreateTenantRequest,
    CreateUserRequest, Dashboard, Evolucao, ExportFile, ExportItem, ExportKind, LoginRequest,
    LoginResponse, ResetPasswordRequest, Tenant, UpdateAgendaRequest, UpdateTenantRequest,
    UpdateUserRequest, User,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;

/// Thin wrapper over `reqwest` with one typed method per API operation.
///
/// The bearer token is read from the session store on every request, since
/// login swaps it mid-process. This component never touches the cache and
/// never mutates the session.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<SessionStore>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    // ------------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------------

    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.post_json("/api/auth/login", req).await
    }

    pub async fn change_password(&self, req: &ChangePasswordRequest) -> Result<(), ApiError> {
        self.post_unit("/api/auth/change-password", req).await
    }

    // ------------------------------------------------------------------------
    // Tenants & users
    // ------------------------------------------------------------------------

    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, ApiError> {
        self.get_json("/api/tenants").await
    }

    pub async fn create_tenant(&self, req: &CreateTenantRequest) -> Result<Tenant, ApiError> {
        self.post_json("/api/tenants", req).await
    }

    pub async fn update_tenant(
        &self,
        id: i64,
        req: &UpdateTenantRequest,
    ) -> Result<Tenant, ApiError> {
        self.put_json(&format!("/api/tenants/{}", id), req).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.get_json("/api/users").await
    }

    pub async fn create_user(&self, req: &CreateUserRequest) -> Result<User, ApiError> {
        self.post_json("/api/users", req).await
    }

    pub async fn update_user(&self, id: i64, req: &UpdateUserRequest) -> Result<User, ApiError> {
        self.put_json(&format!("/api/users/{}", id), req).await
    }

    pub async fn reset_user_password(
        &self,
        id: i64,
        req: &ResetPasswordRequest,
    ) -> Result<(), ApiError> {
        self.post_unit(&format!("/api/users/{}/reset-password", id), req)
            .await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("/api/users/{}", id))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await?;
            Err(ApiError::from_response_parts(status.as_u16(), &text))
        }
    }

    // ------------------------------------------------------------------------
    // Agenda & clinical record
    // ------------------------------------------------------------------------

    pub async fn list_agendas(&self) -> Result<Vec<AgendaItem>, ApiError> {
        self.get_json("/api/agendas").await
    }

    pub async fn update_agenda(
        &self,
        id: i64,
        req: &UpdateAgendaRequest,
    ) -> Result<AgendaItem, ApiError> {
        self.put_json(&format!("/api/agendas/{}", id), req).await
    }

    pub async fn list_atendimentos(&self) -> Result<Vec<Atendimento>, ApiError> {
        self.get_json("/api/atendimentos").await
    }

    pub async fn list_evolucoes(
        &self,
        atendimento_id: Option<i64>,
    ) -> Result<Vec<Evolucao>, ApiError> {
        let path = match atendimento_id {
            Some(id) => format!("/api/evolucoes?atendimento_id={}", id),
            None => "/api/evolucoes".to_string(),
        };
        self.get_json(&path).await
    }

    pub async fn create_evolucao(&self, req: &CreateEvolucaoRequest) -> Result<Evolucao, ApiError> {
        self.post_json("/api/evolucoes", req).await
    }

    pub async fn assistant_message(
        &self,
        req: &AssistantRequest,
    ) -> Result<AssistantReply, ApiError> {
        self.post_json("/api/ai/assistente", req).await
    }

    // ------------------------------------------------------------------------
    // Audit & exports
    // ------------------------------------------------------------------------

    pub async fn audit_competencia(
        &self,
        competencia: &Competencia,
    ) -> Result<AuditResponse, ApiError> {
        self.get_json(&format!("/api/audit/competencia/{}", competencia))
            .await
    }

    pub async fn generate_export(
        &self,
        kind: ExportKind,
        competencia: &Competencia,
    ) -> Result<ExportFile, ApiError> {
        let path = format!(
            "/api/exports/{}?competencia={}",
            kind.as_str(),
            competencia
        );
        self.post_json(&path, &serde_json::json!({})).await
    }

    pub async fn list_exports(
        &self,
        kind: ExportKind,
        competencia: Option<&Competencia>,
    ) -> Result<Vec<ExportItem>, ApiError> {
        let path = match competencia {
            Some(c) => format!("/api/exports?tipo={}&competencia={}", kind.as_str(), c),
            None => format!("/api/exports?tipo={}", kind.as_str()),
        };
        self.get_json(&path).await
    }

    pub async fn retry_export(&self, kind: ExportKind, id: i64) -> Result<(), ApiError> {
        let path = format!("/api/exports/{}/{}/retry", kind.as_str(), id);
        self.post_unit(&path, &serde_json::json!({})).await
    }

    pub async fn dashboard(&self) -> Result<Dashboard, ApiError> {
        self.get_json("/api/core/dashboard").await
    }

    /// Fetch a generated file as plain text. `url` may be absolute or
    /// API-relative.
    pub async fn fetch_text(&self, url: &str) -> Result<String, ApiError> {
        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(ApiError::from_response_parts(status.as_u16(), &text))
        }
    }

    // ------------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------------

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        };
        let mut request = self.client.request(method, url);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path).send().await?;
        parse_response(response).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let response = self.request(Method::POST, path).json(body).send().await?;
        parse_response(response).await
    }

    async fn put_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let response = self.request(Method::PUT, path).json(body).send().await?;
        parse_response(response).await
    }

    /// POST where the response body does not matter (may be empty).
    async fn post_unit<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await?;
            Err(ApiError::from_response_parts(status.as_u16(), &text))
        }
    }
}

/// Decode a response: non-2xx becomes [`ApiError::Api`] with the body as
/// diagnostic payload; a 2xx is JSON-decoded when the content type says so,
/// otherwise the raw text is decoded into `T` (only `String`-shaped targets
/// accept that).
async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await?;
        return Err(ApiError::from_response_parts(status.as_u16(), &text));
    }
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false);
    if is_json {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    } else {
        let text = response.text().await?;
        serde_json::from_value(serde_json::Value::String(text))
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}
