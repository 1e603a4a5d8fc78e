//! Wire payload types for the consumed clinical/billing API.
//!
//! Response shapes mirror the API contract exactly; request bodies are the
//! JSON documents the write endpoints accept. All ids are integers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// TENANTS & USERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub nome: String,
    pub roles: Vec<String>,
    pub ativo: bool,
    pub must_change_password: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTenantRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub nome: String,
    pub senha: String,
    pub roles: Vec<String>,
    pub tenant_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ativo: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nova_senha: Option<String>,
}

// ============================================================================
// AUTH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub tenant_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mfa_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub tenant_id: i64,
    pub roles: Vec<String>,
    #[serde(default)]
    pub must_change_password: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub senha_atual: String,
    pub senha_nova: String,
}

// ============================================================================
// AGENDA & ATENDIMENTOS
// ============================================================================

/// Appointment lifecycle: livre -> agendado -> concluido | faltou.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgendaStatus {
    Livre,
    Agendado,
    Concluido,
    Faltou,
}

impl AgendaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgendaStatus::Livre => "livre",
            AgendaStatus::Agendado => "agendado",
            AgendaStatus::Concluido => "concluido",
            AgendaStatus::Faltou => "faltou",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub id: i64,
    /// RFC 3339 appointment timestamp.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AgendaStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profissional_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paciente_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateAgendaRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AgendaStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atendimento {
    pub id: i64,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paciente_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profissional_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unidade_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

// ============================================================================
// CLINICAL RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evolucao {
    pub id: i64,
    pub atendimento_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texto_estruturado: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criado_em: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEvolucaoRequest {
    pub tenant_id: i64,
    pub atendimento_id: i64,
    pub texto_estruturado: String,
    pub assinado: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assinatura_meta: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantRequest {
    pub mensagem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paciente_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atendimento_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub resposta: String,
}

// ============================================================================
// AUDIT & EXPORTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditError {
    pub procedimento_id: i64,
    pub erros: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResponse {
    pub competencia: String,
    #[serde(default)]
    pub erros: Vec<AuditError>,
}

/// Regulatory billing file families the API can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Bpa,
    Apac,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::Bpa => "bpa",
            ExportKind::Apac => "apac",
        }
    }

    pub fn file_prefix(&self) -> &'static str {
        match self {
            ExportKind::Bpa => "BPA",
            ExportKind::Apac => "APAC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportItem {
    pub id: i64,
    pub competencia: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arquivo_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erros_json: Option<Value>,
}

/// Result of generating an export: a file URL plus a truncated preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    pub url: String,
    pub preview: String,
}

// ============================================================================
// DASHBOARD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardExport {
    pub id: i64,
    pub tipo: String,
    pub competencia: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erros: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub competencia: String,
    pub total_atendimentos: i64,
    pub total_pacientes: i64,
    pub total_procedimentos: i64,
    pub total_procedimentos_com_erro: i64,
    #[serde(default)]
    pub ultimas_exportacoes: Vec<DashboardExport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agenda_status_uses_lowercase_wire_names() {
        let json = serde_json::to_string(&AgendaStatus::Faltou).unwrap();
        assert_eq!(json, "\"faltou\"");
        let back: AgendaStatus = serde_json::from_str("\"agendado\"").unwrap();
        assert_eq!(back, AgendaStatus::Agendado);
    }

    #[test]
    fn agenda_item_tolerates_missing_optionals() {
        let item: AgendaItem =
            serde_json::from_str(r#"{"id": 42, "data": "2025-01-08T10:00:00"}"#).unwrap();
        assert_eq!(item.id, 42);
        assert!(item.status.is_none());
    }

    #[test]
    fn update_request_skips_absent_fields() {
        let req = UpdateAgendaRequest {
            data: Some("2025-01-08T10:00:00".to_string()),
            status: None,
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"data":"2025-01-08T10:00:00"}"#
        );
    }

    #[test]
    fn export_kind_wire_names() {
        assert_eq!(ExportKind::Bpa.as_str(), "bpa");
        assert_eq!(
            serde_json::to_string(&ExportKind::Apac).unwrap(),
            "\"apac\""
        );
    }
}
