//! Submission outcomes surfaced to the chat surfaces

use diagnosa_providers::ProviderError;
use thiserror::Error;

const EMPTY_REPLY_NOTICE: &str = "Maaf, saya tidak bisa memberikan balasan. Respons API kosong.";
const FAULT_HINT: &str = "Pastikan API Key Anda valid dan model tersedia.";

/// Why a submission produced no model turn
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    /// The service answered but with no usable text
    #[error("Empty reply from model")]
    EmptyReply,

    #[error("Credential rejected: {0}")]
    Credential(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Quota, malformed request, unparseable reply and anything else
    #[error("Service error: {0}")]
    Service(String),
}

impl SubmitError {
    /// Stable identifier used in API responses and logs
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitError::EmptyReply => "empty_reply",
            SubmitError::Credential(_) => "credential",
            SubmitError::Network(_) => "network",
            SubmitError::Timeout => "timeout",
            SubmitError::ModelUnavailable(_) => "model_unavailable",
            SubmitError::Service(_) => "service",
        }
    }

    pub fn is_empty_reply(&self) -> bool {
        matches!(self, SubmitError::EmptyReply)
    }

    /// Inline message shown to the user
    pub fn notice(&self) -> String {
        match self {
            SubmitError::EmptyReply => EMPTY_REPLY_NOTICE.to_string(),
            SubmitError::Credential(msg) => {
                format!("Terjadi kesalahan: API Key ditolak oleh layanan ({})", msg)
            }
            SubmitError::Network(msg) => {
                format!("Terjadi kesalahan: tidak dapat terhubung ke layanan ({})", msg)
            }
            SubmitError::Timeout => {
                "Terjadi kesalahan: layanan tidak merespons tepat waktu".to_string()
            }
            SubmitError::ModelUnavailable(msg) => {
                format!("Terjadi kesalahan: model tidak tersedia ({})", msg)
            }
            SubmitError::Service(msg) => format!("Terjadi kesalahan: {}", msg),
        }
    }

    /// Follow-up advice shown under a fault notice
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SubmitError::EmptyReply => None,
            _ => Some(FAULT_HINT),
        }
    }
}

impl From<ProviderError> for SubmitError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Credential(msg) => SubmitError::Credential(msg),
            ProviderError::Network(msg) => SubmitError::Network(msg),
            ProviderError::Timeout(_) => SubmitError::Timeout,
            ProviderError::ModelUnavailable(msg) => SubmitError::ModelUnavailable(msg),
            other @ (ProviderError::ApiError { .. }
            | ProviderError::InvalidResponse(_)
            | ProviderError::ConfigError(_)) => SubmitError::Service(other.to_string()),
        }
    }
}
