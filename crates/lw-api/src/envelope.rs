use lw_core::error::CoreError;
use serde::Serialize;

/// Firmware version string baked into every response.
pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Corps d'erreur stable : code de la taxonomie d'erreurs + message lisible.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    /// Stable error code ("NotFound", "OutOfRange", ...).
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

/// L'enveloppe commune : soit `success: true` avec `data`, soit
/// `success: false` avec `error`. Jamais les deux.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    /// Overall outcome.
    pub success: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Error body on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    /// RFC 3339 response timestamp.
    pub timestamp: String,
    /// Firmware version.
    pub version: &'static str,
}

impl ApiResponse {
    /// A success envelope wrapping `data`.
    #[must_use]
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: API_VERSION,
        }
    }

    /// A failure envelope for a core error.
    #[must_use]
    pub fn err(e: &CoreError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: e.code().to_string(),
                message: e.to_string(),
            }),
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: API_VERSION,
        }
    }

    /// Coarse HTTP status mirror of the error taxonomy.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        let Some(error) = &self.error else { return 200 };
        match error.code.as_str() {
            "NotFound" => 404,
            "InvalidManifest" => 422,
            "AudioUnavailable" => 503,
            _ => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_has_data_and_no_error() {
        let r = ApiResponse::ok(serde_json::json!({ "x": 1 }));
        assert!(r.success);
        assert_eq!(r.http_status(), 200);
        let v = serde_json::to_value(&r).unwrap();
        assert!(v.get("error").is_none());
        assert_eq!(v["data"]["x"], 1);
        assert!(v["timestamp"].is_string());
    }

    #[test]
    fn status_mirrors_the_taxonomy() {
        assert_eq!(
            ApiResponse::err(&CoreError::not_found("effect 128")).http_status(),
            404
        );
        assert_eq!(
            ApiResponse::err(&CoreError::InvalidManifest("EmptyEffects".into())).http_status(),
            422
        );
        assert_eq!(ApiResponse::err(&CoreError::AudioUnavailable).http_status(), 503);
        assert_eq!(ApiResponse::err(&CoreError::QueueFull).http_status(), 400);
    }
}
