use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// `Json<T>` whose rejections become 400 `ValidationError`s instead of axum's
/// default 415/422 plain-text bodies.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(AppError::Validation(rejection_reason(&rejection))),
        }
    }
}

fn rejection_reason(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "expected a JSON request body".into(),
        JsonRejection::JsonSyntaxError(_) => "malformed JSON body".into(),
        JsonRejection::JsonDataError(e) => format!("invalid JSON body: {}", e.body_text()),
        other => other.body_text(),
    }
}

/// Trimmed value of a required string field; blank counts as missing.
pub fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required(Some("  x ".into()), "f").unwrap(), "x");
        assert!(required(Some("   ".into()), "f").is_err());
        let err = required(None, "prompt").unwrap_err();
        assert_eq!(err.to_string(), "validation error: prompt is required");
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
        assert!(!is_valid_email(""));
    }
}
