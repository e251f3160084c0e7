use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{AppError, ValidationError};

/// JSON body that has passed its `validator` rules
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ValidationError::InvalidInput(format!("Invalid JSON: {}", e.body_text())))?;

        validate_body(&value)?;
        Ok(ValidatedJson(value))
    }
}

pub fn validate_body<T: Validate>(value: &T) -> Result<(), ValidationError> {
    value.validate().map_err(|e| {
        let mut errors = e
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let error_messages: Vec<String> = errors
                    .iter()
                    .map(|e| e.message.as_ref().map(|s| s.to_string()).unwrap_or_else(|| e.code.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<String>>();
        // field_errors is a HashMap
        errors.sort();

        ValidationError::InvalidInput(format!("Validation failed: {}", errors.join("; ")))
    })
}
