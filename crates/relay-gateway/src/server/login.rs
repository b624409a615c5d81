//! Login endpoint
//!
//! POST /login with fields `username` and `password`, read from the
//! urlencoded body with the query string as a fallback. Responds with the
//! shared session token as a plain-text body.

use super::response::{ApiError, ApiResult};
use crate::server::GatewayState;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Form;
use relay_common::AppError;
use serde::Deserialize;

/// Login form fields
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    /// Fill fields missing from `self` with the ones in `fallback`
    fn or_else(self, fallback: LoginForm) -> LoginForm {
        LoginForm {
            username: non_empty_or(self.username, fallback.username),
            password: non_empty_or(self.password, fallback.password),
        }
    }
}

fn non_empty_or(value: String, fallback: String) -> String {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Exchange credentials for the session token
///
/// POST /login
pub async fn login(
    State(state): State<GatewayState>,
    query: Result<Query<LoginForm>, QueryRejection>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> ApiResult<String> {
    // An unreadable form is just a failed login
    let body = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable login form");
            LoginForm::default()
        }
    };
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let form = body.or_else(query);

    let token = state
        .token_gate()
        .issue_or_get(&form.username, &form.password)?;

    Ok(token)
}

/// Any other method on /login
pub async fn method_not_allowed() -> ApiError {
    ApiError::from(AppError::MethodNotAllowed)
}
