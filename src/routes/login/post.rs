use actix_web::{error::InternalError, http::StatusCode, web, HttpResponse, ResponseError};
use actix_web_flash_messages::FlashMessage;
use secrecy::Secret;
use sqlx::PgPool;

use crate::{
    authentication::{validate_credentials, AuthError, Credentials},
    session_state::TypedSession,
    utils::{error_chain_fmt, local_redirect_target, see_other},
};

const DEFAULT_LANDING: &str = "/admin/";

#[derive(serde::Deserialize)]
pub struct FormData {
    email: String,
    password: Secret<String>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(thiserror::Error)]
pub enum LoginError {
    #[error("Authentication failed")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for LoginError {
    fn status_code(&self) -> StatusCode {
        match self {
            LoginError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LoginError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Sends the visitor back to the form, keeping a local `next` target.
fn login_redirect(e: LoginError, next: Option<&str>) -> InternalError<LoginError> {
    FlashMessage::error(e.to_string()).send();

    let location = match local_redirect_target(next) {
        Some(next) => format!("/login?next={}", urlencoding::encode(next)),
        None => "/login".to_string(),
    };

    InternalError::from_response(e, see_other(&location))
}

#[tracing::instrument(
    skip(form, pool, session),
    fields(email=tracing::field::Empty, user_id=tracing::field::Empty)
)]
pub async fn login(
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
    session: TypedSession,
) -> Result<HttpResponse, InternalError<LoginError>> {
    let FormData {
        email,
        password,
        next,
    } = form.into_inner();
    tracing::Span::current().record("email", tracing::field::display(&email));

    let credentials = Credentials { email, password };

    match validate_credentials(credentials, &pool).await {
        Ok(user_id) => {
            tracing::Span::current().record("user_id", tracing::field::display(&user_id));

            session.renew();
            session.insert_user_id(user_id).map_err(|e| {
                login_redirect(LoginError::UnexpectedError(e.into()), next.as_deref())
            })?;

            let target = local_redirect_target(next.as_deref()).unwrap_or(DEFAULT_LANDING);

            Ok(see_other(target))
        }
        Err(e) => {
            let e = match e {
                AuthError::InvalidCredentials(_) => LoginError::InvalidCredentials(e.into()),
                AuthError::UnexpectedError(_) => LoginError::UnexpectedError(e.into()),
            };

            Err(login_redirect(e, next.as_deref()))
        }
    }
}
