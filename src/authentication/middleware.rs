use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    error::InternalError,
    middleware::Next,
    web, FromRequest, HttpMessage, HttpResponse,
};
use sqlx::PgPool;

use crate::{
    access_policy::{self, AccessDecision},
    authentication::load_principal,
    session_state::TypedSession,
    utils::{e500, see_other},
};

fn login_redirect(original_url: &str) -> actix_web::Error {
    let location = format!("/login?next={}", urlencoding::encode(original_url));
    let e = anyhow::anyhow!("The user has not logged in");

    InternalError::from_response(e, see_other(&location)).into()
}

fn forbidden() -> actix_web::Error {
    let e = anyhow::anyhow!("The user is not allowed to use the admin interface");

    InternalError::from_response(e, HttpResponse::Forbidden().finish()).into()
}

/// Gatekeeper for the admin scope.
///
/// Anonymous visitors are redirected to the login form, remembering where
/// they were headed; logged-in users lacking access get a 403. On success
/// the principal is stored in the request extensions.
pub async fn enforce_admin_access(
    mut req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let session = {
        let (http_request, payload) = req.parts_mut();
        TypedSession::from_request(http_request, payload).await
    }?;
    let pool = req
        .app_data::<web::Data<PgPool>>()
        .cloned()
        .ok_or_else(|| e500("Missing database pool"))?;

    let principal = match session.get_user_id().map_err(e500)? {
        Some(user_id) => {
            let principal = load_principal(user_id, &pool).await.map_err(e500)?;
            if principal.is_none() {
                tracing::warn!(user_id, "Session refers to a user that no longer exists");
                session.log_out();
            }
            principal
        }
        None => None,
    };

    let decision = access_policy::evaluate(principal.as_ref());
    match (decision, principal) {
        (AccessDecision::Granted, Some(principal)) => {
            req.extensions_mut().insert(principal);
            next.call(req).await
        }
        (AccessDecision::Forbidden, _) => Err(forbidden()),
        _ => Err(login_redirect(&req.uri().to_string())),
    }
}
