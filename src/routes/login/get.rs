use actix_web::{web, HttpResponse};
use actix_web_flash_messages::IncomingFlashMessages;

use crate::{
    template::{page_context, render_page},
    utils::{e500, local_redirect_target},
};

#[derive(serde::Deserialize)]
pub struct QueryParams {
    next: Option<String>,
}

pub async fn login_form(
    query: web::Query<QueryParams>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let mut context = page_context(None, None, &flash_messages);
    context.insert("next", &local_redirect_target(query.next.as_deref()));

    render_page("login.html", &context).map_err(e500)
}
