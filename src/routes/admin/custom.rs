use actix_web::{web, HttpResponse};
use actix_web_flash_messages::IncomingFlashMessages;

use crate::{
    authentication::Principal,
    template::{page_context, render_page},
    utils::e500,
};

pub async fn custom_view(
    principal: web::ReqData<Principal>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let principal = principal.into_inner();
    let context = page_context(Some(&principal), Some("custom"), &flash_messages);

    render_page("admin/custom_index.html", &context).map_err(e500)
}
