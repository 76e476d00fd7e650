use actix_web::HttpResponse;
use actix_web_flash_messages::IncomingFlashMessages;

use crate::{
    template::{page_context, render_page},
    utils::e500,
};

pub async fn home(flash_messages: IncomingFlashMessages) -> Result<HttpResponse, actix_web::Error> {
    let context = page_context(None, None, &flash_messages);

    render_page("index.html", &context).map_err(e500)
}
