use actix_web::{
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use actix_web_flash_messages::{IncomingFlashMessages, Level};
use lazy_static::lazy_static;
use tera::{self, Context, Tera};

use crate::authentication::Principal;

lazy_static! {
    pub static ref TEMPLATES: Tera = {
        let mut tera = match Tera::new("templates/**/*") {
            Ok(t) => t,
            Err(e) => {
                eprintln!("Tera failed to parse templates: {}", e);
                ::std::process::exit(1);
            }
        };

        tera.autoescape_on(vec![".html"]);

        tera
    };
}

pub const SITE_NAME: &str = "My Dashboard";
pub const ADMIN_BASE_TEMPLATE: &str = "admin/base.html";

/// Admin menu entries: label, endpoint, icon.
const ADMIN_MENU: &[(&str, &str, &str)] = &[
    ("Roles", "role", "fa-server"),
    ("Users", "user", "fa-users"),
    ("Custom view", "custom", "fa-connectdevelop"),
    ("Projects", "project", "fa-gear"),
];

#[derive(Debug, serde::Serialize, PartialEq, Eq)]
pub struct MenuItem {
    pub name: &'static str,
    pub url: String,
    pub icon: &'static str,
    pub active: bool,
}

#[derive(Debug, serde::Serialize)]
struct FlashView {
    level: &'static str,
    content: String,
}

pub fn admin_menu(active_endpoint: Option<&str>) -> Vec<MenuItem> {
    ADMIN_MENU
        .iter()
        .map(|&(name, endpoint, icon)| MenuItem {
            name,
            url: format!("/admin/{}/", endpoint),
            icon,
            active: active_endpoint == Some(endpoint),
        })
        .collect()
}

fn flash_level(level: Level) -> &'static str {
    match level {
        Level::Error => "danger",
        Level::Warning => "warning",
        Level::Success => "success",
        _ => "info",
    }
}

/// Assembles what every page layout needs: site chrome, the admin menu,
/// the current principal and pending flash messages.
///
/// Called once per request by the handler rendering the page.
pub fn page_context(
    principal: Option<&Principal>,
    active_endpoint: Option<&str>,
    flash_messages: &IncomingFlashMessages,
) -> Context {
    let mut context = Context::new();
    context.insert("site_name", SITE_NAME);
    context.insert("admin_base_template", ADMIN_BASE_TEMPLATE);
    context.insert("menu", &admin_menu(active_endpoint));
    context.insert("current_user", &principal);

    let messages: Vec<FlashView> = flash_messages
        .iter()
        .map(|m| FlashView {
            level: flash_level(m.level()),
            content: m.content().to_string(),
        })
        .collect();
    context.insert("messages", &messages);

    context
}

pub fn render_page(template: &str, context: &Context) -> Result<HttpResponse, tera::Error> {
    render_page_with_status(template, context, StatusCode::OK)
}

pub fn render_page_with_status(
    template: &str,
    context: &Context,
    status: StatusCode,
) -> Result<HttpResponse, tera::Error> {
    let html = TEMPLATES.render(template, context)?;

    Ok(HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(html))
}
