use actix_web::{web, HttpResponse};
use actix_web_flash_messages::IncomingFlashMessages;
use sqlx::PgPool;

use crate::{
    authentication::Principal,
    template::{page_context, render_page},
    utils::e500,
};

#[derive(Debug, serde::Serialize)]
pub struct RecordCounts {
    pub users: i64,
    pub roles: i64,
    pub projects: i64,
}

#[tracing::instrument(name = "Count records", skip(pool))]
pub async fn record_counts(pool: &PgPool) -> Result<RecordCounts, sqlx::Error> {
    sqlx::query_as!(
        RecordCounts,
        r#"
        SELECT
            (SELECT COUNT(*) FROM "user") AS "users!",
            (SELECT COUNT(*) FROM role) AS "roles!",
            (SELECT COUNT(*) FROM project) AS "projects!"
        "#,
    )
    .fetch_one(pool)
    .await
}

pub async fn admin_index(
    pool: web::Data<PgPool>,
    principal: web::ReqData<Principal>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let counts = record_counts(&pool).await.map_err(e500)?;

    let principal = principal.into_inner();
    let mut context = page_context(Some(&principal), None, &flash_messages);
    context.insert("counts", &counts);

    render_page("admin/index.html", &context).map_err(e500)
}
