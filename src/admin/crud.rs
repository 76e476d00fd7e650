use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError, Scope};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use anyhow::Context;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::{
    admin::{
        form::field_views,
        query::{self, FilterOp, ListParams, ListQuery, Sort},
        schema::Column,
        FieldErrors, FormContext, FormFields, FormMode, ModelAdmin,
    },
    authentication::Principal,
    configuration::AdminSettings,
    template::{page_context, render_page, render_page_with_status},
    utils::{error_chain_fmt, see_other},
};

#[derive(thiserror::Error)]
pub enum CrudError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Record not found")]
    NotFound,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for CrudError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for CrudError {
    fn status_code(&self) -> StatusCode {
        match self {
            CrudError::ValidationError(_) => StatusCode::BAD_REQUEST,
            CrudError::NotFound => StatusCode::NOT_FOUND,
            CrudError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Every admin route of one entity collection, mounted at `/<endpoint>`.
pub fn crud_scope<M: ModelAdmin>() -> Scope {
    web::scope(&format!("/{}", M::ENDPOINT))
        .route("", web::get().to(list::<M>))
        .route("/", web::get().to(list::<M>))
        .route("/new", web::get().to(create_form::<M>))
        .route("/new", web::post().to(create::<M>))
        .route("/edit/{id}", web::get().to(edit_form::<M>))
        .route("/edit/{id}", web::post().to(edit::<M>))
        .route("/delete/{id}", web::post().to(delete::<M>))
        .route("/details/{id}", web::get().to(details::<M>))
        .route("/update/{id}", web::post().to(update_field::<M>))
        .route("/export.json", web::get().to(export::<M>))
}

fn list_url<M: ModelAdmin>() -> String {
    format!("/admin/{}/", M::ENDPOINT)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "Yes".into(),
        Value::Bool(false) => "No".into(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn cells(record: &impl serde::Serialize, columns: &[Column]) -> Result<Vec<String>, serde_json::Error> {
    let value = serde_json::to_value(record)?;

    Ok(columns
        .iter()
        .map(|c| display_value(value.get(c.name).unwrap_or(&Value::Null)))
        .collect())
}

#[derive(serde::Serialize)]
struct CellView {
    name: &'static str,
    value: String,
    editable: bool,
}

#[derive(serde::Serialize)]
struct RowView {
    id: i32,
    title: String,
    cells: Vec<CellView>,
}

fn row_view<M: ModelAdmin>(record: &M::Record) -> Result<RowView, serde_json::Error> {
    let cells = M::LIST
        .columns
        .iter()
        .zip(cells(record, M::LIST.columns)?)
        .map(|(column, value)| CellView {
            name: column.name,
            value,
            editable: M::EDITABLE.contains(&column.name),
        })
        .collect();

    Ok(RowView {
        id: M::record_id(record),
        title: M::record_title(record),
        cells,
    })
}

#[derive(serde::Serialize)]
struct HeaderView {
    name: &'static str,
    label: &'static str,
    sort_url: Option<String>,
    sorted: Option<&'static str>,
}

fn header_views<M: ModelAdmin>(params: &ListParams) -> Vec<HeaderView> {
    M::LIST
        .columns
        .iter()
        .map(|column| {
            let current = params.sort.filter(|s| s.column == column.name);
            let sort_url = M::LIST.sortable.contains(&column.name).then(|| {
                let mut resorted = params.clone();
                resorted.sort = Some(Sort {
                    column: column.name,
                    descending: current.is_some_and(|s| !s.descending),
                });
                format!("?{}", resorted.to_query_string(0))
            });

            HeaderView {
                name: column.name,
                label: column.label,
                sort_url,
                sorted: current.map(|s| if s.descending { "desc" } else { "asc" }),
            }
        })
        .collect()
}

#[derive(serde::Serialize)]
struct FilterInput {
    key: String,
    label: String,
    value: String,
}

fn filter_inputs<M: ModelAdmin>(params: &ListParams) -> Vec<FilterInput> {
    M::LIST
        .filterable
        .iter()
        .filter_map(|name| M::LIST.column(name))
        .flat_map(|column| {
            FilterOp::for_kind(column.kind).iter().map(move |op| {
                let value = params
                    .filters
                    .iter()
                    .find(|f| f.column == column.name && f.op == *op)
                    .map(|f| f.value.to_string())
                    .unwrap_or_default();

                FilterInput {
                    key: format!("flt_{}_{}", column.name, op.as_str()),
                    label: format!("{} {}", column.label, op.label()),
                    value,
                }
            })
        })
        .collect()
}

#[derive(serde::Serialize)]
struct PageLink {
    number: u32,
    url: String,
    current: bool,
}

fn page_links(params: &ListParams, page_count: u32) -> Vec<PageLink> {
    (0..page_count)
        .map(|page| PageLink {
            number: page + 1,
            url: format!("?{}", params.to_query_string(page)),
            current: page == params.page,
        })
        .collect()
}

fn parse_list_params<M: ModelAdmin>(
    query: web::Query<Vec<(String, String)>>,
) -> Result<ListParams, CrudError> {
    ListParams::parse(&query.into_inner(), &M::LIST)
        .map_err(|e| CrudError::ValidationError(e.to_string()))
}

async fn fetch_record<M: ModelAdmin>(
    conn: &mut PgConnection,
    id: i32,
) -> Result<M::Record, CrudError> {
    query::by_id(&M::LIST, id)
        .build_query_as::<M::Record>()
        .fetch_optional(conn)
        .await
        .context("Failed to fetch record")?
        .ok_or(CrudError::NotFound)
}

async fn form_context<M: ModelAdmin>(
    conn: &mut PgConnection,
    settings: &AdminSettings,
) -> Result<FormContext, CrudError> {
    let choices = M::choices(conn)
        .await
        .context("Failed to load form choices")?;

    Ok(FormContext {
        settings: settings.clone(),
        choices,
    })
}

/// Maps a unique constraint violation onto the form field it guards.
///
/// Postgres names single column unique constraints `<table>_<column>_key`.
fn unique_violation<M: ModelAdmin>(e: &anyhow::Error) -> Option<FieldErrors> {
    let db_error = e.chain().find_map(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_error)) => Some(db_error),
        _ => None,
    })?;
    if !db_error.is_unique_violation() {
        return None;
    }

    let constraint = db_error.constraint().unwrap_or_default();
    let field = M::FORM
        .iter()
        .find(|f| constraint == format!("{}_{}_key", M::LIST.table, f.name))
        .map(|f| f.name)
        .unwrap_or("form");

    Some(FieldErrors::single(field, "Already in use."))
}

struct FormPage<'a> {
    principal: &'a Principal,
    flash_messages: &'a IncomingFlashMessages,
    form_context: &'a FormContext,
    values: &'a FormFields,
    errors: &'a FieldErrors,
    record_id: Option<i32>,
}

fn render_form<M: ModelAdmin>(page: FormPage<'_>, status: StatusCode) -> Result<HttpResponse, CrudError> {
    let mut context = page_context(
        Some(page.principal),
        Some(M::ENDPOINT),
        page.flash_messages,
    );
    context.insert("model_name", M::NAME);
    context.insert("list_url", &list_url::<M>());
    context.insert(
        "fields",
        &field_views(M::FORM, page.values, page.form_context, page.errors),
    );
    context.insert("form_error", &page.errors.get("form"));
    let action = match page.record_id {
        Some(id) => format!("/admin/{}/edit/{}", M::ENDPOINT, id),
        None => format!("/admin/{}/new", M::ENDPOINT),
    };
    context.insert("action", &action);
    context.insert("record_id", &page.record_id);

    render_page_with_status("admin/model/form.html", &context, status)
        .context("Failed to render form")
        .map_err(CrudError::from)
}

#[tracing::instrument(name = "List records", skip_all, fields(model = M::ENDPOINT))]
async fn list<M: ModelAdmin>(
    query: web::Query<Vec<(String, String)>>,
    pool: web::Data<PgPool>,
    settings: web::Data<AdminSettings>,
    principal: web::ReqData<Principal>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, CrudError> {
    let params = parse_list_params::<M>(query)?;
    let list_query = ListQuery::new(&M::LIST, &params, settings.page_size);

    // One connection serves every query of the request.
    let mut conn = pool
        .acquire()
        .await
        .context("Failed to acquire a Postgres connection from the pool")?;

    let rows = list_query
        .page_query()
        .build_query_as::<M::Record>()
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch page")?;
    let row_count = list_query
        .filtered()
        .count()
        .build_query_scalar::<i64>()
        .fetch_one(&mut *conn)
        .await
        .context("Failed to count records")?;

    let row_views = rows
        .iter()
        .map(row_view::<M>)
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to serialize records")?;

    let principal = principal.into_inner();
    let mut context = page_context(Some(&principal), Some(M::ENDPOINT), &flash_messages);
    context.insert("model_name", M::NAME);
    context.insert("list_url", &list_url::<M>());
    context.insert("headers", &header_views::<M>(&params));
    context.insert("rows", &row_views);
    context.insert("searchable", &!M::LIST.searchable.is_empty());
    context.insert("search", &params.search);
    context.insert("filters", &filter_inputs::<M>(&params));
    context.insert(
        "pages",
        &page_links(&params, list_query.page_count(row_count)),
    );
    context.insert("row_count", &row_count);
    context.insert(
        "export_url",
        &format!("export.json?{}", params.to_query_string(0)),
    );

    M::extend_list_context(&rows, list_query.filtered(), &mut conn, &mut context)
        .await
        .context("Failed to extend the listing context")?;

    render_page(M::LIST_TEMPLATE, &context)
        .context("Failed to render listing")
        .map_err(CrudError::from)
}

#[tracing::instrument(name = "Export records", skip_all, fields(model = M::ENDPOINT))]
async fn export<M: ModelAdmin>(
    query: web::Query<Vec<(String, String)>>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, CrudError> {
    let params = parse_list_params::<M>(query)?;
    let list_query = ListQuery::new(&M::LIST, &params, 1);

    let rows = list_query
        .filtered()
        .rows()
        .build_query_as::<M::Record>()
        .fetch_all(pool.get_ref())
        .await
        .context("Failed to fetch records to export")?;

    Ok(HttpResponse::Ok().json(rows))
}

async fn create_form<M: ModelAdmin>(
    pool: web::Data<PgPool>,
    settings: web::Data<AdminSettings>,
    principal: web::ReqData<Principal>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, CrudError> {
    let mut conn = pool
        .acquire()
        .await
        .context("Failed to acquire a Postgres connection from the pool")?;
    let form_context = form_context::<M>(&mut conn, &settings).await?;

    render_form::<M>(
        FormPage {
            principal: &principal,
            flash_messages: &flash_messages,
            form_context: &form_context,
            values: &FormFields::new(),
            errors: &FieldErrors::new(),
            record_id: None,
        },
        StatusCode::OK,
    )
}

#[tracing::instrument(name = "Create record", skip_all, fields(model = M::ENDPOINT))]
async fn create<M: ModelAdmin>(
    form: web::Form<FormFields>,
    pool: web::Data<PgPool>,
    settings: web::Data<AdminSettings>,
    principal: web::ReqData<Principal>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, CrudError> {
    let values = form.into_inner();
    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool")?;
    let form_context = form_context::<M>(&mut transaction, &settings).await?;

    let rejected = |errors: &FieldErrors| {
        render_form::<M>(
            FormPage {
                principal: &principal,
                flash_messages: &flash_messages,
                form_context: &form_context,
                values: &values,
                errors,
                record_id: None,
            },
            StatusCode::BAD_REQUEST,
        )
    };

    let input = match M::parse_form(&values, &form_context, FormMode::Create) {
        Ok(input) => input,
        Err(errors) => return rejected(&errors),
    };

    let id = match M::insert(&mut transaction, input).await {
        Ok(id) => id,
        Err(e) => {
            return match unique_violation::<M>(&e) {
                Some(errors) => rejected(&errors),
                None => Err(e.context("Failed to create record").into()),
            }
        }
    };

    transaction
        .commit()
        .await
        .context("Failed to commit SQL transaction to create record")?;
    tracing::info!(id, "Record created");

    FlashMessage::info("Record was successfully created.").send();
    Ok(see_other(&list_url::<M>()))
}

async fn edit_form<M: ModelAdmin>(
    path: web::Path<i32>,
    pool: web::Data<PgPool>,
    settings: web::Data<AdminSettings>,
    principal: web::ReqData<Principal>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, CrudError> {
    let id = path.into_inner();
    let mut conn = pool
        .acquire()
        .await
        .context("Failed to acquire a Postgres connection from the pool")?;
    let record = fetch_record::<M>(&mut conn, id).await?;
    let form_context = form_context::<M>(&mut conn, &settings).await?;

    render_form::<M>(
        FormPage {
            principal: &principal,
            flash_messages: &flash_messages,
            form_context: &form_context,
            values: &M::form_values(&record),
            errors: &FieldErrors::new(),
            record_id: Some(id),
        },
        StatusCode::OK,
    )
}

#[tracing::instrument(name = "Edit record", skip_all, fields(model = M::ENDPOINT, id = %path))]
async fn edit<M: ModelAdmin>(
    path: web::Path<i32>,
    form: web::Form<FormFields>,
    pool: web::Data<PgPool>,
    settings: web::Data<AdminSettings>,
    principal: web::ReqData<Principal>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, CrudError> {
    let id = path.into_inner();
    let values = form.into_inner();
    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool")?;
    let form_context = form_context::<M>(&mut transaction, &settings).await?;

    let rejected = |errors: &FieldErrors| {
        render_form::<M>(
            FormPage {
                principal: &principal,
                flash_messages: &flash_messages,
                form_context: &form_context,
                values: &values,
                errors,
                record_id: Some(id),
            },
            StatusCode::BAD_REQUEST,
        )
    };

    let input = match M::parse_form(&values, &form_context, FormMode::Edit) {
        Ok(input) => input,
        Err(errors) => return rejected(&errors),
    };

    match M::update(&mut transaction, id, input).await {
        Ok(true) => {}
        Ok(false) => return Err(CrudError::NotFound),
        Err(e) => {
            return match unique_violation::<M>(&e) {
                Some(errors) => rejected(&errors),
                None => Err(e.context("Failed to update record").into()),
            }
        }
    }

    transaction
        .commit()
        .await
        .context("Failed to commit SQL transaction to update record")?;

    FlashMessage::info("Record was successfully saved.").send();
    Ok(see_other(&list_url::<M>()))
}

#[derive(serde::Deserialize)]
pub struct FieldUpdate {
    name: String,
    value: String,
}

fn is_xhr(request: &HttpRequest) -> bool {
    request
        .headers()
        .get("X-Requested-With")
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// In-place edit of a single column from the listing.
///
/// Script callers get a plain text body; the listing's own form is sent back to the listing.
#[tracing::instrument(
    name = "Update record field",
    skip_all,
    fields(model = M::ENDPOINT, id = %path, field = %form.name)
)]
async fn update_field<M: ModelAdmin>(
    request: HttpRequest,
    path: web::Path<i32>,
    form: web::Form<FieldUpdate>,
    pool: web::Data<PgPool>,
    settings: web::Data<AdminSettings>,
) -> Result<HttpResponse, CrudError> {
    let id = path.into_inner();
    let FieldUpdate { name, value } = form.into_inner();

    if !M::EDITABLE.contains(&name.as_str()) {
        return Err(CrudError::ValidationError(format!(
            "{} cannot be edited in place",
            name
        )));
    }

    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool")?;
    let record = fetch_record::<M>(&mut transaction, id).await?;
    let form_context = form_context::<M>(&mut transaction, &settings).await?;

    let mut values = M::form_values(&record);
    values.set(&name, value);
    let input = M::parse_form(&values, &form_context, FormMode::Edit)
        .map_err(|errors| CrudError::ValidationError(errors.to_string()))?;

    match M::update(&mut transaction, id, input).await {
        Ok(true) => {}
        Ok(false) => return Err(CrudError::NotFound),
        Err(e) => {
            return Err(match unique_violation::<M>(&e) {
                Some(errors) => CrudError::ValidationError(errors.to_string()),
                None => e.context("Failed to update record").into(),
            })
        }
    }

    transaction
        .commit()
        .await
        .context("Failed to commit SQL transaction to update record")?;

    if is_xhr(&request) {
        return Ok(HttpResponse::Ok().body("Record was successfully saved."));
    }

    FlashMessage::info("Record was successfully saved.").send();
    Ok(see_other(&list_url::<M>()))
}

#[tracing::instrument(name = "Delete record", skip_all, fields(model = M::ENDPOINT, id = %path))]
async fn delete<M: ModelAdmin>(
    path: web::Path<i32>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, CrudError> {
    let id = path.into_inner();

    let result = query::delete_by_id(&M::LIST, id)
        .build()
        .execute(pool.get_ref())
        .await
        .context("Failed to delete record")?;
    if result.rows_affected() == 0 {
        return Err(CrudError::NotFound);
    }

    FlashMessage::info("Record was successfully deleted.").send();
    Ok(see_other(&list_url::<M>()))
}

#[derive(serde::Serialize)]
struct DetailView {
    label: &'static str,
    value: String,
}

async fn details<M: ModelAdmin>(
    path: web::Path<i32>,
    pool: web::Data<PgPool>,
    principal: web::ReqData<Principal>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, CrudError> {
    let id = path.into_inner();
    let mut conn = pool
        .acquire()
        .await
        .context("Failed to acquire a Postgres connection from the pool")?;
    let record = fetch_record::<M>(&mut conn, id).await?;

    let values = cells(&record, M::LIST.columns).context("Failed to serialize record")?;
    let details: Vec<DetailView> = M::LIST
        .columns
        .iter()
        .zip(values)
        .map(|(column, value)| DetailView {
            label: column.label,
            value,
        })
        .collect();

    let principal = principal.into_inner();
    let mut context = page_context(Some(&principal), Some(M::ENDPOINT), &flash_messages);
    context.insert("model_name", M::NAME);
    context.insert("list_url", &list_url::<M>());
    context.insert("record_id", &id);
    context.insert("record_title", &M::record_title(&record));
    context.insert("details", &details);

    render_page("admin/model/details.html", &context)
        .context("Failed to render details")
        .map_err(CrudError::from)
}
