//! The admin interface: per-entity descriptions and the generic controller
//! that serves them.

mod crud;
mod form;
pub mod query;
pub mod schema;
pub mod summary;
pub mod views;

use sqlx::{postgres::PgRow, PgConnection};

pub use crud::{crud_scope, CrudError};
pub use form::{Choice, FieldErrors, FormContext, FormFields, FormMode};

use crate::admin::{
    query::FilteredQuery,
    schema::{FormField, ListSchema},
};

/// Explicit description of one entity collection in the admin interface.
///
/// Implementors are unit structs; the generic handlers in [`crud_scope`]
/// are instantiated once per implementor.
#[allow(async_fn_in_trait)]
pub trait ModelAdmin: 'static {
    type Record: for<'r> sqlx::FromRow<'r, PgRow> + serde::Serialize + Send + Unpin;
    /// Validated form submission.
    type Input;

    /// Human readable collection name, e.g. "Projects".
    const NAME: &'static str;
    /// Path segment under `/admin`.
    const ENDPOINT: &'static str;
    const LIST: ListSchema;
    const FORM: &'static [FormField];
    /// Columns that can be changed in place from the listing.
    const EDITABLE: &'static [&'static str] = &[];
    const LIST_TEMPLATE: &'static str = "admin/model/list.html";

    fn record_id(record: &Self::Record) -> i32;

    /// One line describing a record, used in flash messages and titles.
    fn record_title(record: &Self::Record) -> String;

    /// Current values of a record, shaped like a form submission.
    fn form_values(record: &Self::Record) -> FormFields;

    fn parse_form(
        form: &FormFields,
        context: &FormContext,
        mode: FormMode,
    ) -> Result<Self::Input, FieldErrors>;

    async fn insert(conn: &mut PgConnection, input: Self::Input) -> Result<i32, anyhow::Error>;

    /// Returns `false` when no record has the given id.
    async fn update(
        conn: &mut PgConnection,
        id: i32,
        input: Self::Input,
    ) -> Result<bool, anyhow::Error>;

    /// Options for multi-valued form fields.
    async fn choices(_conn: &mut PgConnection) -> Result<Vec<(&'static str, Vec<Choice>)>, sqlx::Error> {
        Ok(Vec::new())
    }

    /// Hook to add entity specific data to the listing context.
    async fn extend_list_context(
        _page_rows: &[Self::Record],
        _filtered: &FilteredQuery,
        _conn: &mut PgConnection,
        _context: &mut tera::Context,
    ) -> Result<(), sqlx::Error> {
        Ok(())
    }
}
