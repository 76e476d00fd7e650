use anyhow::Context;
use sqlx::PgConnection;

use crate::{
    admin::{
        schema::{Column, ColumnKind, FormField, InputKind, ListSchema},
        FieldErrors, FormContext, FormFields, FormMode, ModelAdmin,
    },
    domain::RoleName,
};

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug)]
pub struct RoleInput {
    name: RoleName,
    description: Option<String>,
}

pub struct RoleAdmin;

impl ModelAdmin for RoleAdmin {
    type Record = Role;
    type Input = RoleInput;

    const NAME: &'static str = "Roles";
    const ENDPOINT: &'static str = "role";
    const LIST: ListSchema = ListSchema {
        table: "role",
        select: "id, name, description",
        columns: &[
            Column::new("name", "Name", ColumnKind::Text),
            Column::new("description", "Description", ColumnKind::Text),
        ],
        searchable: &["name", "description"],
        filterable: &[],
        sortable: &["name"],
    };
    const FORM: &'static [FormField] = &[
        FormField::new("name", "Name", InputKind::Text),
        FormField::new("description", "Description", InputKind::TextArea),
    ];

    fn record_id(record: &Role) -> i32 {
        record.id
    }

    fn record_title(record: &Role) -> String {
        record.name.clone()
    }

    fn form_values(record: &Role) -> FormFields {
        let mut values = FormFields::new();
        values.push("name", record.name.clone());
        values.push("description", record.description.clone().unwrap_or_default());
        values
    }

    fn parse_form(
        form: &FormFields,
        _context: &FormContext,
        _mode: FormMode,
    ) -> Result<RoleInput, FieldErrors> {
        let name = RoleName::parse(form.get("name").unwrap_or_default().to_string())
            .map_err(|e| FieldErrors::single("name", e))?;

        let description = form
            .get("description")
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        if description.as_deref().is_some_and(|d| d.chars().count() > 255) {
            return Err(FieldErrors::single(
                "description",
                "Description cannot be longer than 255 characters",
            ));
        }

        Ok(RoleInput { name, description })
    }

    #[tracing::instrument(name = "Insert role", skip(conn, input))]
    async fn insert(conn: &mut PgConnection, input: RoleInput) -> Result<i32, anyhow::Error> {
        sqlx::query_scalar!(
            r#"
            INSERT INTO role (name, description)
            VALUES ($1, $2)
            RETURNING id
            "#,
            input.name.as_ref(),
            input.description,
        )
        .fetch_one(conn)
        .await
        .context("Failed to insert role")
    }

    #[tracing::instrument(name = "Update role", skip(conn, input))]
    async fn update(
        conn: &mut PgConnection,
        id: i32,
        input: RoleInput,
    ) -> Result<bool, anyhow::Error> {
        let result = sqlx::query!(
            r#"
            UPDATE role
            SET name = $2, description = $3
            WHERE id = $1
            "#,
            id,
            input.name.as_ref(),
            input.description,
        )
        .execute(conn)
        .await
        .context("Failed to update role")?;

        Ok(result.rows_affected() > 0)
    }
}
