use anyhow::Context;
use sqlx::PgConnection;

use crate::{
    admin::{
        query::FilteredQuery,
        schema::{Column, ColumnKind, FormField, InputKind, ListSchema},
        summary::summarize,
        FieldErrors, FormContext, FormFields, FormMode, ModelAdmin,
    },
    domain::{ProjectCost, ProjectName},
};

#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Project {
    pub id: i32,
    pub name: String,
    pub cost: i32,
}

#[derive(Debug)]
pub struct NewProject {
    name: ProjectName,
    cost: ProjectCost,
}

/// Projects, listed with page and grand cost totals.
pub struct ProjectAdmin;

impl ModelAdmin for ProjectAdmin {
    type Record = Project;
    type Input = NewProject;

    const NAME: &'static str = "Projects";
    const ENDPOINT: &'static str = "project";
    const LIST: ListSchema = ListSchema {
        table: "project",
        select: "id, name, cost",
        columns: &[
            Column::new("name", "Name", ColumnKind::Text),
            Column::new("cost", "Cost", ColumnKind::Integer),
        ],
        searchable: &["name"],
        filterable: &["cost"],
        sortable: &["name", "cost"],
    };
    const FORM: &'static [FormField] = &[
        FormField::new("name", "Name", InputKind::Text),
        FormField::new("cost", "Cost", InputKind::Number),
    ];
    const EDITABLE: &'static [&'static str] = &["name", "cost"];
    const LIST_TEMPLATE: &'static str = "admin/model/summary_list.html";

    fn record_id(record: &Project) -> i32 {
        record.id
    }

    fn record_title(record: &Project) -> String {
        format!("Name: {}; Cost : {}", record.name, record.cost)
    }

    fn form_values(record: &Project) -> FormFields {
        let mut values = FormFields::new();
        values.push("name", record.name.clone());
        values.push("cost", record.cost.to_string());
        values
    }

    fn parse_form(
        form: &FormFields,
        context: &FormContext,
        _mode: FormMode,
    ) -> Result<NewProject, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = ProjectName::parse(form.get("name").unwrap_or_default().to_string())
            .map_err(|e| errors.add("name", e))
            .ok();
        let cost = ProjectCost::parse(form.get("cost").unwrap_or_default(), context.cost_policy())
            .map_err(|e| errors.add("cost", e))
            .ok();

        match (name, cost) {
            (Some(name), Some(cost)) => Ok(NewProject { name, cost }),
            _ => Err(errors),
        }
    }

    #[tracing::instrument(name = "Insert project", skip(conn, input))]
    async fn insert(conn: &mut PgConnection, input: NewProject) -> Result<i32, anyhow::Error> {
        sqlx::query_scalar!(
            r#"
            INSERT INTO project (name, cost)
            VALUES ($1, $2)
            RETURNING id
            "#,
            input.name.as_ref(),
            input.cost.value(),
        )
        .fetch_one(conn)
        .await
        .context("Failed to insert project")
    }

    #[tracing::instrument(name = "Update project", skip(conn, input))]
    async fn update(
        conn: &mut PgConnection,
        id: i32,
        input: NewProject,
    ) -> Result<bool, anyhow::Error> {
        let result = sqlx::query!(
            r#"
            UPDATE project
            SET name = $2, cost = $3
            WHERE id = $1
            "#,
            id,
            input.name.as_ref(),
            input.cost.value(),
        )
        .execute(conn)
        .await
        .context("Failed to update project")?;

        Ok(result.rows_affected() > 0)
    }

    async fn extend_list_context(
        page_rows: &[Project],
        filtered: &FilteredQuery,
        conn: &mut PgConnection,
        context: &mut tera::Context,
    ) -> Result<(), sqlx::Error> {
        let summary = summarize(page_rows, filtered, conn).await?;
        context.insert("summary_data", &summary.rows(Self::LIST.columns));
        Ok(())
    }
}
