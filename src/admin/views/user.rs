use anyhow::Context;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use sqlx::PgConnection;

use crate::{
    admin::{
        schema::{Column, ColumnKind, FormField, InputKind, ListSchema},
        Choice, FieldErrors, FormContext, FormFields, FormMode, ModelAdmin,
    },
    authentication::compute_password_hash,
    domain::{PersonName, UserEmail, UserPassword},
    telemetry::spawn_blocking_with_tracing,
};

/// A user as the admin interface sees it: the password hash is never loaded.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct User {
    pub id: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub active: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub roles: Vec<String>,
    #[serde(skip)]
    pub role_ids: Vec<i32>,
}

#[derive(Debug)]
pub struct UserInput {
    first_name: Option<PersonName>,
    last_name: Option<PersonName>,
    email: UserEmail,
    password: Option<UserPassword>,
    active: bool,
    role_ids: Vec<i32>,
}

pub struct UserAdmin;

impl UserAdmin {
    fn parse_roles(form: &FormFields, context: &FormContext) -> Result<Vec<i32>, String> {
        let known = context.choices_for("roles");
        let mut role_ids = Vec::new();

        for raw in form.get_all("roles") {
            if !known.iter().any(|c| c.value == raw) {
                return Err(format!("{} is not a known role", raw));
            }
            let id: i32 = raw.parse().map_err(|_| format!("{} is not a known role", raw))?;
            if !role_ids.contains(&id) {
                role_ids.push(id);
            }
        }

        Ok(role_ids)
    }
}

fn optional_name(name: &Option<PersonName>) -> Option<&str> {
    name.as_ref().map(|n| n.as_ref())
}

async fn hash_password(password: UserPassword) -> Result<String, anyhow::Error> {
    let hash = spawn_blocking_with_tracing(move || compute_password_hash(password.into_secret()))
        .await
        .context("Failed to spawn blocking task.")??;

    Ok(hash.expose_secret().to_string())
}

#[tracing::instrument(name = "Replace user roles", skip(conn))]
async fn replace_roles(
    conn: &mut PgConnection,
    user_id: i32,
    role_ids: &[i32],
) -> Result<(), sqlx::Error> {
    sqlx::query!("DELETE FROM roles_users WHERE user_id = $1", user_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query!(
        r#"
        INSERT INTO roles_users (user_id, role_id)
        SELECT $1, UNNEST($2::INT[])
        "#,
        user_id,
        role_ids,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl ModelAdmin for UserAdmin {
    type Record = User;
    type Input = UserInput;

    const NAME: &'static str = "Users";
    const ENDPOINT: &'static str = "user";
    const LIST: ListSchema = ListSchema {
        table: "user",
        select: r#"id, first_name, last_name, email, active, confirmed_at,
            ARRAY(
                SELECT r.name::TEXT
                FROM roles_users ru
                JOIN role r ON r.id = ru.role_id
                WHERE ru.user_id = "user".id
                ORDER BY r.name
            ) AS roles,
            ARRAY(
                SELECT ru.role_id
                FROM roles_users ru
                WHERE ru.user_id = "user".id
                ORDER BY ru.role_id
            ) AS role_ids"#,
        columns: &[
            Column::new("first_name", "First Name", ColumnKind::Text),
            Column::new("last_name", "Last Name", ColumnKind::Text),
            Column::new("email", "Email", ColumnKind::Text),
            Column::new("active", "Active", ColumnKind::Boolean),
            Column::new("confirmed_at", "Confirmed At", ColumnKind::Timestamp),
            Column::new("roles", "Roles", ColumnKind::TextList),
        ],
        searchable: &["email", "first_name", "last_name"],
        filterable: &["email", "first_name", "last_name"],
        sortable: &["email", "first_name", "last_name"],
    };
    const FORM: &'static [FormField] = &[
        FormField::new("first_name", "First Name", InputKind::Text),
        FormField::new("last_name", "Last Name", InputKind::Text),
        FormField::new("email", "Email", InputKind::Email),
        FormField::new("password", "Password", InputKind::Password),
        FormField::new("active", "Active", InputKind::Checkbox),
        FormField::new("roles", "Roles", InputKind::MultiSelect),
    ];
    const EDITABLE: &'static [&'static str] = &["email", "first_name", "last_name"];

    fn record_id(record: &User) -> i32 {
        record.id
    }

    fn record_title(record: &User) -> String {
        record.email.clone()
    }

    fn form_values(record: &User) -> FormFields {
        let mut values = FormFields::new();
        values.push("first_name", record.first_name.clone().unwrap_or_default());
        values.push("last_name", record.last_name.clone().unwrap_or_default());
        values.push("email", record.email.clone());
        if record.active {
            values.push("active", "y");
        }
        for role_id in &record.role_ids {
            values.push("roles", role_id.to_string());
        }
        values
    }

    fn parse_form(
        form: &FormFields,
        context: &FormContext,
        mode: FormMode,
    ) -> Result<UserInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let first_name = PersonName::parse_optional(form.get("first_name").map(str::to_string))
            .map_err(|e| errors.add("first_name", e))
            .ok()
            .flatten();
        let last_name = PersonName::parse_optional(form.get("last_name").map(str::to_string))
            .map_err(|e| errors.add("last_name", e))
            .ok()
            .flatten();
        let email = UserEmail::parse(form.get("email").unwrap_or_default().to_string())
            .map_err(|e| errors.add("email", e))
            .ok();

        // On edit a blank password keeps the stored one.
        let password = match form.get("password").filter(|p| !p.is_empty()) {
            Some(p) => UserPassword::parse(Secret::new(p.to_string()))
                .map_err(|e| errors.add("password", e))
                .ok(),
            None => {
                if mode == FormMode::Create {
                    errors.add("password", "Password is required.");
                }
                None
            }
        };

        let role_ids = Self::parse_roles(form, context)
            .map_err(|e| errors.add("roles", e))
            .unwrap_or_default();

        match email {
            Some(email) if errors.is_empty() => Ok(UserInput {
                first_name,
                last_name,
                email,
                password,
                active: form.is_checked("active"),
                role_ids,
            }),
            _ => Err(errors),
        }
    }

    #[tracing::instrument(name = "Insert user", skip(conn, input), fields(email = %input.email))]
    async fn insert(conn: &mut PgConnection, input: UserInput) -> Result<i32, anyhow::Error> {
        let password = input
            .password
            .ok_or_else(|| anyhow::anyhow!("A new user needs a password"))?;
        let password_hash = hash_password(password).await?;

        let user_id = sqlx::query_scalar!(
            r#"
            INSERT INTO "user" (first_name, last_name, email, password, active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
            optional_name(&input.first_name),
            optional_name(&input.last_name),
            input.email.as_ref(),
            password_hash,
            input.active,
        )
        .fetch_one(&mut *conn)
        .await
        .context("Failed to insert user")?;

        replace_roles(conn, user_id, &input.role_ids)
            .await
            .context("Failed to store user roles")?;

        Ok(user_id)
    }

    #[tracing::instrument(name = "Update user", skip(conn, input))]
    async fn update(
        conn: &mut PgConnection,
        id: i32,
        input: UserInput,
    ) -> Result<bool, anyhow::Error> {
        let result = sqlx::query!(
            r#"
            UPDATE "user"
            SET first_name = $2, last_name = $3, email = $4, active = $5
            WHERE id = $1
            "#,
            id,
            optional_name(&input.first_name),
            optional_name(&input.last_name),
            input.email.as_ref(),
            input.active,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to update user")?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(password) = input.password {
            let password_hash = hash_password(password).await?;
            sqlx::query!(
                r#"UPDATE "user" SET password = $2 WHERE id = $1"#,
                id,
                password_hash,
            )
            .execute(&mut *conn)
            .await
            .context("Failed to update user password")?;
        }

        replace_roles(conn, id, &input.role_ids)
            .await
            .context("Failed to store user roles")?;

        Ok(true)
    }

    async fn choices(
        conn: &mut PgConnection,
    ) -> Result<Vec<(&'static str, Vec<Choice>)>, sqlx::Error> {
        let roles = sqlx::query!("SELECT id, name FROM role ORDER BY name")
            .fetch_all(conn)
            .await?;

        let choices = roles
            .into_iter()
            .map(|r| Choice {
                value: r.id.to_string(),
                label: r.name,
            })
            .collect();

        Ok(vec![("roles", choices)])
    }
}
