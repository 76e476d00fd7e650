use sqlx::PgPool;

/// The authenticated user behind a request, as plain data.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Principal {
    pub user_id: i32,
    pub email: String,
    pub first_name: Option<String>,
    pub active: bool,
    pub roles: Vec<String>,
}

#[tracing::instrument(name = "Load principal", skip(pool))]
pub async fn load_principal(user_id: i32, pool: &PgPool) -> Result<Option<Principal>, sqlx::Error> {
    sqlx::query_as!(
        Principal,
        r#"
        SELECT u.id AS user_id,
               u.email,
               u.first_name,
               u.active,
               ARRAY(
                   SELECT r.name::TEXT
                   FROM roles_users ru
                   JOIN role r ON r.id = ru.role_id
                   WHERE ru.user_id = u.id
                   ORDER BY r.name
               ) AS "roles!"
        FROM "user" u
        WHERE u.id = $1
        "#,
        user_id,
    )
    .fetch_optional(pool)
    .await
}
