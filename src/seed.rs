//! `create-database`: rebuilds the schema and fills it with sample data.

use std::collections::HashSet;

use anyhow::Context;
use rand::{thread_rng, Rng};
use secrecy::{ExposeSecret, Secret};
use sqlx::{PgConnection, PgPool};

use crate::{
    authentication::compute_password_hash,
    configuration::SeedSettings,
    domain::UserEmail,
    telemetry::spawn_blocking_with_tracing,
    user_role::UserRole,
};

const FIRST_NAMES: [&str; 25] = [
    "Harry", "Amelia", "Oliver", "Jack", "Isabella", "Charlie", "Sophie", "Mia", "Jacob", "Thomas",
    "Emily", "Lily", "Ava", "Isla", "Alfie", "Olivia", "Jessica", "Riley", "William", "James",
    "Geoffrey", "Lisa", "Benjamin", "Stacey", "Lucy",
];

const LAST_NAMES: [&str; 25] = [
    "Brown", "Smith", "Patel", "Jones", "Williams", "Johnson", "Taylor", "Thomas", "Roberts",
    "Khan", "Lewis", "Jackson", "Clarke", "James", "Phillips", "Wilson", "Ali", "Mason",
    "Mitchell", "Rose", "Davis", "Davies", "Rodriguez", "Cox", "Alexander",
];

const LOWERCASE_AND_DIGITS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const UPPERCASE_AND_DIGITS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_string(charset: &[u8], len: usize) -> String {
    let mut rng = thread_rng();
    std::iter::repeat_with(|| charset[rng.gen_range(0..charset.len())] as char)
        .take(len)
        .collect()
}

/// Sample user: first name, last name, e-mail.
fn sample_users() -> impl Iterator<Item = (&'static str, &'static str, String)> {
    FIRST_NAMES
        .iter()
        .zip(LAST_NAMES.iter())
        .map(|(&first, &last)| {
            let email = format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase());
            (first, last, email)
        })
}

/// `count` distinct project names paired with costs in `1..1000`.
fn sample_projects(count: usize) -> Vec<(String, i32)> {
    let mut names = HashSet::with_capacity(count);
    while names.len() < count {
        names.insert(random_string(UPPERCASE_AND_DIGITS, 10));
    }

    let mut rng = thread_rng();
    names
        .into_iter()
        .map(|name| (name, rng.gen_range(1..1000)))
        .collect()
}

async fn hash(password: Secret<String>) -> Result<String, anyhow::Error> {
    let hash = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("Failed to spawn blocking task.")??;

    Ok(hash.expose_secret().to_string())
}

async fn insert_user(
    conn: &mut PgConnection,
    first_name: &str,
    last_name: Option<&str>,
    email: &str,
    password: Secret<String>,
    role_ids: &[i32],
) -> Result<i32, anyhow::Error> {
    let password_hash = hash(password).await?;
    let user_id = sqlx::query_scalar!(
        r#"
        INSERT INTO "user" (first_name, last_name, email, password, active)
        VALUES ($1, $2, $3, $4, TRUE)
        RETURNING id
        "#,
        first_name,
        last_name,
        email,
        password_hash,
    )
    .fetch_one(&mut *conn)
    .await
    .with_context(|| format!("Failed to insert user {}", email))?;

    sqlx::query!(
        r#"
        INSERT INTO roles_users (user_id, role_id)
        SELECT $1, UNNEST($2::INT[])
        "#,
        user_id,
        role_ids,
    )
    .execute(&mut *conn)
    .await
    .context("Failed to assign roles")?;

    Ok(user_id)
}

#[tracing::instrument(name = "Reset schema", skip(pool))]
async fn reset_schema(pool: &PgPool) -> Result<(), anyhow::Error> {
    sqlx::query(
        r#"DROP TABLE IF EXISTS roles_users, "user", role, project, _sqlx_migrations CASCADE"#,
    )
    .execute(pool)
    .await
    .context("Failed to drop dashboard tables")?;

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to migrate the database")?;

    Ok(())
}

/// Drops and recreates every table, then seeds roles, users and projects.
///
/// Each of the three batches is committed on its own.
#[tracing::instrument(name = "Create database", skip_all)]
pub async fn create_database(pool: &PgPool, settings: &SeedSettings) -> Result<(), anyhow::Error> {
    let admin_email =
        UserEmail::parse(settings.admin_email.clone()).context("Invalid seed.admin_email")?;

    reset_schema(pool).await?;

    let mut transaction = pool.begin().await.context("Failed to begin transaction")?;
    let mut role_ids = Vec::with_capacity(UserRole::ALL.len());
    for role in UserRole::ALL {
        let id = sqlx::query_scalar!(
            "INSERT INTO role (name) VALUES ($1) RETURNING id",
            role.as_str()
        )
        .fetch_one(&mut *transaction)
        .await
        .with_context(|| format!("Failed to insert role {}", role))?;
        role_ids.push((role, id));
    }
    transaction.commit().await.context("Failed to commit roles")?;

    let id_of = |wanted: UserRole| {
        role_ids
            .iter()
            .find(|(role, _)| *role == wanted)
            .map(|(_, id)| *id)
            .context("Missing seeded role")
    };
    let user_role_id = id_of(UserRole::User)?;
    let superuser_role_id = id_of(UserRole::Superuser)?;

    let mut transaction = pool.begin().await.context("Failed to begin transaction")?;
    insert_user(
        &mut transaction,
        "Admin",
        None,
        admin_email.as_ref(),
        settings.admin_password.clone(),
        &[user_role_id, superuser_role_id],
    )
    .await?;
    for (first_name, last_name, email) in sample_users() {
        let password = Secret::new(random_string(LOWERCASE_AND_DIGITS, 10));
        insert_user(
            &mut transaction,
            first_name,
            Some(last_name),
            &email,
            password,
            &[user_role_id],
        )
        .await?;
    }
    transaction.commit().await.context("Failed to commit users")?;

    let mut transaction = pool.begin().await.context("Failed to begin transaction")?;
    for (name, cost) in sample_projects(settings.projects as usize) {
        sqlx::query!("INSERT INTO project (name, cost) VALUES ($1, $2)", name, cost)
            .execute(&mut *transaction)
            .await
            .context("Failed to insert project")?;
    }
    transaction.commit().await.context("Failed to commit projects")?;

    tracing::info!(
        users = FIRST_NAMES.len() + 1,
        projects = settings.projects,
        "Database seeded"
    );

    Ok(())
}
