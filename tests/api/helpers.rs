use argon2::{password_hash::SaltString, Algorithm, Argon2, Params, PasswordHasher, Version};
use dashboard::{
    configuration::{get_configuration, DatabaseSettings},
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};
use once_cell::sync::Lazy;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber("test".into(), "debug".into(), std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber("test".into(), "debug".into(), std::io::sink);
        init_subscriber(subscriber);
    }
});

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres.");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database");

    connection_pool
}

pub struct TestUser {
    pub user_id: i32,
    pub email: String,
    pub password: String,
}

impl TestUser {
    pub fn generate() -> Self {
        Self {
            user_id: 0,
            email: format!("{}@example.com", Uuid::new_v4()),
            password: Uuid::new_v4().to_string(),
        }
    }

    /// Stores the user with the given role names, which must exist.
    pub async fn store(mut self, pool: &PgPool, roles: &[&str], active: bool) -> Self {
        let salt = SaltString::generate(&mut rand::thread_rng());
        // Cheap parameters: tests do not need a slow hash.
        let password_hash = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(1000, 1, 1, None).unwrap(),
        )
        .hash_password(self.password.as_bytes(), &salt)
        .unwrap()
        .to_string();

        self.user_id = sqlx::query_scalar!(
            r#"
            INSERT INTO "user" (first_name, email, password, active)
            VALUES ('Test', $1, $2, $3)
            RETURNING id
            "#,
            self.email,
            password_hash,
            active,
        )
        .fetch_one(pool)
        .await
        .expect("Failed to store test user.");

        let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
        sqlx::query!(
            r#"
            INSERT INTO roles_users (user_id, role_id)
            SELECT $1, id FROM role WHERE name = ANY($2::TEXT[])
            "#,
            self.user_id,
            &roles[..],
        )
        .execute(pool)
        .await
        .expect("Failed to assign test user roles.");

        self
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db_pool: PgPool,
    pub api_client: reqwest::Client,
    pub superuser: TestUser,
    pub plain_user: TestUser,
}

impl TestApp {
    pub async fn post_login<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(&format!("{}/login", &self.address))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login_as(&self, user: &TestUser) -> reqwest::Response {
        self.post_login(&serde_json::json!({
            "email": &user.email,
            "password": &user.password,
        }))
        .await
    }

    pub async fn login_as_superuser(&self) {
        let response = self.login_as(&self.superuser).await;
        assert_is_redirect_to(&response, "/admin/");
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}{}", &self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_html(&self, path: &str) -> String {
        self.get(path).await.text().await.unwrap()
    }

    pub async fn post_form<Body>(&self, path: &str, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize + ?Sized,
    {
        self.api_client
            .post(&format!("{}{}", &self.address, path))
            .form(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_logout(&self) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/logout", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Inserts projects named `P01`, `P02`, ... with the given costs.
    pub async fn insert_projects(&self, costs: &[i32]) {
        for (i, cost) in costs.iter().enumerate() {
            sqlx::query!(
                "INSERT INTO project (name, cost) VALUES ($1, $2)",
                format!("P{:02}", i + 1),
                cost,
            )
            .execute(&self.db_pool)
            .await
            .expect("Failed to insert project.");
        }
    }
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.database.database_name = Uuid::new_v4().to_string();
        c.application.port = 0;
        c
    };

    let db_pool = configure_database(&configuration.database).await;

    for role in ["user", "superuser"] {
        sqlx::query!("INSERT INTO role (name) VALUES ($1)", role)
            .execute(&db_pool)
            .await
            .expect("Failed to insert role.");
    }

    let application = Application::build(configuration.clone())
        .await
        .expect("Failed to build application.");
    let port = application.port();
    let address = format!("http://127.0.0.1:{}", port);
    #[allow(clippy::let_underscore_future)]
    let _ = tokio::spawn(application.run_until_stopped());

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .cookie_store(true)
        .build()
        .unwrap();

    let superuser = TestUser::generate()
        .store(&db_pool, &["user", "superuser"], true)
        .await;
    let plain_user = TestUser::generate().store(&db_pool, &["user"], true).await;

    TestApp {
        address,
        port,
        db_pool,
        api_client,
        superuser,
        plain_user,
    }
}

pub fn assert_is_redirect_to(response: &reqwest::Response, location: &str) {
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(response.headers().get("Location").unwrap(), location);
}
