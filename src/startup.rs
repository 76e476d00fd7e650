use std::net::TcpListener;

use actix_session::{storage::RedisSessionStore, SessionMiddleware};
use actix_web::{cookie::Key, dev::Server, middleware::from_fn, web, App, HttpServer};
use actix_web_flash_messages::{storage::CookieMessageStore, FlashMessagesFramework};
use secrecy::{ExposeSecret, Secret};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing_actix_web::TracingLogger;

use crate::{
    admin::{
        crud_scope,
        views::{ProjectAdmin, RoleAdmin, UserAdmin},
    },
    authentication::enforce_admin_access,
    configuration::{AdminSettings, DatabaseSettings, Settings},
    routes::{admin_index, custom_view, health_check, home, log_out, login, login_form},
};

pub async fn run(
    listener: TcpListener,
    db_pool: PgPool,
    admin_settings: AdminSettings,
    hmac_secret: Secret<String>,
    redis_uri: Secret<String>,
) -> Result<Server, anyhow::Error> {
    let secret_key = Key::try_from(hmac_secret.expose_secret().as_bytes())?;
    let message_store = CookieMessageStore::builder(secret_key.clone()).build();
    let message_framework = FlashMessagesFramework::builder(message_store).build();
    let redis_store = RedisSessionStore::new(redis_uri.expose_secret()).await?;

    let db_pool = web::Data::new(db_pool);
    let admin_settings = web::Data::new(admin_settings);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(message_framework.clone())
            .wrap(SessionMiddleware::new(
                redis_store.clone(),
                secret_key.clone(),
            ))
            .app_data(db_pool.clone())
            .app_data(admin_settings.clone())
            .route("/", web::get().to(home))
            .route("/health_check", web::get().to(health_check))
            .route("/login", web::get().to(login_form))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(log_out))
            .service(
                web::scope("/admin")
                    .wrap(from_fn(enforce_admin_access))
                    .route("", web::get().to(admin_index))
                    .route("/", web::get().to(admin_index))
                    .route("/custom/", web::get().to(custom_view))
                    .service(crud_scope::<RoleAdmin>())
                    .service(crud_scope::<UserAdmin>())
                    .service(crud_scope::<ProjectAdmin>()),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(configuration.with_db())
}

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let connection_pool = get_connection_pool(&configuration.database);
        let listener = TcpListener::bind(configuration.application.address())?;
        let port = listener.local_addr()?.port();

        let server = run(
            listener,
            connection_pool,
            configuration.admin,
            configuration.application.hmac_secret,
            configuration.redis_uri,
        )
        .await?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}
