use anyhow::Context;
use clap::Command;

use dashboard::{
    configuration::get_configuration,
    seed::create_database,
    startup::{get_connection_pool, Application},
    telemetry::{get_subscriber, init_subscriber},
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("dashboard".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let cli = Command::new("dashboard")
        .about("Admin dashboard over users, roles and projects")
        .subcommand(Command::new("serve").about("Run the web server (default)"))
        .subcommand(
            Command::new("create-database")
                .about("Drop every table, re-run the migrations and seed sample data"),
        );
    let matches = cli.get_matches();

    let configuration = get_configuration().context("Failed to read configuration.")?;

    match matches.subcommand() {
        Some(("create-database", _)) => {
            let pool = get_connection_pool(&configuration.database);
            create_database(&pool, &configuration.seed).await?;
        }
        _ => {
            let application = Application::build(configuration).await?;
            application.run_until_stopped().await?;
        }
    }

    Ok(())
}
