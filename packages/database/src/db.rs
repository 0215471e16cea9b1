//! Database connection utilities.

use switchy_database::Database;
use switchy_database_connection::Credentials;

/// Connection settings for the telemetry database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DbConfig {
    /// Renders the settings as a `postgres://` URL.
    #[must_use]
    pub fn to_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// Connects to the telemetry database with explicit settings.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(config: &DbConfig) -> Result<Box<dyn Database>, Box<dyn std::error::Error>> {
    connect_url(&config.to_url()).await
}

/// Connects to the telemetry database from a connection URL.
///
/// Configures a 30-second `statement_timeout` so stalled queries fail
/// with an error instead of hanging the whole pass.
///
/// # Errors
///
/// Returns an error if the URL cannot be parsed or the connection fails.
pub async fn connect_url(url: &str) -> Result<Box<dyn Database>, Box<dyn std::error::Error>> {
    // Strip query parameters (e.g., ?sslmode=require) that the Credentials
    // parser doesn't understand. TLS is handled by the native-tls connector
    // automatically.
    let url_base = url.split('?').next().unwrap_or(url);

    let creds = Credentials::from_url(url_base)?;
    let db = switchy_database_connection::init_postgres_raw_native_tls(creds).await?;

    db.exec_raw("SET statement_timeout = '30s'").await?;

    Ok(db)
}
