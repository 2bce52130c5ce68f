use anyhow::{Context, Result};
use postgres_native_tls::MakeTlsConnector;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_postgres::{Client, NoTls};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub ssl_mode: SslMode,
    /// Accept invalid/self-signed certificates. Use with caution.
    /// Only honored in Prefer/Require modes.
    pub accept_invalid_certs: bool,
    /// Optional path to a custom CA certificate file (PEM format).
    /// If not set, the system CA store is used.
    pub ca_cert_path: Option<String>,
}

/// SSL/TLS connection modes for PostgreSQL.
///
/// These match the standard PostgreSQL sslmode parameter:
/// - `Disable`: No SSL (unencrypted)
/// - `Prefer`: Try SSL first, fall back to non-SSL (default)
/// - `Require`: Require SSL but don't verify certificate
/// - `VerifyCa`: Require SSL and verify the server certificate is signed by a trusted CA
/// - `VerifyFull`: Like VerifyCa, but also verify the server hostname matches the certificate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl PostgresConfig {
    pub fn connection_string(&self) -> String {
        let sslmode = match self.ssl_mode {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        };
        format!(
            "host={} port={} dbname={} user={} password={} sslmode={} connect_timeout=10",
            quote_conn_value(&self.host),
            self.port,
            quote_conn_value(&self.database),
            quote_conn_value(&self.username),
            quote_conn_value(&self.password),
            sslmode
        )
    }

    pub fn display_string(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: 5432,
            database: String::from("postgres"),
            username: String::from("postgres"),
            password: String::new(),
            ssl_mode: SslMode::default(),
            accept_invalid_certs: false,
            ca_cert_path: None,
        }
    }
}

/// Open a PostgreSQL client for a single unit of work.
///
/// The connection task ends once the returned client is dropped, so callers
/// release the connection simply by letting the client go out of scope.
pub async fn create_client(config: &PostgresConfig) -> Result<Client> {
    let conn_string = config.connection_string();

    let client = match config.ssl_mode {
        SslMode::Disable => {
            let (client, connection) = tokio::time::timeout(
                CONNECT_TIMEOUT,
                tokio_postgres::connect(&conn_string, NoTls),
            )
            .await
            .map_err(|_| anyhow::anyhow!("Connection timed out after 15s"))?
            .context("Failed to connect to PostgreSQL")?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!("PostgreSQL connection error: {}", e);
                }
            });
            client
        }
        SslMode::Prefer | SslMode::Require | SslMode::VerifyCa | SslMode::VerifyFull => {
            let strict_verify = matches!(config.ssl_mode, SslMode::VerifyCa | SslMode::VerifyFull);
            let tls = build_tls_connector(config, strict_verify)?;
            let (client, connection) =
                tokio::time::timeout(CONNECT_TIMEOUT, tokio_postgres::connect(&conn_string, tls))
                    .await
                    .map_err(|_| anyhow::anyhow!("Connection timed out after 15s"))?
                    .context(if strict_verify {
                        "Failed to connect to PostgreSQL with certificate verification"
                    } else {
                        "Failed to connect to PostgreSQL"
                    })?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!("PostgreSQL connection error: {}", e);
                }
            });
            client
        }
    };

    Ok(client)
}

/// Build a TLS connector with appropriate certificate configuration.
///
/// # Arguments
/// * `config` - Connection configuration
/// * `strict_verify` - If true, always verify certificates (for verify-ca/verify-full modes)
fn build_tls_connector(config: &PostgresConfig, strict_verify: bool) -> Result<MakeTlsConnector> {
    let mut builder = native_tls::TlsConnector::builder();

    if config.accept_invalid_certs && !strict_verify {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    } else if let Some(ca_path) = &config.ca_cert_path {
        let ca_data = std::fs::read(ca_path)
            .with_context(|| format!("Failed to read CA certificate file: {}", ca_path))?;
        for cert in split_pem_certificates(&ca_data)? {
            let cert = native_tls::Certificate::from_pem(cert.as_bytes())
                .context("Failed to parse certificate")?;
            builder.add_root_certificate(cert);
        }
    }

    let connector = builder.build().context("Failed to build TLS connector")?;

    Ok(MakeTlsConnector::new(connector))
}

/// Split a PEM bundle into one PEM block per certificate.
fn split_pem_certificates(pem_data: &[u8]) -> Result<Vec<String>> {
    let pem_str =
        std::str::from_utf8(pem_data).context("CA certificate file is not valid UTF-8")?;

    let mut certs = Vec::new();
    let mut current = String::new();
    let mut in_cert = false;

    for line in pem_str.lines() {
        if line.contains("-----BEGIN CERTIFICATE-----") {
            in_cert = true;
            current.clear();
        }
        if in_cert {
            current.push_str(line.trim());
            current.push('\n');
        }
        if line.contains("-----END CERTIFICATE-----") && in_cert {
            in_cert = false;
            certs.push(std::mem::take(&mut current));
        }
    }

    if certs.is_empty() {
        anyhow::bail!("No valid certificates found in PEM data");
    }

    Ok(certs)
}

/// Quote a value for use in a libpq key=value connection string.
/// Wraps in single quotes and escapes backslashes and single quotes.
fn quote_conn_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}
