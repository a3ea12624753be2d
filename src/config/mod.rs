use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Which DocumentStore implementation backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub mongo_uri: Option<String>,
    pub database_name: String,
    pub tls_allow_invalid_certificates: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    /// HS256 shared secret; ignored when a public key is configured
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// RS256 public key (PEM) of the identity provider
    pub jwt_public_key_pem: Option<String>,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub jwt_expiry_hours: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary variable source (the process env in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Database overrides
        if let Some(v) = lookup("DATABASE_BACKEND") {
            self.database.backend = v.parse().unwrap_or(self.database.backend);
        }
        if let Some(v) = lookup("MONGO_URI") {
            self.database.mongo_uri = Some(v);
        }
        if let Some(v) = lookup("MONGO_DATABASE") {
            self.database.database_name = v;
        }
        if let Some(v) = lookup("MONGO_TLS_ALLOW_INVALID_CERTIFICATES") {
            self.database.tls_allow_invalid_certificates =
                v.parse().unwrap_or(self.database.tls_allow_invalid_certificates);
        }

        // API overrides
        if let Some(v) = lookup("API_PORT").or_else(|| lookup("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Some(v) = lookup("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = lookup("SECURITY_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("SECURITY_JWT_PUBLIC_KEY") {
            self.security.jwt_public_key_pem = Some(v);
        }
        if let Some(v) = lookup("SECURITY_JWT_ISSUER") {
            self.security.jwt_issuer = Some(v);
        }
        if let Some(v) = lookup("SECURITY_JWT_AUDIENCE") {
            self.security.jwt_audience = Some(v);
        }
        if let Some(v) = lookup("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                backend: StoreBackend::Mongo,
                mongo_uri: Some("mongodb://localhost:27017".to_string()),
                database_name: "gas".to_string(),
                tls_allow_invalid_certificates: false,
            },
            api: ApiConfig {
                port: 8000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:8000".to_string(),
                ],
                jwt_secret: "development-secret".to_string(),
                jwt_public_key_pem: None,
                jwt_issuer: None,
                jwt_audience: None,
                jwt_expiry_hours: 24 * 7, // 1 week
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                backend: StoreBackend::Mongo,
                mongo_uri: None,
                database_name: "gas".to_string(),
                tls_allow_invalid_certificates: false,
            },
            api: ApiConfig {
                port: 8000,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_public_key_pem: None,
                jwt_issuer: None,
                jwt_audience: None,
                jwt_expiry_hours: 24,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                backend: StoreBackend::Mongo,
                mongo_uri: None,
                database_name: "gas".to_string(),
                tls_allow_invalid_certificates: false,
            },
            api: ApiConfig {
                port: 8000,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_public_key_pem: None,
                jwt_issuer: None,
                jwt_audience: None,
                jwt_expiry_hours: 1,
            },
        }
    }
}
