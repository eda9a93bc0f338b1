use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub admin: AdminConfig,
    pub kartapay: KartapayConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AuthConfig {
    /// HS256 shared secret used to verify bearer tokens issued by the
    /// identity provider.
    pub jwt_secret: Secret<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AdminConfig {
    pub api_key: Secret<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct KartapayConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub merchant_id: String,
    /// OAuth2 token endpoint.
    pub auth_url: String,
    /// Payments API base URL.
    pub api_base_url: String,
    /// Shared secret for webhook signature verification. When unset the
    /// webhook falls back to reference correlation only.
    pub webhook_secret: Option<Secret<String>>,
    /// Base URL of the merchant frontend, used for checkout redirect URLs.
    pub frontend_base_url: String,
    /// Publicly reachable base URL of this service, used for the webhook URL.
    pub webhook_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("ENTITLEMENT_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("ENTITLEMENT_SERVICE_PORT")
            .unwrap_or_else(|_| "3006".to_string())
            .parse()?;

        let db_url =
            env::var("ENTITLEMENT_DATABASE_URL").expect("ENTITLEMENT_DATABASE_URL must be set");
        let max_connections = env::var("ENTITLEMENT_DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;
        let min_connections = env::var("ENTITLEMENT_DATABASE_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        let jwt_secret =
            env::var("ENTITLEMENT_JWT_SECRET").unwrap_or_else(|_| "dev-secret".to_string());
        let admin_api_key =
            env::var("ENTITLEMENT_ADMIN_API_KEY").unwrap_or_else(|_| "dev-admin-key".to_string());

        let kartapay_client_id = env::var("KARTAPAY_CLIENT_ID").unwrap_or_default();
        let kartapay_client_secret = env::var("KARTAPAY_CLIENT_SECRET").unwrap_or_default();
        let kartapay_merchant_id = env::var("KARTAPAY_MERCHANT_ID").unwrap_or_default();
        let kartapay_auth_url = env::var("KARTAPAY_AUTH_URL")
            .unwrap_or_else(|_| "https://auth.kartapay.me/prod/token".to_string());
        let kartapay_api_base_url = env::var("KARTAPAY_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.kartapay.me/v1".to_string());
        let kartapay_webhook_secret = env::var("KARTAPAY_WEBHOOK_SECRET").ok().map(Secret::new);
        let frontend_base_url = env::var("FRONTEND_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());
        let webhook_base_url = env::var("ENTITLEMENT_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                max_connections,
                min_connections,
            },
            auth: AuthConfig {
                jwt_secret: Secret::new(jwt_secret),
            },
            admin: AdminConfig {
                api_key: Secret::new(admin_api_key),
            },
            kartapay: KartapayConfig {
                client_id: kartapay_client_id,
                client_secret: Secret::new(kartapay_client_secret),
                merchant_id: kartapay_merchant_id,
                auth_url: kartapay_auth_url,
                api_base_url: kartapay_api_base_url,
                webhook_secret: kartapay_webhook_secret,
                frontend_base_url,
                webhook_base_url,
            },
            service_name: "entitlement-service".to_string(),
        })
    }
}
