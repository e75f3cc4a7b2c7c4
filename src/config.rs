use dotenvy::dotenv;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    // External time tracking provider
    pub provider_base_url: String,
    pub provider_api_token: String,
    pub provider_company_id: String,
    pub provider_timeout_secs: u64,

    pub sync_interval_secs: u64,
    pub report_max_span_days: i64,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            provider_base_url: env::var("PROVIDER_BASE_URL")
                .unwrap_or_else(|_| "https://webapi.timedoctor.com".to_string()),
            provider_api_token: env::var("PROVIDER_API_TOKEN")
                .expect("PROVIDER_API_TOKEN must be set"),
            provider_company_id: env::var("PROVIDER_COMPANY_ID")
                .expect("PROVIDER_COMPANY_ID must be set"),
            provider_timeout_secs: env::var("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),

            sync_interval_secs: env::var("SYNC_INTERVAL_SECS")
                .unwrap_or_else(|_| "86400".to_string()) // default daily
                .parse()
                .unwrap(),
            report_max_span_days: env::var("REPORT_MAX_SPAN_DAYS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
        }
    }
}
