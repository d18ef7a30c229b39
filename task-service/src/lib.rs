pub mod config {
    use serde::Deserialize;

    use crate::task::CreatedAtPrecision;
    use crate::task::validation::ValidationLimits;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub db_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        /// Prefix every task route is mounted under. Only requests below it are logged.
        #[serde(default = "default_api_prefix")]
        pub api_prefix: String,
        #[serde(default = "default_title_max_length")]
        pub title_max_length: usize,
        #[serde(default = "default_description_max_length")]
        pub description_max_length: usize,
        #[serde(default)]
        pub created_at_precision: CreatedAtPrecision,
        /// Body field names whose values are redacted in request logs.
        #[serde(default = "default_masked_fields")]
        pub masked_fields: Vec<String>,
        /// Header names whose values are redacted in request logs.
        #[serde(default = "default_sensitive_headers")]
        pub sensitive_headers: Vec<String>,
        /// Bodies larger than this many bytes are logged as a placeholder.
        #[serde(default = "default_log_body_limit")]
        pub log_body_limit: usize,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(
                    config::Environment::default()
                        .try_parsing(true)
                        .list_separator(",")
                        .with_list_parse_key("masked_fields")
                        .with_list_parse_key("sensitive_headers"),
                )
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Builds a configuration with every optional setting at its default.
        pub fn with_db_url(db_url: impl Into<String>) -> Self {
            Self {
                db_url: db_url.into(),
                port: default_port(),
                api_prefix: default_api_prefix(),
                title_max_length: default_title_max_length(),
                description_max_length: default_description_max_length(),
                created_at_precision: CreatedAtPrecision::default(),
                masked_fields: default_masked_fields(),
                sensitive_headers: default_sensitive_headers(),
                log_body_limit: default_log_body_limit(),
            }
        }

        pub fn validation_limits(&self) -> ValidationLimits {
            ValidationLimits {
                title_max_length: self.title_max_length,
                description_max_length: self.description_max_length,
            }
        }
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_api_prefix() -> String {
        "/api/v1".to_string()
    }

    fn default_title_max_length() -> usize {
        255
    }

    fn default_description_max_length() -> usize {
        1000
    }

    fn default_masked_fields() -> Vec<String> {
        vec!["fileContents".to_string()]
    }

    fn default_sensitive_headers() -> Vec<String> {
        vec!["authorization".to_string()]
    }

    fn default_log_body_limit() -> usize {
        crate::web::middleware::DEFAULT_BODY_LIMIT
    }
}
pub mod entities;
pub mod task;
pub mod web;
