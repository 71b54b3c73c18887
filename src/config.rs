use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub prediction_service: PredictionServiceConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictionServiceConfig {
    pub host: String,
    pub port: u16,
}

impl PredictionServiceConfig {
    pub fn get_address(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Options presented by the model selector.
#[derive(Debug, Deserialize, Clone)]
pub struct WidgetConfig {
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            default_model: default_model(),
        }
    }
}

fn default_models() -> Vec<String> {
    ["allData_v2", "cnn_M_20x_k_4", "cnn_M_20x_k_6", "cnn_M_20x_k_8"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_model() -> String {
    "allData_v2".to_string()
}

impl WidgetConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.models.is_empty() {
            return Err("widget.models must list at least one model".to_string());
        }
        if !self.models.contains(&self.default_model) {
            return Err(format!(
                "default model `{}` is not one of {:?}",
                self.default_model, self.models
            ));
        }
        Ok(())
    }
}

/// Deployment flavour picked by `APP_ENVIRONMENT`; selects the YAML overlay.
#[derive(Debug, PartialEq)]
enum Environment {
    Local,
    Production,
}

impl Environment {
    fn overlay_file(&self) -> &'static str {
        match self {
            Environment::Local => "local.yaml",
            Environment::Production => "production.yaml",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!("unknown APP_ENVIRONMENT `{}` (local | production)", other)),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no working directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .parse()
        .map_err(config::ConfigError::Message)?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(
            config::File::from(
                configuration_directory.join(environment.overlay_file()),
            )
            .required(false),
        )
        .add_source(
            config::Environment::with_prefix("PW")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;

    if let Err(e) = config.widget.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(config::ConfigError::Message(e));
    }

    Ok(config)
}
