use std::env;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use outcall_log::LogConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// The collection endpoint used when none is configured.
pub const DEFAULT_COLLECTOR_URL: &str = "https://api.moesif.net";

/// Prefix of all environment variables read by [`OverridableConfig::from_env`].
const ENV_PREFIX: &str = "OUTCALL_";

/// Defines the source of a config error
#[derive(Debug, Default)]
enum ConfigErrorSource {
    /// An error occurring independently.
    #[default]
    None,
    /// An error originating from a configuration file.
    File(PathBuf),
    /// An error originating in a field override (an env var).
    FieldOverride(String),
}

impl fmt::Display for ConfigErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErrorSource::None => Ok(()),
            ConfigErrorSource::File(file_name) => {
                write!(f, " (file {})", file_name.display())
            }
            ConfigErrorSource::FieldOverride(name) => write!(f, " (field {name})"),
        }
    }
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    source: ConfigErrorSource,
    kind: ConfigErrorKind,
    cause: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ConfigError {
    #[inline]
    fn new(kind: ConfigErrorKind) -> Self {
        Self {
            source: ConfigErrorSource::None,
            kind,
            cause: None,
        }
    }

    #[inline]
    fn wrap<E>(cause: E, kind: ConfigErrorKind) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            source: ConfigErrorSource::None,
            kind,
            cause: Some(Box::new(cause)),
        }
    }

    #[inline]
    fn for_field<E>(cause: E, field: &'static str) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::wrap(cause, ConfigErrorKind::InvalidValue).field(field)
    }

    #[inline]
    fn file(mut self, p: impl AsRef<Path>) -> Self {
        self.source = ConfigErrorSource::File(p.as_ref().to_path_buf());
        self
    }

    #[inline]
    fn field(mut self, name: &'static str) -> Self {
        self.source = ConfigErrorSource::FieldOverride(name.to_owned());
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.source)
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

/// Indicates config related errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Parsing JSON failed.
    #[error("could not parse json config")]
    BadJson,
    /// Invalid config value
    #[error("invalid config value")]
    InvalidValue,
    /// The application id is missing or blank.
    #[error("application id is required to capture outgoing calls")]
    MissingApplicationId,
}

/// A configuration object that can be loaded from a file in the config folder.
trait ConfigObject: DeserializeOwned + Serialize {
    /// The basename of the config file, without extension.
    fn name() -> &'static str;

    /// The full filename of the config file, including the file extension.
    fn path(base: &Path) -> PathBuf {
        base.join(format!("{}.yml", Self::name()))
    }

    /// Loads the config file from a file within the given directory location.
    fn load(base: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(base);

        let f = fs::File::open(&path)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile).file(&path))?;

        serde_yaml::from_reader(io::BufReader::new(f))
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml).file(&path))
    }
}

/// Structure used to hold information about configuration overrides via environment variables.
#[derive(Debug, Default)]
pub struct OverridableConfig {
    /// The application id used to authenticate against the collection API.
    pub application_id: Option<String>,
    /// "true" to enable verbose pipeline tracing, "false" otherwise.
    pub debug: Option<String>,
    /// "true" to capture request and response bodies, "false" otherwise.
    pub log_body: Option<String>,
    /// The base URL of the collection API.
    pub collector_url: Option<String>,
}

impl OverridableConfig {
    /// Reads overrides from `OUTCALL_*` environment variables.
    ///
    /// Unset variables leave the respective value untouched.
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(format!("{ENV_PREFIX}{name}")).ok();

        Self {
            application_id: var("APPLICATION_ID"),
            debug: var("DEBUG"),
            log_body: var("LOG_BODY"),
            collector_url: var("COLLECTOR_URL"),
        }
    }
}

/// Parses a boolean flag override.
fn parse_flag(value: &str, field: &'static str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        _ => Err(ConfigError::new(ConfigErrorKind::InvalidValue).field(field)),
    }
}

/// Connection settings for the collection API.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Collector {
    /// Base URL of the collection API.
    ///
    /// Defaults to [`DEFAULT_COLLECTOR_URL`].
    pub url: Option<Url>,
    /// Timeout for a single request to the collection API, in seconds.
    pub timeout: u32,
    /// Timeout for establishing a connection to the collection API, in seconds.
    pub connection_timeout: u32,
}

impl Default for Collector {
    fn default() -> Self {
        Self {
            url: None,
            timeout: 10,
            connection_timeout: 3,
        }
    }
}

fn default_log_body() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ConfigValues {
    #[serde(default)]
    application_id: String,
    #[serde(default)]
    debug: bool,
    #[serde(default = "default_log_body")]
    log_body: bool,
    #[serde(default)]
    collector: Collector,
    #[serde(default)]
    logging: LogConfig,
}

impl Default for ConfigValues {
    fn default() -> Self {
        Self {
            application_id: String::new(),
            debug: false,
            log_body: default_log_body(),
            collector: Collector::default(),
            logging: LogConfig::default(),
        }
    }
}

impl ConfigObject for ConfigValues {
    fn name() -> &'static str {
        "config"
    }
}

/// Checks the values and resolves the collector URL.
fn validate(values: &ConfigValues) -> Result<Url, ConfigError> {
    if values.application_id.trim().is_empty() {
        return Err(ConfigError::new(ConfigErrorKind::MissingApplicationId));
    }

    match values.collector.url {
        Some(ref url) => Ok(url.clone()),
        None => Url::parse(DEFAULT_COLLECTOR_URL)
            .map_err(|err| ConfigError::wrap(err, ConfigErrorKind::InvalidValue)),
    }
}

/// Config struct.
pub struct Config {
    values: ConfigValues,
    collector_url: Url,
    path: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("path", &self.path)
            .field("collector_url", &self.collector_url)
            .field("values", &self.values)
            .finish()
    }
}

impl Config {
    /// Loads a config from a given config folder.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = env::current_dir()
            .map(|x| x.join(path.as_ref()))
            .unwrap_or_else(|_| path.as_ref().to_path_buf());

        let values = ConfigValues::load(&path)?;
        Config::new(values, path.clone()).map_err(|e| e.file(ConfigValues::path(&path)))
    }

    /// Creates a config from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Config, ConfigError> {
        let values = serde_yaml::from_str(yaml)
            .map_err(|err| ConfigError::wrap(err, ConfigErrorKind::BadYaml))?;
        Config::new(values, PathBuf::new())
    }

    /// Creates a config from a JSON value.
    ///
    /// This is mostly useful for tests.
    pub fn from_json_value(value: serde_json::Value) -> Result<Config, ConfigError> {
        let values = serde_json::from_value(value)
            .map_err(|err| ConfigError::wrap(err, ConfigErrorKind::BadJson))?;
        Config::new(values, PathBuf::new())
    }

    /// Override configuration with values coming from other sources (e.g. env variables).
    ///
    /// The overrides are applied all at once. On error, the configuration is left unchanged.
    pub fn apply_override(
        &mut self,
        overrides: OverridableConfig,
    ) -> Result<&mut Self, ConfigError> {
        let mut values = self.values.clone();

        if let Some(application_id) = overrides.application_id {
            values.application_id = application_id;
        }

        if let Some(debug) = overrides.debug {
            values.debug = parse_flag(&debug, "debug")?;
        }

        if let Some(log_body) = overrides.log_body {
            values.log_body = parse_flag(&log_body, "log_body")?;
        }

        if let Some(url) = overrides.collector_url {
            values.collector.url = Some(
                url.parse::<Url>()
                    .map_err(|err| ConfigError::for_field(err, "collector_url"))?,
            );
        }

        self.collector_url = validate(&values)?;
        self.values = values;
        Ok(self)
    }

    fn new(values: ConfigValues, path: PathBuf) -> Result<Config, ConfigError> {
        Ok(Config {
            collector_url: validate(&values)?,
            values,
            path,
        })
    }

    /// Returns the folder the config was loaded from.
    ///
    /// This is empty if the config was not loaded from the file system.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the application id that identifies events at the collection API.
    pub fn application_id(&self) -> &str {
        self.values.application_id.trim()
    }

    /// Returns `true` if verbose pipeline tracing is enabled.
    pub fn debug(&self) -> bool {
        self.values.debug
    }

    /// Returns `true` if request and response bodies should be captured.
    pub fn log_body(&self) -> bool {
        self.values.log_body
    }

    /// Returns the base URL of the collection API.
    pub fn collector_url(&self) -> &Url {
        &self.collector_url
    }

    /// Returns the timeout for all requests to the collection API.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.values.collector.timeout.into())
    }

    /// Returns the connection timeout for all requests to the collection API.
    pub fn http_connection_timeout(&self) -> Duration {
        Duration::from_secs(self.values.collector.connection_timeout.into())
    }

    /// Returns the logging configuration.
    pub fn logging(&self) -> &LogConfig {
        &self.values.logging
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use outcall_log::Level;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("application_id: my-app").unwrap();

        assert_eq!(config.application_id(), "my-app");
        assert!(!config.debug());
        assert!(config.log_body());
        assert_eq!(config.collector_url().as_str(), "https://api.moesif.net/");
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.http_connection_timeout(), Duration::from_secs(3));
        assert_eq!(config.logging().level, Level::Info);
        assert_eq!(config.path(), Path::new(""));
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
application_id: my-app
debug: true
log_body: false
collector:
  url: "http://localhost:8080"
  timeout: 2
logging:
  level: debug
"#;
        let config = Config::from_yaml_str(yaml).unwrap();

        assert!(config.debug());
        assert!(!config.log_body());
        assert_eq!(config.collector_url().as_str(), "http://localhost:8080/");
        assert_eq!(config.http_timeout(), Duration::from_secs(2));
        assert_eq!(config.http_connection_timeout(), Duration::from_secs(3));
        assert_eq!(config.logging().level, Level::Debug);
    }

    #[test]
    fn test_missing_application_id() {
        let error = Config::from_yaml_str("debug: true").unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::MissingApplicationId);
        insta::assert_snapshot!(error, @"application id is required to capture outgoing calls");
    }

    #[test]
    fn test_blank_application_id() {
        let error = Config::from_json_value(serde_json::json!({"application_id": "  "}))
            .unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::MissingApplicationId);
    }

    #[test]
    fn test_bad_yaml() {
        let error = Config::from_yaml_str("application_id: [").unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::BadYaml);
        assert!(error.source().is_some());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("config.yml")).unwrap();
        writeln!(file, "application_id: from-file").unwrap();

        let config = Config::from_path(dir.path()).unwrap();
        assert_eq!(config.application_id(), "from-file");
        assert_eq!(config.path(), dir.path());
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = Config::from_path(dir.path()).unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::CouldNotOpenFile);
        assert!(error.to_string().starts_with("could not open config file (file "));
    }

    #[test]
    fn test_apply_override() {
        let mut config = Config::from_yaml_str("application_id: my-app").unwrap();
        config
            .apply_override(OverridableConfig {
                application_id: Some("other-app".to_owned()),
                debug: Some("1".to_owned()),
                log_body: Some("false".to_owned()),
                collector_url: Some("http://127.0.0.1:3000".to_owned()),
            })
            .unwrap();

        assert_eq!(config.application_id(), "other-app");
        assert!(config.debug());
        assert!(!config.log_body());
        assert_eq!(config.collector_url().as_str(), "http://127.0.0.1:3000/");
    }

    #[test]
    fn test_apply_override_invalid_flag() {
        let mut config = Config::from_yaml_str("application_id: my-app").unwrap();
        let error = config
            .apply_override(OverridableConfig {
                debug: Some("maybe".to_owned()),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        insta::assert_snapshot!(error, @"invalid config value (field debug)");
    }

    #[test]
    fn test_apply_override_invalid_url() {
        let mut config = Config::from_yaml_str("application_id: my-app").unwrap();
        let error = config
            .apply_override(OverridableConfig {
                collector_url: Some("not a url".to_owned()),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);
        assert!(error.source().is_some());
    }

    #[test]
    fn test_apply_override_is_atomic() {
        let mut config = Config::from_yaml_str("application_id: my-app").unwrap();
        let error = config
            .apply_override(OverridableConfig {
                application_id: Some("other-app".to_owned()),
                log_body: Some("false".to_owned()),
                debug: Some("maybe".to_owned()),
                collector_url: None,
            })
            .unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::InvalidValue);

        let error = config
            .apply_override(OverridableConfig {
                debug: Some("true".to_owned()),
                collector_url: Some("http://127.0.0.1:3000".to_owned()),
                application_id: Some(" ".to_owned()),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(error.kind(), ConfigErrorKind::MissingApplicationId);

        assert_eq!(config.application_id(), "my-app");
        assert!(!config.debug());
        assert!(config.log_body());
        assert_eq!(config.collector_url().as_str(), "https://api.moesif.net/");
    }

    #[test]
    fn test_apply_override_blank_application_id() {
        let mut config = Config::from_yaml_str("application_id: my-app").unwrap();
        let error = config
            .apply_override(OverridableConfig {
                application_id: Some(String::new()),
                ..Default::default()
            })
            .unwrap_err();

        assert_eq!(error.kind(), ConfigErrorKind::MissingApplicationId);
    }
}
