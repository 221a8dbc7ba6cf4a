pub const DEFAULT_DOMAIN: &str = "serve-mv.local";
pub const DEFAULT_PORT: u16 = 9001;

/// What to serve and under which name.
///
/// An empty `subdomain` means the label is derived from the game title found in
/// `www/data/System.json`.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Options {
    #[serde(default = "options_default_directory")]
    pub directory: std::path::PathBuf,
    #[serde(default = "options_default_domain")]
    pub domain: String,
    #[serde(default)]
    pub subdomain: String,
    #[serde(default = "options_default_port")]
    pub port: u16,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct HostsConfiguration {
    #[serde(default = "hosts_default_path")]
    pub path: std::path::PathBuf,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct LoggingConfiguration {
    #[serde(default = "logging_default_enabled")]
    pub enabled: bool,
    #[serde(default = "logging_default_level")]
    #[serde(deserialize_with = "deserialize_level")]
    #[serde(serialize_with = "serialize_level")]
    pub level: log::LevelFilter,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct ServeConfiguration {
    #[serde(default)]
    pub game: Options,
    #[serde(default)]
    pub hosts: HostsConfiguration,
    #[serde(default)]
    pub logging: LoggingConfiguration,
}

impl std::default::Default for Options {
    fn default() -> Self {
        Options {
            directory: options_default_directory(),
            domain: options_default_domain(),
            subdomain: String::new(),
            port: options_default_port(),
        }
    }
}

impl std::default::Default for HostsConfiguration {
    fn default() -> Self {
        HostsConfiguration {
            path: hosts_default_path(),
        }
    }
}

impl std::default::Default for LoggingConfiguration {
    fn default() -> Self {
        LoggingConfiguration {
            enabled: logging_default_enabled(),
            level: logging_default_level(),
        }
    }
}

impl std::default::Default for ServeConfiguration {
    fn default() -> Self {
        ServeConfiguration {
            game: Options::default(),
            hosts: HostsConfiguration::default(),
            logging: LoggingConfiguration::default(),
        }
    }
}

fn options_default_directory() -> std::path::PathBuf {
    std::path::PathBuf::from(".")
}

fn options_default_domain() -> String {
    String::from(DEFAULT_DOMAIN)
}

fn options_default_port() -> u16 {
    DEFAULT_PORT
}

fn hosts_default_path() -> std::path::PathBuf {
    if cfg!(windows) {
        std::path::PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts")
    } else {
        std::path::PathBuf::from("/etc/hosts")
    }
}

fn logging_default_enabled() -> bool {
    true
}

fn logging_default_level() -> log::LevelFilter {
    log::LevelFilter::Info
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<log::LevelFilter, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    match s.to_uppercase().as_str() {
        "OFF" => Ok(log::LevelFilter::Off),
        "ERROR" => Ok(log::LevelFilter::Error),
        "WARN" => Ok(log::LevelFilter::Warn),
        "INFO" => Ok(log::LevelFilter::Info),
        "DEBUG" => Ok(log::LevelFilter::Debug),
        "TRACE" => Ok(log::LevelFilter::Trace),
        _ => Err(serde::de::Error::custom(format!(
            "Invalid log level: {}",
            s
        ))),
    }
}

pub fn serialize_level<S>(level: &log::LevelFilter, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let level = format!("{}", level).to_uppercase();
    s.serialize_str(level.as_str())
}
