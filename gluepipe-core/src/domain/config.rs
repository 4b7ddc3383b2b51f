//! Job configuration domain types
//!
//! A job configuration is the `<job>.json` file committed next to the job
//! script. An update sends the raw JSON object from [`read_object`] verbatim;
//! create and run decode it into a typed [`JobSettings`] record so defaults
//! apply.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_DESCRIPTION: &str = "";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Minutes
pub const DEFAULT_TIMEOUT: u32 = 2880;
pub const DEFAULT_GLUE_VERSION: &str = "3.0";
pub const DEFAULT_NUMBER_OF_WORKERS: u32 = 10;
pub const DEFAULT_WORKER_TYPE: &str = "G.1X";

/// Errors raised while reading a job configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration is not valid JSON")]
    Malformed(#[from] serde_json::Error),

    #[error("configuration must be a JSON object")]
    NotAnObject,

    #[error("invalid value for {field}")]
    InvalidField {
        field: &'static str,
        source: serde_json::Error,
    },

    #[error("configuration is missing required field {0}")]
    MissingField(&'static str),
}

/// Typed view of a job configuration
///
/// Every field is optional in the file; accessors apply the documented
/// defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSettings {
    pub description: Option<String>,
    pub role: Option<String>,
    pub execution_property: Option<Map<String, JsonValue>>,
    pub command: Option<Map<String, JsonValue>>,
    pub default_arguments: Option<BTreeMap<String, String>>,
    pub max_retries: Option<u32>,
    pub timeout: Option<u32>,
    pub glue_version: Option<String>,
    pub number_of_workers: Option<u32>,
    pub worker_type: Option<String>,
}

/// Parses configuration file contents as a JSON object, leaving every key as
/// committed
pub fn read_object(bytes: &[u8]) -> Result<Map<String, JsonValue>, ConfigError> {
    match serde_json::from_slice::<JsonValue>(bytes)? {
        JsonValue::Object(object) => Ok(object),
        _ => Err(ConfigError::NotAnObject),
    }
}

/// A parsed `<job>.json` file with its known keys decoded
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfiguration {
    settings: JobSettings,
}

impl JobConfiguration {
    /// Parses configuration file contents
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        Self::from_object(&read_object(bytes)?)
    }

    pub fn from_value(value: JsonValue) -> Result<Self, ConfigError> {
        let JsonValue::Object(object) = value else {
            return Err(ConfigError::NotAnObject);
        };
        Self::from_object(&object)
    }

    pub fn from_object(object: &Map<String, JsonValue>) -> Result<Self, ConfigError> {
        Ok(Self {
            settings: JobSettings::from_object(object)?,
        })
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }
}

impl JobSettings {
    /// Reads the known keys of a configuration object
    ///
    /// Fields are decoded one at a time so that a type error names the
    /// offending key. `null` counts as absent.
    pub fn from_object(object: &Map<String, JsonValue>) -> Result<Self, ConfigError> {
        Ok(Self {
            description: field(object, "Description")?,
            role: field(object, "Role")?,
            execution_property: field(object, "ExecutionProperty")?,
            command: field(object, "Command")?,
            default_arguments: field(object, "DefaultArguments")?,
            max_retries: field(object, "MaxRetries")?,
            timeout: field(object, "Timeout")?,
            glue_version: field(object, "GlueVersion")?,
            number_of_workers: field(object, "NumberOfWorkers")?,
            worker_type: field(object, "WorkerType")?,
        })
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn timeout(&self) -> u32 {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn glue_version(&self) -> &str {
        self.glue_version.as_deref().unwrap_or(DEFAULT_GLUE_VERSION)
    }

    pub fn number_of_workers(&self) -> u32 {
        self.number_of_workers.unwrap_or(DEFAULT_NUMBER_OF_WORKERS)
    }

    pub fn worker_type(&self) -> &str {
        self.worker_type.as_deref().unwrap_or(DEFAULT_WORKER_TYPE)
    }

    pub fn require_role(&self) -> Result<&str, ConfigError> {
        self.role.as_deref().ok_or(ConfigError::MissingField("Role"))
    }

    pub fn require_command(&self) -> Result<&Map<String, JsonValue>, ConfigError> {
        self.command
            .as_ref()
            .ok_or(ConfigError::MissingField("Command"))
    }
}

fn field<T: DeserializeOwned>(
    object: &Map<String, JsonValue>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match object.get(name) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|source| ConfigError::InvalidField {
                field: name,
                source,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_apply_when_keys_are_absent() {
        let config = JobConfiguration::from_slice(br#"{"Role": "arn:x"}"#).unwrap();
        let settings = config.settings();

        assert_eq!(settings.description(), "");
        assert_eq!(settings.max_retries(), 3);
        assert_eq!(settings.timeout(), 2880);
        assert_eq!(settings.glue_version(), "3.0");
        assert_eq!(settings.number_of_workers(), 10);
        assert_eq!(settings.worker_type(), "G.1X");
        assert_eq!(settings.require_role().unwrap(), "arn:x");
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let config = JobConfiguration::from_value(json!({
            "Description": "nightly load",
            "MaxRetries": 0,
            "Timeout": 60,
            "GlueVersion": "4.0",
            "NumberOfWorkers": 2,
            "WorkerType": "G.2X",
            "DefaultArguments": {"--job-language": "python"}
        }))
        .unwrap();
        let settings = config.settings();

        assert_eq!(settings.description(), "nightly load");
        assert_eq!(settings.max_retries(), 0);
        assert_eq!(settings.timeout(), 60);
        assert_eq!(settings.glue_version(), "4.0");
        assert_eq!(settings.number_of_workers(), 2);
        assert_eq!(settings.worker_type(), "G.2X");
        assert_eq!(
            settings
                .default_arguments
                .as_ref()
                .and_then(|args| args.get("--job-language"))
                .map(String::as_str),
            Some("python")
        );
    }

    #[test]
    fn test_raw_object_is_preserved() {
        let value = json!({
            "Role": "arn:x",
            "Connections": {"Connections": ["vpc"]},
            "DefaultArguments": {"--retries": 3},
            "Timeout": null
        });
        let bytes = serde_json::to_vec(&value).unwrap();

        let object = read_object(&bytes).unwrap();
        assert_eq!(JsonValue::Object(object), value);
        assert!(matches!(
            read_object(b"[1, 2]"),
            Err(ConfigError::NotAnObject)
        ));
    }

    #[test]
    fn test_null_counts_as_absent() {
        let config = JobConfiguration::from_slice(br#"{"Timeout": null}"#).unwrap();
        assert_eq!(config.settings().timeout, None);
        assert_eq!(config.settings().timeout(), 2880);
    }

    #[test]
    fn test_type_errors_name_the_field() {
        let err = JobConfiguration::from_slice(br#"{"NumberOfWorkers": "ten"}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "NumberOfWorkers",
                ..
            }
        ));
        assert!(err.to_string().starts_with("invalid value for NumberOfWorkers"));
    }

    #[test]
    fn test_default_arguments_must_be_strings() {
        let err =
            JobConfiguration::from_slice(br#"{"DefaultArguments": {"--retries": 3}}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "DefaultArguments",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_non_objects_and_bad_json() {
        assert!(matches!(
            JobConfiguration::from_slice(b"[1, 2]"),
            Err(ConfigError::NotAnObject)
        ));
        assert!(matches!(
            JobConfiguration::from_slice(b"{\"Role\": "),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_required_fields() {
        let config = JobConfiguration::from_slice(b"{}").unwrap();
        assert!(matches!(
            config.settings().require_role(),
            Err(ConfigError::MissingField("Role"))
        ));
        assert!(matches!(
            config.settings().require_command(),
            Err(ConfigError::MissingField("Command"))
        ));
    }
}
