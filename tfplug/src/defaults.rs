//! Default value providers for optional attributes
//!
//! A `Default` runs during planning when an optional+computed attribute is
//! absent from the configuration. Unlike plan modifiers, defaults never see
//! explicitly-set values.
//!
//! ```no_run
//! use tfplug::schema::{AttributeBuilder, AttributeType};
//! use tfplug::defaults::StaticDefault;
//!
//! let enabled = AttributeBuilder::new("enabled", AttributeType::Bool)
//!     .optional()
//!     .computed()
//!     .default(StaticDefault::bool(true))
//!     .build();
//! ```

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};
use std::env;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Fixed value baked into the schema
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Box<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Box<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }

    pub fn list(values: Vec<Dynamic>) -> Box<dyn Default> {
        Self::create(Dynamic::List(values))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}

/// Reads the default from an environment variable at plan time
pub struct EnvDefault {
    env_var: String,
    fallback: Option<String>,
}

impl EnvDefault {
    pub fn create(env_var: &str, fallback: &str) -> Box<dyn Default> {
        Box::new(Self {
            env_var: env_var.to_string(),
            fallback: Some(fallback.to_string()),
        })
    }

    /// Without a fallback the default is null when the variable is unset
    pub fn create_required(env_var: &str) -> Box<dyn Default> {
        Box::new(Self {
            env_var: env_var.to_string(),
            fallback: None,
        })
    }
}

impl Default for EnvDefault {
    fn description(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!(
                "default from environment variable {} (fallback: {})",
                self.env_var, fallback
            ),
            None => format!("default from environment variable {}", self.env_var),
        }
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        let value = env::var(&self.env_var)
            .ok()
            .or_else(|| self.fallback.clone())
            .map(Dynamic::String)
            .unwrap_or(Dynamic::Null);

        DefaultResponse {
            value: DynamicValue::new(value),
        }
    }
}

/// Stamp of the moment the plan runs
pub struct CurrentTimestampDefault {
    format: TimestampFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum TimestampFormat {
    UnixSeconds,
    UnixMilliseconds,
    /// "2026-08-26T10:30:00Z"
    Iso8601,
    /// "2026-08-26T10:30:00+00:00"
    Rfc3339,
}

impl CurrentTimestampDefault {
    pub fn unix_seconds() -> Box<dyn Default> {
        Box::new(Self {
            format: TimestampFormat::UnixSeconds,
        })
    }

    pub fn unix_milliseconds() -> Box<dyn Default> {
        Box::new(Self {
            format: TimestampFormat::UnixMilliseconds,
        })
    }

    pub fn iso8601() -> Box<dyn Default> {
        Box::new(Self {
            format: TimestampFormat::Iso8601,
        })
    }

    pub fn rfc3339() -> Box<dyn Default> {
        Box::new(Self {
            format: TimestampFormat::Rfc3339,
        })
    }
}

impl Default for CurrentTimestampDefault {
    fn description(&self) -> String {
        let format = match self.format {
            TimestampFormat::UnixSeconds => "Unix seconds",
            TimestampFormat::UnixMilliseconds => "Unix milliseconds",
            TimestampFormat::Iso8601 => "ISO 8601",
            TimestampFormat::Rfc3339 => "RFC 3339",
        };
        format!("current timestamp in {} format", format)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        let now = SystemTime::now();
        let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();

        let value = match self.format {
            TimestampFormat::UnixSeconds => Dynamic::Number(since_epoch.as_secs() as f64),
            TimestampFormat::UnixMilliseconds => Dynamic::Number(since_epoch.as_millis() as f64),
            TimestampFormat::Iso8601 => {
                let datetime = chrono::DateTime::<chrono::Utc>::from(now);
                Dynamic::String(datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            }
            TimestampFormat::Rfc3339 => {
                let datetime = chrono::DateTime::<chrono::Utc>::from(now);
                Dynamic::String(datetime.to_rfc3339())
            }
        };

        DefaultResponse {
            value: DynamicValue::new(value),
        }
    }
}

/// Fresh v4 UUID per plan
pub struct UuidDefault {
    format: UuidFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum UuidFormat {
    /// "550e8400-e29b-41d4-a716-446655440000"
    Hyphenated,
    /// "550e8400e29b41d4a716446655440000"
    Simple,
    /// "urn:uuid:550e8400-e29b-41d4-a716-446655440000"
    Urn,
}

impl UuidDefault {
    pub fn hyphenated() -> Box<dyn Default> {
        Box::new(Self {
            format: UuidFormat::Hyphenated,
        })
    }

    pub fn simple() -> Box<dyn Default> {
        Box::new(Self {
            format: UuidFormat::Simple,
        })
    }

    pub fn urn() -> Box<dyn Default> {
        Box::new(Self {
            format: UuidFormat::Urn,
        })
    }
}

impl Default for UuidDefault {
    fn description(&self) -> String {
        let format = match self.format {
            UuidFormat::Hyphenated => "hyphenated",
            UuidFormat::Simple => "simple",
            UuidFormat::Urn => "URN",
        };
        format!("generated UUID in {} format", format)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        let uuid = Uuid::new_v4();
        let value = match self.format {
            UuidFormat::Hyphenated => Dynamic::String(uuid.to_string()),
            UuidFormat::Simple => Dynamic::String(uuid.simple().to_string()),
            UuidFormat::Urn => Dynamic::String(uuid.urn().to_string()),
        };

        DefaultResponse {
            value: DynamicValue::new(value),
        }
    }
}

/// Computes the default from the request, usually off the attribute path
pub struct ConditionalDefault<F>
where
    F: Fn(&DefaultRequest) -> Dynamic + Send + Sync,
{
    condition_fn: F,
    description: String,
}

impl<F> ConditionalDefault<F>
where
    F: Fn(&DefaultRequest) -> Dynamic + Send + Sync + 'static,
{
    pub fn create(description: &str, condition_fn: F) -> Box<dyn Default> {
        Box::new(Self {
            condition_fn,
            description: description.to_string(),
        })
    }
}

impl<F> Default for ConditionalDefault<F>
where
    F: Fn(&DefaultRequest) -> Dynamic + Send + Sync,
{
    fn description(&self) -> String {
        format!("conditional default: {}", self.description)
    }

    fn default_value(&self, request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new((self.condition_fn)(&request)),
        }
    }
}
