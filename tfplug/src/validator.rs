//! Built-in attribute validators
//!
//! Validators run during plan against the configured value of a single
//! attribute. Null and unknown values are skipped so validators only see
//! values the practitioner actually wrote.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};

/// Validates string length against optional minimum and maximum bounds
pub struct StringLengthValidator {
    min: Option<usize>,
    max: Option<usize>,
}

impl StringLengthValidator {
    pub fn min(min: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }

    pub fn max(max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: None,
            max: Some(max),
        })
    }

    pub fn between(min: usize, max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "string length".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();

        if let Dynamic::String(s) = &request.config_value.value {
            if let Some(min) = self.min {
                if s.len() < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("String must have minimum length of {}", min),
                            format!("Got length {}", s.len()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if s.len() > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("String must have maximum length of {}", max),
                            format!("Got length {}", s.len()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }

        ValidatorResponse { diagnostics }
    }
}

/// Validates strings against a regular expression
///
/// The pattern is compiled once at construction; a pattern that fails to
/// compile reports an error diagnostic instead of panicking.
pub struct StringPatternValidator {
    pattern: std::result::Result<regex::Regex, regex::Error>,
    description: String,
}

impl StringPatternValidator {
    pub fn create(pattern: &str, description: &str) -> Box<dyn Validator> {
        Box::new(Self {
            pattern: regex::Regex::new(pattern),
            description: description.to_string(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        format!("string must match {}", self.description)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();

        if let Dynamic::String(s) = &request.config_value.value {
            match &self.pattern {
                Ok(re) => {
                    if !re.is_match(s) {
                        diagnostics.push(
                            Diagnostic::error(
                                format!("String must match {}", self.description),
                                format!("Value '{}' does not match pattern", s),
                            )
                            .with_attribute(request.path.clone()),
                        );
                    }
                }
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid validation pattern",
                            format!("Pattern failed to compile: {}", e),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }

        ValidatorResponse { diagnostics }
    }
}

/// Validates numbers against optional minimum and maximum bounds
pub struct NumberRangeValidator {
    min: Option<f64>,
    max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn at_least(min: f64) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }

    pub fn at_most(max: f64) -> Box<dyn Validator> {
        Box::new(Self {
            min: None,
            max: Some(max),
        })
    }

    pub fn between(min: f64, max: f64) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("number must be between {} and {}", min, max),
            (Some(min), None) => format!("number must be at least {}", min),
            (None, Some(max)) => format!("number must be at most {}", max),
            (None, None) => "number range".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();

        if let Dynamic::Number(n) = &request.config_value.value {
            if let Some(min) = self.min {
                if *n < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("Number must be at least {}", min),
                            format!("Got {}", n),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if *n > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("Number must be at most {}", max),
                            format!("Got {}", n),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }

        ValidatorResponse { diagnostics }
    }
}

/// Validates list length against optional minimum and maximum bounds
pub struct ListLengthValidator {
    min: Option<usize>,
    max: Option<usize>,
}

impl ListLengthValidator {
    pub fn min(min: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }

    pub fn max(max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: None,
            max: Some(max),
        })
    }

    pub fn between(min: usize, max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("list must have between {} and {} items", min, max),
            (Some(min), None) => format!("list must have at least {} items", min),
            (None, Some(max)) => format!("list must have at most {} items", max),
            (None, None) => "list length".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();

        if let Dynamic::List(items) = &request.config_value.value {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("List must have at least {} items", min),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("List must have at most {} items", max),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }

        ValidatorResponse { diagnostics }
    }
}

/// Validates that a string is one of a fixed set of allowed values
pub struct OneOfValidator {
    allowed: Vec<String>,
}

impl OneOfValidator {
    pub fn create(allowed: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for OneOfValidator {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();

        if let Dynamic::String(s) = &request.config_value.value {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Value must be one of: {}", self.allowed.join(", ")),
                        format!("Got '{}'", s),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}
