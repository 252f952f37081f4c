use serde::Deserialize;
use std::fmt;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LANGUAGE: &str = "typescript";

/// Report sections, in the order they are generated.
pub const DEFAULT_SECTIONS: [&str; 7] = [
    "Security Vulnerabilities",
    "Privacy Leaks",
    "Logic Errors",
    "Line by Line Analysis",
    "Best Practices",
    "Recommendations",
    "Conclusion",
];

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub review: ReviewConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.model.name.trim().is_empty() {
            issues.push(ValidationIssue::MissingField { field: "model.name" });
        }
        if self.model.api_key_env.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "model.api_key_env",
            });
        }
        let base = self.model.api_base.trim();
        if base.is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "model.api_base",
            });
        } else if !(base.starts_with("https://") || base.starts_with("http://")) {
            issues.push(ValidationIssue::InvalidValue {
                field: "model.api_base",
                message: format!("'{base}' is not an http(s) URL"),
            });
        }
        if self.model.timeout_secs == 0 {
            issues.push(ValidationIssue::InvalidValue {
                field: "model.timeout_secs",
                message: "timeout must be at least 1 second".to_string(),
            });
        }

        if self.review.sections.is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "review.sections",
            });
        }
        for (idx, section) in self.review.sections.iter().enumerate() {
            if section.trim().is_empty() {
                issues.push(ValidationIssue::InvalidValue {
                    field: "review.sections",
                    message: format!("section {} has an empty name", idx + 1),
                });
            } else if self.review.sections[..idx].contains(section) {
                issues.push(ValidationIssue::InvalidValue {
                    field: "review.sections",
                    message: format!("section '{section}' is listed twice"),
                });
            }
        }
        if self.review.language.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "review.language",
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Generative backend settings.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub name: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ReviewConfig {
    #[serde(default = "default_sections")]
    pub sections: Vec<String>,
    /// Code fence tag used when quoting source in prompts
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            sections: default_sections(),
            language: default_language(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_sections() -> Vec<String> {
    DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "missing required field '{field}'")
            }
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid value for '{field}': {message}")
            }
        }
    }
}
