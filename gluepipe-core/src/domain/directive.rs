//! Commit directive domain types
//!
//! A commit message of the form `"<create|update> <job_name> [anything else]"`
//! tells the promote stage what to do with the job named in it.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What the commit asks the promote stage to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveAction {
    Create,
    Update,
}

/// Parsed intent of a commit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDirective {
    pub action: DirectiveAction,
    pub job_name: JobName,
}

/// A managed job name, also used as a directory and file stem in the artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobName(String);

/// Errors raised while reading a commit directive or a job name
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("commit message is empty")]
    EmptyMessage,

    #[error("commit action is not correct - {0}.")]
    UnknownAction(String),

    #[error("commit message does not name a job after action {0}")]
    MissingJobName(String),

    #[error("invalid job name {name:?}: {reason}")]
    InvalidJobName { name: String, reason: &'static str },
}

impl DirectiveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveAction::Create => "create",
            DirectiveAction::Update => "update",
        }
    }
}

impl fmt::Display for DirectiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DirectiveAction {
    type Err = DirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(DirectiveAction::Create),
            "update" => Ok(DirectiveAction::Update),
            other => Err(DirectiveError::UnknownAction(other.to_string())),
        }
    }
}

impl CommitDirective {
    /// Parses a commit message
    ///
    /// The action is checked before the job name so that a one-word message
    /// with an unknown action reports the action.
    pub fn parse(message: &str) -> Result<Self, DirectiveError> {
        let mut tokens = message.split_whitespace();

        let action = tokens
            .next()
            .ok_or(DirectiveError::EmptyMessage)?
            .parse::<DirectiveAction>()?;

        let job_name = tokens
            .next()
            .ok_or_else(|| DirectiveError::MissingJobName(action.to_string()))?
            .parse::<JobName>()?;

        Ok(Self { action, job_name })
    }
}

impl FromStr for CommitDirective {
    type Err = DirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl JobName {
    /// Validates a job name
    ///
    /// Names end up in local paths and object keys, so only
    /// `[A-Za-z0-9._-]` is accepted and `.`/`..` are refused.
    pub fn new(name: impl Into<String>) -> Result<Self, DirectiveError> {
        let name = name.into();
        let invalid = |reason| DirectiveError::InvalidJobName {
            name: name.clone(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if name == "." || name == ".." {
            return Err(invalid("name is a relative path component"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(invalid("only letters, digits, '.', '_' and '-' are allowed"));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the job script, `<job>.py`
    pub fn script_file(&self) -> String {
        format!("{}.py", self.0)
    }

    /// File name of the job configuration, `<job>.json`
    pub fn config_file(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl FromStr for JobName {
    type Err = DirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
