use thiserror::Error;

use crate::config::ConfigError;
use crate::rule::RuleError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),
    // facts / rule file (de)serialization
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
