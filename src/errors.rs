use crate::locator::FormElementLocator;
use thiserror::Error;

/// Structural contract violations while mutating a [`crate::FormData`] tree.
///
/// Lookups through `get` never produce these; only write operations do, and
/// only when the caller addresses structure that does not exist. Missing
/// intermediate containers are never created implicitly.
#[derive(Error, Debug)]
pub enum FormDataError {
    #[error("missing container at {0}")]
    MissingContainer(FormElementLocator),

    #[error("no item at {0}")]
    MissingItem(FormElementLocator),

    #[error("not a collection: {0}")]
    NotACollection(FormElementLocator),

    #[error("cannot write into scalar value at {0}")]
    NotAContainer(FormElementLocator),
}

/// Errors while reading or parsing a form description.
#[derive(Error, Debug)]
pub enum FormError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("form description must be a mapping")]
    NotAMapping,

    #[error("element '{0}' is missing its $prototype")]
    MissingPrototype(String),
}

/// Errors while loading or persisting a pillar document.
#[derive(Error, Debug)]
pub enum PillarError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("pillar has no backing path")]
    NoPath,
}

/// Errors while building a provisioner configuration.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("unknown provisioner type: {0}")]
    UnknownType(String),

    #[error("invalid keys URL: {0}")]
    InvalidKeysUrl(#[from] url::ParseError),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
