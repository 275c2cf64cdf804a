//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("chart not found: {path}")]
    ChartNotFound { path: String },

    #[error("invalid chart: {message}")]
    InvalidChart { message: String },

    #[error("chart illegally contains absolute paths")]
    AbsolutePath,

    #[error("chart illegally contains content outside the base directory: {name:?}")]
    OutsideBaseDirectory { name: String },

    #[error("chart illegally references parent directory")]
    ParentDirectory,

    #[error("chart contains illegally named files")]
    IllegallyNamedFiles,

    #[error("Chart.yaml not in base directory")]
    ChartfileNotInBase,

    #[error("invalid chart archive: {message}")]
    Archive { message: String },

    #[error("file '{path}' does not appear to be a gzipped archive; got '{detected}'")]
    NotAnArchive { path: String, detected: String },

    #[error("file '{path}' seems to be a YAML file, but a gzipped archive was expected")]
    YamlNotArchive { path: String },

    #[error("chart metadata (Chart.yaml) missing")]
    MissingMetadata,

    #[error("invalid chart (Chart.yaml): name must not be empty")]
    EmptyName,

    #[error("apiVersion '{version}' is not valid, the value must be \"v1\"")]
    UnsupportedApiVersion { version: String },

    #[error("values.toml is illegal as of 2.0.0-alpha.2")]
    IllegalValuesToml,

    #[error("error unpacking {name} in {chart}: {source}")]
    Subchart {
        name: String,
        chart: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("no table named {path:?}")]
    NoTable { path: String },

    #[error("no value named {path:?}")]
    NoValue { path: String },

    #[error("type mismatch on {name}: values for a dependency must be a table")]
    DependencyTypeMismatch { name: String },

    #[error("invalid values: {message}")]
    InvalidValues { message: String },

    #[error("invalid glob pattern: {message}")]
    GlobPattern { message: String },

    #[error("invalid version: {0}")]
    Version(#[from] semver::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
