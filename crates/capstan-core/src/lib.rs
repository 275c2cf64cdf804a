//! Capstan Core - chart loading and value composition for the Capstan
//! deployment tool
//!
//! This crate materializes chart trees from directories or gzipped tar
//! archives and coalesces their layered configuration:
//! - `Chart`: the recursive package record (metadata, defaults, templates,
//!   files, dependencies)
//! - `loader`: source dispatch, safe archive extraction, directory walking,
//!   and chart assembly
//! - `Values`: the values-tree primitive with deep merge and dotted-path
//!   lookups
//! - `coalesce`: layered merge of overrides, defaults, and globals
//! - `RenderContext`: the top-level object handed to the template engine

pub mod archive;
pub mod chart;
pub mod coalesce;
pub mod context;
pub mod error;
pub mod files;
pub mod ignore;
pub mod loader;
pub mod release;
pub mod values;

pub use archive::read_archive_files;
pub use chart::{Chart, File, Maintainer, Metadata, API_VERSION_V1};
pub use coalesce::coalesce_values;
pub use context::{to_render_context, ReleaseContext, RenderContext};
pub use error::{CoreError, Result};
pub use files::Files;
pub use ignore::{ignore_file, DefaultIgnore, IgnoreRules, IGNORE_FILE};
pub use loader::{
    from_files, load, load_archive, load_dir, load_file, load_with, LoadOptions, CHARTFILE_NAME,
    CHARTS_PREFIX, TEMPLATES_PREFIX, VALUES_FILE_NAME,
};
pub use release::{Capabilities, KubeVersion, ReleaseOptions, SERVICE_NAME};
pub use values::{Values, GLOBAL_KEY};
