//! Chart loading: source dispatch, directory walking, and assembly
//!
//! A chart can be loaded from a directory tree or from a gzipped tar
//! archive; both sources funnel into the same in-memory assembler, which
//! classifies every buffered file by role and recurses into nested charts
//! found under `charts/`.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use indexmap::IndexMap;

use crate::archive::{ensure_archive, read_archive_files, SNIFF_LEN};
use crate::chart::{Chart, File, Metadata, API_VERSION_V1};
use crate::error::{CoreError, Result};
use crate::ignore::{DefaultIgnore, IgnoreRules};
use crate::values::Values;

/// Required metadata file at every chart root.
pub const CHARTFILE_NAME: &str = "Chart.yaml";

/// Default values file at a chart root.
pub const VALUES_FILE_NAME: &str = "values.yaml";

/// Directory prefix for template files.
pub const TEMPLATES_PREFIX: &str = "templates/";

/// Directory prefix for nested charts.
pub const CHARTS_PREFIX: &str = "charts/";

/// Options controlling a chart load.
#[derive(Default)]
pub struct LoadOptions<'a> {
    /// Exact filename of an environment overlay, matched at each chart
    /// root and merged over that chart's default values.
    pub env_values_file: Option<&'a str>,

    /// Caller-supplied ignore matcher for directory loads, typically the
    /// parsed contents of the chart's ignore file.
    pub ignore: Option<&'a dyn IgnoreRules>,
}

impl<'a> LoadOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the environment overlay filename
    pub fn with_env_values_file(mut self, name: &'a str) -> Self {
        self.env_values_file = Some(name);
        self
    }

    /// Set the ignore matcher used by directory loads
    pub fn with_ignore(mut self, rules: &'a dyn IgnoreRules) -> Self {
        self.ignore = Some(rules);
        self
    }
}

/// Load a chart from a directory or a gzipped tar archive.
///
/// The source kind is discovered from the path itself: directories must
/// contain a readable `Chart.yaml`, files must sniff as gzip.
pub fn load(path: impl AsRef<Path>) -> Result<Chart> {
    load_with(path, &LoadOptions::default())
}

/// Load a chart with explicit options.
pub fn load_with(path: impl AsRef<Path>, opts: &LoadOptions) -> Result<Chart> {
    let path = path.as_ref();
    let meta = fs::metadata(path).map_err(|_| CoreError::ChartNotFound {
        path: path.display().to_string(),
    })?;
    if meta.is_dir() {
        ensure_chart_dir(path)?;
        load_dir(path, opts)
    } else {
        load_file(path, opts)
    }
}

/// Minimum-viable validity check for a chart directory.
fn ensure_chart_dir(dir: &Path) -> Result<()> {
    match fs::metadata(dir.join(CHARTFILE_NAME)) {
        Ok(m) if m.is_file() => Ok(()),
        _ => Err(CoreError::InvalidChart {
            message: format!("no Chart.yaml exists in directory {}", dir.display()),
        }),
    }
}

/// Load a chart from a gzipped tar archive on disk.
pub fn load_file(path: impl AsRef<Path>, opts: &LoadOptions) -> Result<Chart> {
    let path = path.as_ref();
    let meta = fs::metadata(path).map_err(|_| CoreError::ChartNotFound {
        path: path.display().to_string(),
    })?;
    if meta.is_dir() {
        return Err(CoreError::InvalidChart {
            message: format!("cannot load directory {} as an archive", path.display()),
        });
    }

    let mut raw = fs::File::open(path)?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    raw.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    ensure_archive(path, &head)?;
    raw.seek(SeekFrom::Start(0))?;

    load_archive(raw, opts)
}

/// Load a chart from a reader containing a gzipped tar archive.
pub fn load_archive<R: Read>(reader: R, opts: &LoadOptions) -> Result<Chart> {
    let files = read_archive_files(reader)?;
    from_files(files, opts)
}

/// Load a chart from a directory tree.
///
/// The walk is depth-first in lexical order. Ignored directories are
/// pruned whole; ignored files are skipped. The built-in defaults apply
/// on top of any caller-supplied matcher.
pub fn load_dir(dir: impl AsRef<Path>, opts: &LoadOptions) -> Result<Chart> {
    let base = fs::canonicalize(dir.as_ref()).map_err(|_| CoreError::ChartNotFound {
        path: dir.as_ref().display().to_string(),
    })?;

    let defaults = DefaultIgnore;
    let mut files = Vec::new();

    let mut walker = walkdir::WalkDir::new(&base)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
        let Ok(rel) = entry.path().strip_prefix(&base) else {
            continue;
        };
        let name = rel.to_string_lossy().replace('\\', "/");
        let is_dir = entry.file_type().is_dir();

        let ignored = defaults.ignore(&name, is_dir)
            || opts.ignore.is_some_and(|rules| rules.ignore(&name, is_dir));
        if is_dir {
            if ignored {
                walker.skip_current_dir();
            }
            continue;
        }
        if ignored {
            continue;
        }

        let data = fs::read(entry.path())?;
        files.push(File { name, data });
    }

    from_files(files, opts)
}

/// Assemble a chart from buffered files.
///
/// All paths must already be relative to the chart root with the top
/// directory stripped; archive sources are validated upstream, directory
/// sources are trusted.
pub fn from_files(files: Vec<File>, opts: &LoadOptions) -> Result<Chart> {
    let mut chart = Chart::default();
    let mut values = Values::new();
    let mut environment: Option<Values> = None;
    let mut subcharts: IndexMap<String, Vec<File>> = IndexMap::new();

    for file in files {
        if file.name == CHARTFILE_NAME {
            let metadata: Metadata = serde_yaml::from_slice(&file.data)?;
            if let Some(version) = metadata.api_version.as_deref() {
                if version != API_VERSION_V1 {
                    return Err(CoreError::UnsupportedApiVersion {
                        version: version.to_string(),
                    });
                }
            }
            chart.metadata = Some(metadata);
        } else if file.name == "values.toml" {
            return Err(CoreError::IllegalValuesToml);
        } else if file.name == VALUES_FILE_NAME {
            values = parse_values_or_warn(VALUES_FILE_NAME, &file.data);
        } else if opts.env_values_file == Some(file.name.as_str()) {
            environment = Some(parse_values_or_warn(&file.name, &file.data));
        } else if file.name.starts_with(TEMPLATES_PREFIX) {
            chart.templates.push(file);
        } else if file.name.starts_with(CHARTS_PREFIX) {
            if file.name.ends_with(".prov") {
                chart.files.push(file);
                continue;
            }
            let cname = file.name[CHARTS_PREFIX.len()..].to_string();
            if cname.starts_with('.') || cname.starts_with('_') {
                // hidden entries under charts/ are not charts
                continue;
            }
            let scname = cname.split('/').next().unwrap_or("").to_string();
            subcharts
                .entry(scname)
                .or_default()
                .push(File::new(cname, file.data));
        } else {
            chart.files.push(file);
        }
    }

    // The environment overlay wins per key; an explicit null in the
    // overlay deletes the defaulted key.
    if let Some(env) = &environment {
        values.apply_overlay(env);
    }
    if !values.is_empty() {
        chart.default_values = values.to_yaml()?.trim().to_string();
    }

    let Some(metadata) = chart.metadata.as_ref() else {
        return Err(CoreError::MissingMetadata);
    };
    if metadata.name.is_empty() {
        return Err(CoreError::EmptyName);
    }
    let chart_name = metadata.name.clone();

    for (scname, sub_files) in subcharts {
        if scname.starts_with('.') || scname.starts_with('_') {
            continue;
        }
        let sub = load_subchart(&scname, sub_files, opts).map_err(|e| CoreError::Subchart {
            name: scname.clone(),
            chart: chart_name.clone(),
            source: Box::new(e),
        })?;
        chart.dependencies.push(sub);
    }

    Ok(chart)
}

/// Load one collected subchart, either an inner archive or an inlined
/// directory.
fn load_subchart(name: &str, files: Vec<File>, opts: &LoadOptions) -> Result<Chart> {
    if name.ends_with(".tgz") {
        let Some(first) = files.first() else {
            return Err(CoreError::Archive {
                message: "empty subchart archive collection".to_string(),
            });
        };
        if first.name != name {
            return Err(CoreError::Archive {
                message: format!("expected {name}, got {}", first.name),
            });
        }
        // Inner archives carry their own complete layout; the environment
        // overlay does not reach into them.
        return load_archive(first.data.as_slice(), &LoadOptions::default());
    }

    // Strip each file's own leading segment; entries directly under
    // charts/<name> with no further path are junk, not chart content.
    let mut buffered = Vec::with_capacity(files.len());
    for f in files {
        if let Some((_, rest)) = f.name.split_once('/') {
            buffered.push(File::new(rest.to_string(), f.data));
        }
    }
    from_files(buffered, opts)
}

/// Parse a values document, degrading to empty values on a parse failure.
fn parse_values_or_warn(name: &str, data: &[u8]) -> Values {
    match Values::from_bytes(data) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!("ignoring malformed {name}: {err}");
            Values::new()
        }
    }
}
