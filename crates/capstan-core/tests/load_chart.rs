//! End-to-end chart loading and coalescence scenarios over real
//! directories and archives.

use std::fs;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, Header};
use tempfile::TempDir;

use capstan_core::{
    coalesce_values, load, load_archive, load_with, to_render_context, Capabilities, CoreError,
    LoadOptions, ReleaseOptions, Values,
};

fn tgz(entries: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);
    for (name, data) in entries {
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        builder
            .append_data(&mut header, name, data.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Like `tgz`, but writes entry names verbatim into the header so that
/// hostile names (`..`, doubled slashes) survive archive creation.
fn raw_tgz(entries: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);
    for (name, data) in entries {
        let mut header = Header::new_gnu();
        {
            let gnu = header.as_gnu_mut().unwrap();
            gnu.name[..name.len()].copy_from_slice(name.as_bytes());
        }
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        builder.append(&header, data.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn write_chart(dir: &Path, files: &[(&str, &str)]) {
    for (name, data) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, data).unwrap();
    }
}

#[test]
fn archive_referencing_parent_directory_is_rejected() {
    let data = raw_tgz(&[
        ("top/Chart.yaml", "name: demo"),
        ("top/../../escape.yaml", "oops: true"),
    ]);
    let err = load_archive(data.as_slice(), &LoadOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "chart illegally references parent directory"
    );
}

#[test]
fn archive_with_absolute_path_is_rejected() {
    let data = raw_tgz(&[("top//foo", "oops: true")]);
    let err = load_archive(data.as_slice(), &LoadOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "chart illegally contains absolute paths");
}

#[test]
fn archive_from_disk_round_trips() {
    let temp = TempDir::new().unwrap();
    let archive_path = temp.path().join("demo-0.1.0.tgz");
    fs::write(
        &archive_path,
        tgz(&[
            ("demo/Chart.yaml", "name: demo\nversion: 0.1.0"),
            ("demo/values.yaml", "replicas: 2"),
            ("demo/templates/deploy.yaml", "kind: Deployment"),
            ("demo/README.md", "# demo"),
        ]),
    )
    .unwrap();

    let chart = load(&archive_path).unwrap();
    assert_eq!(chart.name(), "demo");
    assert_eq!(
        chart.metadata.as_ref().unwrap().version.as_ref().unwrap().to_string(),
        "0.1.0"
    );
    assert_eq!(chart.templates.len(), 1);
    assert_eq!(chart.files.len(), 1);

    // round-trip: the stored defaults decode to a tree that re-encodes
    // to an equal tree
    let decoded = Values::from_yaml(&chart.default_values).unwrap();
    let reencoded = Values::from_yaml(&decoded.to_yaml().unwrap()).unwrap();
    assert_eq!(decoded, reencoded);
}

#[test]
fn minimal_chart_loads_with_metadata_only() {
    let temp = TempDir::new().unwrap();
    write_chart(temp.path(), &[("Chart.yaml", "name: tiny")]);

    let chart = load(temp.path()).unwrap();
    assert_eq!(chart.name(), "tiny");
    assert!(chart.default_values.is_empty());
    assert!(chart.templates.is_empty());
    assert!(chart.files.is_empty());
    assert!(chart.dependencies.is_empty());
}

#[test]
fn null_override_deletes_default_key() {
    let temp = TempDir::new().unwrap();
    write_chart(
        temp.path(),
        &[
            ("Chart.yaml", "name: demo"),
            ("values.yaml", "a: 1\nb:\n  c: 2\n  d: 3\n"),
        ],
    );

    let chart = load(temp.path()).unwrap();
    let result = coalesce_values(&chart, "b:\n  c: null\n").unwrap();

    assert_eq!(result.get("a").unwrap(), 1);
    assert!(!result.table("b").unwrap().contains_key("c"));
    assert_eq!(result.get("b.d").unwrap(), 3);
}

#[test]
fn globals_propagate_into_dependencies() {
    let temp = TempDir::new().unwrap();
    write_chart(
        temp.path(),
        &[
            ("Chart.yaml", "name: root"),
            ("values.yaml", "global:\n  region: us\nsub: {}\n"),
            ("charts/sub/Chart.yaml", "name: sub"),
            ("charts/sub/values.yaml", "greeting: hi\n"),
        ],
    );

    let chart = load(temp.path()).unwrap();
    let result = coalesce_values(&chart, "").unwrap();

    assert_eq!(result.get("global.region").unwrap(), "us");
    assert_eq!(result.get("sub.greeting").unwrap(), "hi");
    assert_eq!(result.get("sub.global.region").unwrap(), "us");
}

#[test]
fn parent_values_win_over_child_defaults() {
    let temp = TempDir::new().unwrap();
    write_chart(
        temp.path(),
        &[
            ("Chart.yaml", "name: root"),
            ("values.yaml", "sub:\n  color: red\n"),
            ("charts/sub/Chart.yaml", "name: sub"),
            ("charts/sub/values.yaml", "color: blue\nshape: square\n"),
        ],
    );

    let chart = load(temp.path()).unwrap();
    let result = coalesce_values(&chart, "").unwrap();

    assert_eq!(result.get("sub.color").unwrap(), "red");
    assert_eq!(result.get("sub.shape").unwrap(), "square");
}

#[test]
fn environment_overlay_merges_into_defaults() {
    let temp = TempDir::new().unwrap();
    write_chart(
        temp.path(),
        &[
            ("Chart.yaml", "name: demo"),
            ("values.yaml", "env: base\nflag: true\n"),
            ("dev.yaml", "env: dev\n"),
        ],
    );

    let opts = LoadOptions::new().with_env_values_file("dev.yaml");
    let chart = load_with(temp.path(), &opts).unwrap();

    let merged = Values::from_yaml(&chart.default_values).unwrap();
    assert_eq!(merged.get("env").unwrap(), "dev");
    assert_eq!(merged.get("flag").unwrap(), true);
}

#[test]
fn nested_archive_inside_directory_chart() {
    let temp = TempDir::new().unwrap();
    write_chart(
        temp.path(),
        &[
            ("Chart.yaml", "name: root"),
            ("values.yaml", "global:\n  tier: prod\n"),
        ],
    );
    fs::create_dir_all(temp.path().join("charts")).unwrap();
    fs::write(
        temp.path().join("charts/alpha-1.0.0.tgz"),
        tgz(&[
            ("alpha/Chart.yaml", "name: alpha\nversion: 1.0.0"),
            ("alpha/values.yaml", "greeting: hi\n"),
        ]),
    )
    .unwrap();

    let chart = load(temp.path()).unwrap();
    assert_eq!(chart.dependencies.len(), 1);
    assert_eq!(chart.dependencies[0].name(), "alpha");

    let result = coalesce_values(&chart, "").unwrap();
    assert_eq!(result.get("alpha.greeting").unwrap(), "hi");
    assert_eq!(result.get("alpha.global.tier").unwrap(), "prod");
}

#[test]
fn coalescence_is_idempotent_over_a_loaded_tree() {
    let temp = TempDir::new().unwrap();
    write_chart(
        temp.path(),
        &[
            ("Chart.yaml", "name: root"),
            ("values.yaml", "global:\n  region: us\na: 1\n"),
            ("charts/sub/Chart.yaml", "name: sub"),
            ("charts/sub/values.yaml", "color: blue\n"),
        ],
    );

    let chart = load(temp.path()).unwrap();
    let once = coalesce_values(&chart, "").unwrap();
    let twice = coalesce_values(&chart, &once.to_yaml().unwrap()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn empty_values_file_sets_no_defaults() {
    let temp = TempDir::new().unwrap();
    write_chart(
        temp.path(),
        &[("Chart.yaml", "name: demo"), ("values.yaml", "")],
    );

    let chart = load(temp.path()).unwrap();
    assert!(chart.default_values.is_empty());
}

#[test]
fn subchart_failure_is_wrapped_with_both_names() {
    let temp = TempDir::new().unwrap();
    write_chart(
        temp.path(),
        &[
            ("Chart.yaml", "name: root"),
            ("charts/broken/values.yaml", "a: 1\n"),
        ],
    );

    let err = load(temp.path()).unwrap_err();
    let CoreError::Subchart { name, chart, .. } = err else {
        panic!("expected a wrapped subchart error, got: {err}");
    };
    assert_eq!(name, "broken");
    assert_eq!(chart, "root");
}

#[test]
fn loaded_paths_are_normalized_and_safe() {
    let data = tgz(&[
        ("demo/Chart.yaml", "name: demo"),
        ("demo/templates/a.yaml", "kind: A"),
        ("demo/crds/crd.yaml", "kind: CustomResourceDefinition"),
    ]);
    let chart = load_archive(data.as_slice(), &LoadOptions::default()).unwrap();

    let all = chart
        .templates
        .iter()
        .chain(chart.files.iter())
        .map(|f| f.name.as_str());
    for name in all {
        assert!(!name.is_empty());
        assert!(!name.starts_with('/'));
        assert!(!name.contains('\\'));
        assert!(!name.contains(".."));
    }
    assert_eq!(chart.crd_files().len(), 1);
}

#[test]
fn render_context_from_loaded_chart() {
    let temp = TempDir::new().unwrap();
    write_chart(
        temp.path(),
        &[
            ("Chart.yaml", "name: web\nversion: 2.1.0\nappVersion: \"9\""),
            ("values.yaml", "replicas: 2\n"),
            ("LICENSE", "Apache-2.0"),
        ],
    );

    let chart = load(temp.path()).unwrap();
    let opts = ReleaseOptions::for_upgrade("web-prod", "prod", 7);
    let ctx = to_render_context(&chart, "replicas: 4\n", &opts, Capabilities::default()).unwrap();

    let json = ctx.to_json();
    assert_eq!(json["Release"]["Name"], "web-prod");
    assert_eq!(json["Release"]["Revision"], 7);
    assert_eq!(json["Release"]["IsUpgrade"], true);
    assert_eq!(json["Chart"]["version"], "2.1.0");
    assert_eq!(json["Files"]["LICENSE"], "Apache-2.0");
    assert_eq!(json["Values"]["replicas"], 4);
}
