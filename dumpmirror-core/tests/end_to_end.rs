//! End-to-end runs against a stub `mongodump`.
//!
//! The stub is a shell script that understands `--db`, `--collection` and
//! `--out`, writes the same `<db>/<collection>.{bson,metadata.json}` layout
//! as the real tool and appends every invocation to a call log. Like the
//! real tool it refuses `--query` without `--collection`.

#![cfg(unix)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use dumpmirror_core::mirror::empty_data_document;
use dumpmirror_core::{
    BackupOptions, ConnectionProfile, DumpMirrorError, DumpToolConfig, MongodumpExecutor,
    Orchestrator,
};

const EXAMPLE_SELECTION: &str = "sales\torders\nsales\tinvoices\ninventory\t";

struct Harness {
    dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    fn base(&self) -> PathBuf {
        self.dir.path().join("backups")
    }

    fn call_log(&self) -> PathBuf {
        self.dir.path().join("calls.log")
    }

    /// Writes the stub; a unit labelled `failing` (`db.collection`, or
    /// `db.` for a whole database) exits with status 3 before writing.
    fn stub(&self, failing: Option<&str>) -> PathBuf {
        let script = format!(
            r#"#!/bin/sh
db=""; coll=""; out=""; query=""
while [ $# -gt 0 ]; do
  case "$1" in
    --db) db="$2"; shift 2 ;;
    --collection) coll="$2"; shift 2 ;;
    --out) out="$2"; shift 2 ;;
    --query) query=" query"; shift 2 ;;
    *) shift ;;
  esac
done
echo "$db.$coll$query" >> '{log}'
[ -n "$query" ] && [ -z "$coll" ] && exit 2
[ "$db.$coll" = '{failing}' ] && exit 3
mkdir -p "$out/$db" || exit 1
if [ -n "$coll" ]; then set -- "$coll"; else set -- items logs; fi
for c in "$@"; do
  printf 'documents of %s' "$c" > "$out/$db/$c.bson"
  printf '{{"options":{{}},"indexes":[],"collectionName":"%s"}}' "$c" > "$out/$db/$c.metadata.json"
done
printf 'done' > "$out/$db/.stub-done"
"#,
            log = self.call_log().display(),
            failing = failing.unwrap_or("<none>"),
        );

        let path = self.dir.path().join("mongodump");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn orchestrator(
        &self,
        program: PathBuf,
        options: BackupOptions,
    ) -> Orchestrator<MongodumpExecutor> {
        let profile = ConnectionProfile::from_parts("localhost:27017", "backup", "pw").unwrap();
        let executor = MongodumpExecutor::new(DumpToolConfig::new(program), &profile).unwrap();
        Orchestrator::new(executor, options)
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.call_log())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn run_roots(&self) -> (PathBuf, Option<PathBuf>) {
        let mut output = None;
        let mut mirror = None;
        for entry in fs::read_dir(self.base()).unwrap() {
            let path = entry.unwrap().path();
            if path.to_string_lossy().ends_with("_mirror") {
                mirror = Some(path);
            } else {
                output = Some(path);
            }
        }
        (output.expect("output root missing"), mirror)
    }
}

/// Regular files under `root`, relative and sorted.
fn files_under(root: &Path) -> Vec<PathBuf> {
    fn walk(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(root, &path, files);
            } else {
                files.push(path.strip_prefix(root).unwrap().to_path_buf());
            }
        }
    }

    let mut files = Vec::new();
    walk(root, root, &mut files);
    files.sort();
    files
}

#[tokio::test]
async fn test_end_to_end_dump_and_mirror() {
    let harness = Harness::new();
    let orchestrator =
        harness.orchestrator(harness.stub(None), BackupOptions::new(harness.base()));

    let report = orchestrator.run(EXAMPLE_SELECTION).await.unwrap();

    assert_eq!(
        harness.calls(),
        ["sales.orders", "sales.invoices", "inventory."]
    );
    assert_eq!(report.unit_count(), 3);
    assert!(!report.is_degraded());

    let mirror_root = report.mirror_root.clone().unwrap();
    let expected: Vec<PathBuf> = [
        "inventory/items.bson",
        "inventory/items.metadata.json",
        "inventory/logs.bson",
        "inventory/logs.metadata.json",
        "sales/invoices.bson",
        "sales/invoices.metadata.json",
        "sales/orders.bson",
        "sales/orders.metadata.json",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();
    assert_eq!(files_under(&mirror_root), expected);
    assert_eq!(report.mirror.as_ref().unwrap().pairs.len(), 4);

    let empty = empty_data_document().unwrap();
    for relative in &expected {
        let mirrored = fs::read(mirror_root.join(relative)).unwrap();
        if relative.extension().is_some_and(|ext| ext == "bson") {
            assert_eq!(mirrored, empty, "{}", relative.display());
        } else {
            let original = fs::read(report.output_root.join(relative)).unwrap();
            assert_eq!(mirrored, original, "{}", relative.display());
        }
    }

    // Real data stays untouched and non-metadata files are not mirrored.
    assert_eq!(
        fs::read_to_string(report.output_root.join("sales/orders.bson")).unwrap(),
        "documents of orders"
    );
    assert!(report.output_root.join("sales/.stub-done").is_file());
}

#[tokio::test]
async fn test_end_to_end_failure_stops_run_without_mirror() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(
        harness.stub(Some("sales.invoices")),
        BackupOptions::new(harness.base()),
    );

    let err = orchestrator.run(EXAMPLE_SELECTION).await.unwrap_err();

    match err {
        DumpMirrorError::DumpUtility {
            database,
            collection,
            exit_code,
        } => {
            assert_eq!(database, "sales");
            assert_eq!(collection.as_deref(), Some("invoices"));
            assert_eq!(exit_code, Some(3));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(harness.calls(), ["sales.orders", "sales.invoices"]);

    let (output_root, mirror_root) = harness.run_roots();
    assert!(output_root.join("sales/orders.metadata.json").is_file());
    assert!(!output_root.join("inventory").exists());
    assert_eq!(fs::read_dir(mirror_root.unwrap()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_end_to_end_schema_only_flag_reaches_utility() {
    let harness = Harness::new();
    let options = BackupOptions::new(harness.base())
        .with_schema_only(true)
        .with_mirror(false);
    let orchestrator = harness.orchestrator(harness.stub(None), options);

    let report = orchestrator.run("inventory\titems\n").await.unwrap();

    assert_eq!(harness.calls(), ["inventory.items query"]);
    assert!(report.mirror_root.is_none());
    let (output_root, mirror_root) = harness.run_roots();
    assert!(output_root.join("inventory/items.metadata.json").is_file());
    assert!(mirror_root.is_none());
}

#[tokio::test]
async fn test_end_to_end_schema_only_whole_database_is_rejected() {
    let harness = Harness::new();
    let options = BackupOptions::new(harness.base()).with_schema_only(true);
    let orchestrator = harness.orchestrator(harness.stub(None), options);

    let err = orchestrator
        .run("sales\torders\ninventory\t\n")
        .await
        .unwrap_err();

    assert!(matches!(err, DumpMirrorError::Configuration { .. }));
    assert!(harness.calls().is_empty());
    assert!(!harness.base().exists());
}

#[tokio::test]
async fn test_end_to_end_missing_utility() {
    let harness = Harness::new();
    let orchestrator = harness.orchestrator(
        harness.dir.path().join("not-installed"),
        BackupOptions::new(harness.base()),
    );

    let err = orchestrator.run(EXAMPLE_SELECTION).await.unwrap_err();

    assert!(matches!(err, DumpMirrorError::ProcessLaunch { .. }));
    assert!(harness.calls().is_empty());
}
