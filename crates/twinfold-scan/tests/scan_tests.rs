use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use twinfold_scan::{
    CACHE_FILE_NAME, CachePolicy, EngineError, FingerprintMethod, IndexCache, IndexScanner,
    IndexSource, MethodSet, ScanConfig, StructureMapper, WarningKind, build_index,
};

/// `a/x.txt` and `b/x.txt` with identical content plus one unrelated file.
fn create_data_tree() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();

    fs::create_dir(root.join("a")).unwrap();
    fs::create_dir(root.join("b")).unwrap();
    fs::write(root.join("a/x.txt"), "foo").unwrap();
    fs::write(root.join("b/x.txt"), "foo").unwrap();
    fs::write(root.join("b/other.md"), "a different file").unwrap();

    (temp, root)
}

fn rescan_config(root: &Path, methods: MethodSet) -> ScanConfig {
    ScanConfig::builder()
        .root(root)
        .methods(methods)
        .cache_policy(CachePolicy::AlwaysRescan)
        .write_cache(false)
        .build()
        .unwrap()
}

#[test]
fn test_each_method_groups_identical_files() {
    let (_temp, root) = create_data_tree();
    let methods = MethodSet::from([
        FingerprintMethod::Hash,
        FingerprintMethod::Size,
        FingerprintMethod::Name,
    ]);
    let report = build_index(&rescan_config(&root, methods)).unwrap();
    let expected = vec![root.join("a/x.txt"), root.join("b/x.txt")];

    let hash_groups: Vec<_> = report
        .index
        .mapping(FingerprintMethod::Hash)
        .values()
        .filter(|paths| paths.len() > 1)
        .map(|paths| paths.iter().cloned().collect::<Vec<_>>())
        .collect();
    assert_eq!(hash_groups, vec![expected.clone()]);

    assert_eq!(
        report.index.paths(FingerprintMethod::Size, "3").unwrap(),
        expected.as_slice()
    );
    assert_eq!(
        report.index.paths(FingerprintMethod::Name, "x.txt").unwrap(),
        expected.as_slice()
    );
    assert_eq!(report.index.key_count(FingerprintMethod::ModifiedTime), 0);
    assert_eq!(report.source, IndexSource::Scan);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_rescan_is_idempotent() {
    let (_temp, root) = create_data_tree();
    let config = rescan_config(&root, MethodSet::all());

    let first = build_index(&config).unwrap();
    let second = build_index(&config).unwrap();
    assert_eq!(first.index, second.index);
    assert_eq!(first.files_scanned, 3);
}

#[test]
fn test_every_path_listed_once_per_method() {
    let (_temp, root) = create_data_tree();
    let report = build_index(&rescan_config(&root, MethodSet::all())).unwrap();

    for method in MethodSet::all().iter() {
        assert_eq!(report.index.path_count(method), 3, "method {method}");
    }
}

#[test]
fn test_cache_written_and_trusted() {
    let (_temp, root) = create_data_tree();
    let config = ScanConfig::new(&root, MethodSet::only(FingerprintMethod::Hash));

    let first = IndexScanner::new().build_index(&config).unwrap();
    assert_eq!(first.source, IndexSource::Scan);
    assert_eq!(first.cache_path, Some(root.join(CACHE_FILE_NAME)));
    assert!(IndexCache::exists(&root));

    // The cache is reused even though the tree changed.
    fs::write(root.join("a/new.txt"), "foo").unwrap();
    let second = IndexScanner::new().build_index(&config).unwrap();
    assert!(second.from_cache());
    assert_eq!(second.index, first.index);
    assert_eq!(second.files_scanned, 0);
}

#[test]
fn test_always_rescan_ignores_cache_and_skips_cache_file() {
    let (_temp, root) = create_data_tree();
    let config = ScanConfig::new(&root, MethodSet::only(FingerprintMethod::Name));
    IndexScanner::new().build_index(&config).unwrap();

    fs::write(root.join("a/new.txt"), "bar").unwrap();
    let mut rescan = config.clone();
    rescan.cache_policy = CachePolicy::AlwaysRescan;
    let report = IndexScanner::new().build_index(&rescan).unwrap();

    assert_eq!(report.source, IndexSource::Scan);
    let names = report.index.mapping(FingerprintMethod::Name);
    assert!(names.contains_key("new.txt"));
    assert!(!names.contains_key(CACHE_FILE_NAME));
    assert_eq!(report.files_scanned, 4);
}

#[test]
fn test_corrupt_cache_is_surfaced() {
    let (_temp, root) = create_data_tree();
    fs::write(root.join(CACHE_FILE_NAME), "{ definitely not an index").unwrap();

    let config = ScanConfig::new(&root, MethodSet::only(FingerprintMethod::Hash));
    let err = IndexScanner::new().build_index(&config).unwrap_err();
    assert!(matches!(err, EngineError::CacheCorrupted { .. }));

    // The broken cache is left for the caller to deal with.
    assert_eq!(
        fs::read_to_string(root.join(CACHE_FILE_NAME)).unwrap(),
        "{ definitely not an index"
    );
}

#[test]
fn test_empty_method_set_rejected() {
    let (_temp, root) = create_data_tree();
    let config = ScanConfig::new(&root, MethodSet::new());
    let err = build_index(&config).unwrap_err();
    assert!(err.is_configuration());
    assert!(!IndexCache::exists(&root));
}

#[cfg(unix)]
#[test]
fn test_broken_link_skipped_per_method() {
    let (_temp, root) = create_data_tree();
    std::os::unix::fs::symlink(root.join("gone.txt"), root.join("a/dangling.txt")).unwrap();

    let methods = MethodSet::from([FingerprintMethod::Hash, FingerprintMethod::Name]);
    let report = build_index(&rescan_config(&root, methods)).unwrap();
    let link = root.join("a/dangling.txt");

    // The walk finished and still produced the duplicate group.
    assert_eq!(report.files_scanned, 4);
    assert!(!report.index.contains_path(FingerprintMethod::Hash, &link));
    assert!(report.index.contains_path(FingerprintMethod::Name, &link));
    assert_eq!(report.index.path_count(FingerprintMethod::Hash), 3);

    assert_eq!(report.warnings.len(), 1);
    let warning = &report.warnings[0];
    assert_eq!(warning.path, link);
    assert_eq!(warning.method, Some(FingerprintMethod::Hash));
    assert_eq!(warning.kind, WarningKind::BrokenSymlink);
}

/// Remove all permissions from `dir`. Returns false when the current user can
/// still list it (e.g. root), restoring the permissions in that case.
#[cfg(unix)]
fn lock_dir(dir: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(dir).is_ok() {
        unlock_dir(dir);
        return false;
    }
    true
}

#[cfg(unix)]
fn unlock_dir(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_reported_and_scan_continues() {
    let (_temp, root) = create_data_tree();
    let locked = root.join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("x.txt"), "foo").unwrap();
    if !lock_dir(&locked) {
        return;
    }

    let report = build_index(&rescan_config(&root, MethodSet::only(FingerprintMethod::Hash)));
    unlock_dir(&locked);
    let report = report.unwrap();

    assert_eq!(report.files_scanned, 3);
    assert!(report
        .index
        .contains_path(FingerprintMethod::Hash, &root.join("a/x.txt")));
    assert!(!report
        .index
        .contains_path(FingerprintMethod::Hash, &locked.join("x.txt")));

    assert_eq!(report.warnings.len(), 1);
    let warning = &report.warnings[0];
    assert_eq!(warning.path, locked);
    assert_eq!(warning.kind, WarningKind::PermissionDenied);
    assert_eq!(warning.method, None);
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_reported_by_structure_mapper() {
    let (_temp, root) = create_data_tree();
    let locked = root.join("b/locked");
    fs::create_dir(&locked).unwrap();
    if !lock_dir(&locked) {
        return;
    }

    let mapped = StructureMapper::new().map(&root);
    unlock_dir(&locked);
    let mapped = mapped.unwrap();

    assert!(mapped.structure.contains("a"));
    assert!(mapped.structure.get("b").unwrap().files.contains("x.txt"));
    assert!(!mapped.structure.contains("b/locked"));
    assert_eq!(mapped.warnings.len(), 1);
    assert_eq!(mapped.warnings[0].path, locked);
}
