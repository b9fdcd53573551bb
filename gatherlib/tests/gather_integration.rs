//! Integration tests for the gather pipeline

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use gatherlib::{
    gather, gather_with_token, CancellationToken, GatherError, GatherOptions, GatherStream,
};
use tempfile::tempdir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn create_tree(root: &Path, files: &[&str]) {
    for file in files {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, format!("// {file}\n")).unwrap();
    }
}

fn gathered_paths(root: &Path, options: &GatherOptions) -> BTreeSet<String> {
    let gathered = gather(root, options);
    if let Some(e) = &gathered.error {
        panic!("gather failed: {e}");
    }
    gathered.successes().map(|r| r.rel_path.clone()).collect()
}

fn set(paths: &[&str]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

#[test]
fn test_output_set_matches_filters_exactly() {
    init_logging();
    let temp = tempdir().unwrap();
    create_tree(
        temp.path(),
        &[
            "src/main.go",
            "src/util.go",
            "src/util_test.go",
            "README.md",
            ".env",
            ".cache/keep.txt",
            ".git/HEAD",
            "build/out.bin",
            "build/nested/x.go",
            "logs/a.log",
            "keep.log",
            "notes.tmp",
            "vendor/lib.go",
        ],
    );
    fs::write(
        temp.path().join(".gitignore"),
        "# generated\nbuild/\n*.log\n!keep.log\n\nvendor\n",
    )
    .unwrap();

    let options = GatherOptions::new()
        .include_hidden(false)
        .ignore_pattern("*.tmp");
    assert_eq!(
        gathered_paths(temp.path(), &options),
        set(&[
            "README.md",
            "keep.log",
            "src/main.go",
            "src/util.go",
            "src/util_test.go",
        ])
    );

    let go_only = options.clone().extensions([".go"]);
    assert_eq!(
        gathered_paths(temp.path(), &go_only),
        set(&["src/main.go", "src/util.go", "src/util_test.go"])
    );
}

#[test]
fn test_gitignore_negation() {
    let temp = tempdir().unwrap();
    create_tree(temp.path(), &["keep.log", "other.log", "dir/deep.log", "main.rs"]);
    fs::write(temp.path().join(".gitignore"), "*.log\n!keep.log\n").unwrap();

    assert_eq!(
        gathered_paths(temp.path(), &GatherOptions::new()),
        set(&[".gitignore", "keep.log", "main.rs"])
    );
}

#[test]
fn test_directory_only_pattern() {
    let temp = tempdir().unwrap();
    create_tree(temp.path(), &["build/out.o", "build/nested/deep.o", "other/build", "a.txt"]);

    fs::write(temp.path().join(".gitignore"), "build/\n").unwrap();
    assert_eq!(
        gathered_paths(temp.path(), &GatherOptions::new()),
        set(&[".gitignore", "a.txt", "other/build"])
    );

    fs::write(temp.path().join(".gitignore"), "build\n").unwrap();
    assert_eq!(
        gathered_paths(temp.path(), &GatherOptions::new()),
        set(&[".gitignore", "a.txt"])
    );
}

#[test]
fn test_hidden_policy() {
    let temp = tempdir().unwrap();
    create_tree(temp.path(), &[".env", ".cache/keep.txt", "main.rs"]);

    let default = gathered_paths(temp.path(), &GatherOptions::new());
    assert!(default.contains(".env"));
    assert!(default.contains(".cache/keep.txt"));

    let no_hidden = gathered_paths(temp.path(), &GatherOptions::new().include_hidden(false));
    assert_eq!(no_hidden, set(&["main.rs"]));
}

#[test]
fn test_extension_filter() {
    let temp = tempdir().unwrap();
    create_tree(temp.path(), &["a.go", "a.mod", "sub/b.go"]);

    let options = GatherOptions::new().extensions([".go"]);
    assert_eq!(gathered_paths(temp.path(), &options), set(&["a.go", "sub/b.go"]));
}

#[test]
fn test_read_errors_are_per_record() {
    let temp = tempdir().unwrap();
    create_tree(temp.path(), &["good.txt", "also_good.txt"]);
    fs::write(temp.path().join("binary.dat"), [0xc3, 0x28, 0xff]).unwrap();

    let gathered = gather(temp.path(), &GatherOptions::new());
    assert!(gathered.is_complete());
    assert_eq!(gathered.records.len(), 3);
    assert_eq!(gathered.successes().count(), 2);

    let failed: Vec<_> = gathered.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].rel_path, "binary.dat");
    assert!(matches!(failed[0].error(), Some(GatherError::FileRead { .. })));
}

#[test]
fn test_unreadable_gitignore_fails_the_walk() {
    let temp = tempdir().unwrap();
    create_tree(temp.path(), &["a.txt"]);
    fs::create_dir(temp.path().join(".gitignore")).unwrap();

    let gathered = gather(temp.path(), &GatherOptions::new());
    assert!(gathered.records.is_empty());
    assert!(matches!(gathered.error, Some(GatherError::Gitignore { .. })));

    // Disabling gitignore handling sidesteps the broken file.
    let gathered = gather(temp.path(), &GatherOptions::new().ignore_gitignore(true));
    assert!(gathered.is_complete());
    assert_eq!(gathered.records.len(), 1);
}

#[test]
fn test_cancellation_mid_walk() {
    init_logging();
    let temp = tempdir().unwrap();
    let total = 200;
    for i in 0..total {
        fs::write(temp.path().join(format!("f{i:03}.txt")), "x").unwrap();
    }

    let options = GatherOptions::new().workers(1);
    let mut stream = GatherStream::start(temp.path(), &options).unwrap();
    let consumed: Vec<_> = stream.by_ref().take(3).collect();
    assert_eq!(consumed.len(), 3);

    stream.cancel();
    // Returning at all means every stage thread was joined.
    let rest = stream.finish();

    assert!(matches!(rest.error, Some(GatherError::Cancelled)));
    assert!(consumed.len() + rest.records.len() < total);
}

#[test]
fn test_pre_cancelled_token() {
    let temp = tempdir().unwrap();
    create_tree(temp.path(), &["a.txt", "b.txt"]);

    let token = CancellationToken::new();
    token.cancel();
    let gathered = gather_with_token(temp.path(), &GatherOptions::new(), token);

    assert!(gathered.records.is_empty());
    assert!(gathered.error.as_ref().is_some_and(GatherError::is_cancelled));
}

#[test]
fn test_gather_is_idempotent() {
    let temp = tempdir().unwrap();
    let files: Vec<String> = (0..40).map(|i| format!("d{}/f{i}.rs", i % 5)).collect();
    let refs: Vec<&str> = files.iter().map(String::as_str).collect();
    create_tree(temp.path(), &refs);

    let options = GatherOptions::new().workers(4);
    let first = gathered_paths(temp.path(), &options);
    let second = gathered_paths(temp.path(), &options);

    assert_eq!(first.len(), 40);
    assert_eq!(first, second);
}

#[test]
fn test_any_worker_count_is_correct() {
    let temp = tempdir().unwrap();
    let files: Vec<String> = (0..25).map(|i| format!("f{i}.txt")).collect();
    let refs: Vec<&str> = files.iter().map(String::as_str).collect();
    create_tree(temp.path(), &refs);

    let expected = set(&refs);
    for workers in [1, 2, 7, 32] {
        let options = GatherOptions::new().workers(workers);
        assert_eq!(gathered_paths(temp.path(), &options), expected);
    }
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_stops_walk_and_keeps_earlier_records() {
    use std::os::unix::fs::PermissionsExt;

    init_logging();
    let temp = tempdir().unwrap();
    create_tree(
        temp.path(),
        &["a.txt", "b.txt", "z_locked/inner.txt", "zz.txt"],
    );
    let locked = temp.path().join("z_locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not stop a privileged user; nothing to test then.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let gathered = gather(temp.path(), &GatherOptions::new().workers(1));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(matches!(gathered.error, Some(GatherError::Walk(_))));
    let paths: BTreeSet<String> = gathered.records.iter().map(|r| r.rel_path.clone()).collect();
    assert_eq!(paths, set(&["a.txt", "b.txt"]));
    assert!(gathered.records.iter().all(|r| r.is_ok()));
}
