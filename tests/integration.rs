use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use secureshred::config::Config;
use secureshred::pattern::RandomSource;
use secureshred::report::{ExitStatus, FinalState};
use secureshred::walker::TreeWalker;
use secureshred::{run, FailureReason};

/// Deterministic stand-in for the OS random source
struct FixedRandom(u8);

impl RandomSource for FixedRandom {
    fn fill(&mut self, buf: &mut [u8]) {
        buf.fill(self.0);
    }
}

/// Four regular files spread over nested subdirectories
fn build_tree(root: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(root.join("sub1/deeper"))?;
    fs::create_dir_all(root.join("sub2"))?;

    let files = vec![
        root.join("top.txt"),
        root.join("sub1/one.bin"),
        root.join("sub1/deeper/two.log"),
        root.join("sub2/three"),
    ];
    for (i, f) in files.iter().enumerate() {
        fs::write(f, vec![i as u8 + 1; 100 * (i + 1)])?;
    }
    Ok(files)
}

fn snapshot(root: &Path) -> Result<Vec<(PathBuf, Vec<u8>)>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push((path.clone(), fs::read(&path)?));
            }
        }
    }
    out.sort();
    Ok(out)
}

#[tokio::test]
async fn two_files_three_passes() -> Result<()> {
    let tmp = TempDir::new()?;
    let a = tmp.path().join("a.txt");
    let b = tmp.path().join("b.txt");
    fs::write(&a, b"12345")?;
    fs::write(&b, b"")?;

    let report = run(&[&a, &b], 3, false, true).await?;

    let outcomes = report.outcomes();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.final_state == FinalState::Deleted));
    assert_eq!(outcomes[0].path, a);
    assert_eq!(outcomes[0].bytes_processed, 15);
    assert_eq!(outcomes[1].path, b);
    assert_eq!(outcomes[1].bytes_processed, 0);
    assert!(!a.exists());
    assert!(!b.exists());
    assert_eq!(report.exit_status(), ExitStatus::Success);

    // Nothing left behind under a renamed name either
    assert_eq!(fs::read_dir(tmp.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn bytes_processed_is_size_times_passes() -> Result<()> {
    let tmp = TempDir::new()?;
    let f = tmp.path().join("big.bin");
    // Larger than one default chunk
    fs::write(&f, vec![0xA5u8; 200_000])?;

    let report = run(&[&f], 7, false, true).await?;

    let o = &report.outcomes()[0];
    assert_eq!(o.final_state, FinalState::Deleted);
    assert_eq!(o.passes_completed, 7);
    assert_eq!(o.bytes_processed, 200_000 * 7);
    assert!(!f.exists());
    Ok(())
}

#[tokio::test]
async fn nonexistent_path_and_repeat_run() -> Result<()> {
    let tmp = TempDir::new()?;
    let f = tmp.path().join("once.txt");
    fs::write(&f, b"secret")?;

    let first = run(&[&f], 3, false, true).await?;
    assert_eq!(first.exit_status(), ExitStatus::Success);

    let second = run(&[&f], 3, false, true).await?;
    assert_eq!(second.outcomes().len(), 1);
    assert_eq!(second.outcomes()[0].failure(), Some(&FailureReason::PathNotFound));
    assert_eq!(second.exit_status(), ExitStatus::TotalFailure);
    Ok(())
}

#[tokio::test]
async fn recursive_tree_is_fully_removed() -> Result<()> {
    let tmp = TempDir::new()?;
    let root = tmp.path().join("tree");
    let files = build_tree(&root)?;

    let config = Config {
        recursive: true,
        ..Config::default()
    };
    let mut walker = TreeWalker::with_random(&config, Box::new(FixedRandom(0x5A)))?;
    let report = walker.run(&[&root]).await;

    assert_eq!(report.outcomes().len(), files.len());
    assert_eq!(report.exit_status(), ExitStatus::Success);
    for f in &files {
        assert!(!f.exists(), "{} should be gone", f.display());
    }
    // root, sub1, sub1/deeper, sub2
    assert_eq!(report.directories().len(), 4);
    assert!(report.directories().iter().all(|d| d.removed));
    assert!(!root.exists());
    Ok(())
}

#[tokio::test]
async fn non_recursive_directory_untouched() -> Result<()> {
    let tmp = TempDir::new()?;
    let root = tmp.path().join("tree");
    build_tree(&root)?;
    let before = snapshot(&root)?;

    let report = run(&[&root], 3, false, true).await?;

    assert_eq!(report.outcomes().len(), 1);
    assert_eq!(
        report.outcomes()[0].failure(),
        Some(&FailureReason::IsDirectoryNotRecursive)
    );
    assert!(report.directories().is_empty());
    assert_eq!(snapshot(&root)?, before);
    Ok(())
}

#[tokio::test]
async fn failure_does_not_stop_later_paths() -> Result<()> {
    let tmp = TempDir::new()?;
    let missing = tmp.path().join("missing");
    let dir = tmp.path().join("dir");
    fs::create_dir(&dir)?;
    let good = tmp.path().join("good.txt");
    fs::write(&good, b"data")?;

    let report = run(&[&missing, &dir, &good], 2, false, false).await?;

    let summary = report.summarize();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.deleted, 1);
    assert_eq!(report.exit_status(), ExitStatus::PartialFailure);
    assert!(!good.exists());
    assert!(dir.exists());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn symlinks_are_not_followed() -> Result<()> {
    let tmp = TempDir::new()?;
    let outside = tmp.path().join("outside.txt");
    fs::write(&outside, b"keep me")?;

    let root = tmp.path().join("tree");
    fs::create_dir(&root)?;
    fs::write(root.join("inside.txt"), b"destroy me")?;
    std::os::unix::fs::symlink(&outside, root.join("link"))?;

    let report = run(&[&root], 3, true, true).await?;

    let link_outcome = report
        .outcomes()
        .iter()
        .find(|o| o.path == root.join("link"))
        .expect("symlink gets an outcome");
    assert_eq!(link_outcome.failure(), Some(&FailureReason::UnsupportedFileType));
    assert_eq!(report.exit_status(), ExitStatus::PartialFailure);
    assert_eq!(fs::read(&outside)?, b"keep me");
    assert!(!root.join("inside.txt").exists());

    // Directory still holds the link, so removal is reported but not fatal
    let dir = &report.directories()[0];
    assert_eq!(dir.path, root);
    assert!(!dir.removed);
    assert!(dir.error.is_some());
    assert!(root.exists());

    // A symlink given directly is refused as well
    let top = run(&[root.join("link")], 3, false, true).await?;
    assert_eq!(top.outcomes()[0].failure(), Some(&FailureReason::UnsupportedFileType));
    assert_eq!(fs::read(&outside)?, b"keep me");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn symlinked_dir_with_trailing_slash_is_not_followed() -> Result<()> {
    let tmp = TempDir::new()?;
    let outside = tmp.path().join("outside");
    fs::create_dir(&outside)?;
    fs::write(outside.join("keep.txt"), b"keep me")?;
    let link = tmp.path().join("link");
    std::os::unix::fs::symlink(&outside, &link)?;

    let with_slash = format!("{}/", link.display());
    let report = run(&[with_slash.as_str()], 3, true, true).await?;

    assert_eq!(report.outcomes().len(), 1);
    let o = &report.outcomes()[0];
    assert_eq!(o.path, link);
    assert_eq!(o.failure(), Some(&FailureReason::UnsupportedFileType));
    assert!(report.directories().is_empty());
    assert_eq!(fs::read(outside.join("keep.txt"))?, b"keep me");
    assert!(outside.exists());
    Ok(())
}

#[tokio::test]
async fn verify_with_alternating_scheme() -> Result<()> {
    let tmp = TempDir::new()?;
    let f = tmp.path().join("v.dat");
    fs::write(&f, vec![7u8; 4096])?;

    let config: Config = serde_json::from_str(
        r#"{ "passes": 6, "scheme": "alternating", "verify": true, "chunk_size": 1000 }"#,
    )?;
    let mut walker = TreeWalker::new(&config)?;
    let report = walker.run(&[&f]).await;

    let o = &report.outcomes()[0];
    assert_eq!(o.final_state, FinalState::Deleted);
    assert_eq!(o.passes_completed, 6);
    assert_eq!(o.bytes_processed, 4096 * 6);
    Ok(())
}

#[tokio::test]
async fn report_serializes_to_json() -> Result<()> {
    let tmp = TempDir::new()?;
    let f = tmp.path().join("j.txt");
    fs::write(&f, b"abc")?;
    let missing = tmp.path().join("nope");

    let report = run(&[&f, &missing], 1, false, true).await?;
    let json = serde_json::to_value(&report)?;

    let outcomes = json["outcomes"].as_array().expect("outcomes array");
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0]["final_state"]["state"], "deleted");
    assert_eq!(outcomes[0]["bytes_processed"], 3);
    assert_eq!(outcomes[1]["final_state"]["failure"]["reason"], "path_not_found");
    Ok(())
}
