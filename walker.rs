//! Target discovery and run orchestration.
//!
//! [`TreeWalker`] takes the caller's paths in order, expands directories
//! (when recursive) with an explicit depth-first work stack, hands each
//! regular file to the [`FileShredder`] and collects every outcome into a
//! [`ShredReport`]. A failed file never stops the walk.
//!
//! Within a directory, entries are visited in file-name order. A directory
//! is removed only after everything below it has been processed. Symlinks are
//! never followed, including ones named with a trailing separator.

use crate::config::Config;
use crate::error::{FailureReason, ShredError};
use crate::pattern::{OsRandom, PassPlan, RandomSource};
use crate::report::{DirectoryOutcome, ShredOutcome, ShredReport};
use crate::shredder::{CancelFlag, FileShredder};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Pending step on the traversal stack
#[derive(Debug)]
enum Work {
    Visit(PathBuf),
    /// Pushed beneath a directory's children so it pops after all of them
    RemoveDir(PathBuf),
}

pub struct TreeWalker {
    shredder: FileShredder,
    plan: PassPlan,
    recursive: bool,
    rename_before_delete: bool,
}

impl TreeWalker {
    /// Create a walker using the OS random source.
    ///
    /// Fails with [`ShredError::InvalidConfiguration`] before any I/O when
    /// the config is unusable.
    pub fn new(config: &Config) -> Result<Self, ShredError> {
        Self::with_random(config, Box::new(OsRandom))
    }

    pub fn with_random(config: &Config, rng: Box<dyn RandomSource>) -> Result<Self, ShredError> {
        config.validate()?;
        let plan = config.plan()?;
        debug!(passes = plan.len(), scheme = ?config.scheme, "pass plan built");

        let shredder = FileShredder::new(rng)
            .with_chunk_size(config.chunk_size)
            .with_verify(config.verify);

        Ok(Self {
            shredder,
            plan,
            recursive: config.recursive,
            rename_before_delete: config.rename_before_delete,
        })
    }

    pub fn plan(&self) -> &PassPlan {
        &self.plan
    }

    /// Raising this flag stops the run at the next pass boundary
    pub fn cancel_flag(&self) -> CancelFlag {
        self.shredder.cancel_flag().clone()
    }

    pub async fn run<P: AsRef<Path>>(&mut self, paths: &[P]) -> ShredReport {
        self.run_with(paths, |_| {}).await
    }

    /// Like [`Self::run`], calling `on_outcome` after each outcome is recorded.
    pub async fn run_with<P, F>(&mut self, paths: &[P], mut on_outcome: F) -> ShredReport
    where
        P: AsRef<Path>,
        F: FnMut(&ShredOutcome),
    {
        let mut report = ShredReport::new();

        for path in paths {
            // A trailing separator ("link/") makes the stat resolve a symlink
            // to its target; classify the entry itself
            let normalized: PathBuf = path.as_ref().components().collect();
            let path = normalized.as_path();
            match fs::symlink_metadata(path).await {
                Err(e) => {
                    let reason = stat_failure(e);
                    debug!(path = %path.display(), error = %reason, "cannot stat target");
                    emit(&mut report, &mut on_outcome, ShredOutcome::failed(path, reason));
                }
                Ok(meta) => {
                    let ft = meta.file_type();
                    if ft.is_file() {
                        let outcome = self.shred_file(path).await;
                        emit(&mut report, &mut on_outcome, outcome);
                    } else if ft.is_dir() && !self.recursive {
                        warn!(path = %path.display(), "skipping directory, recursion disabled");
                        let outcome = ShredOutcome::failed(path, FailureReason::IsDirectoryNotRecursive);
                        emit(&mut report, &mut on_outcome, outcome);
                    } else if ft.is_dir() {
                        self.walk_dir(path, &mut report, &mut on_outcome).await;
                    } else if ft.is_symlink() {
                        warn!(path = %path.display(), "refusing to follow symlink");
                        let outcome = ShredOutcome::failed(path, FailureReason::UnsupportedFileType);
                        emit(&mut report, &mut on_outcome, outcome);
                    } else {
                        let outcome = ShredOutcome::failed(path, FailureReason::PathNotFound);
                        emit(&mut report, &mut on_outcome, outcome);
                    }
                }
            }
        }

        let summary = report.summarize();
        info!(
            total = summary.total,
            deleted = summary.deleted,
            renamed_not_deleted = summary.renamed_not_deleted,
            failed = summary.failed,
            "shred run complete"
        );
        report
    }

    async fn walk_dir<F>(&mut self, root: &Path, report: &mut ShredReport, on_outcome: &mut F)
    where
        F: FnMut(&ShredOutcome),
    {
        info!(path = %root.display(), "shredding directory tree");
        let mut stack = vec![Work::Visit(root.to_path_buf())];

        while let Some(work) = stack.pop() {
            match work {
                Work::RemoveDir(dir) => {
                    let outcome = self.remove_dir(&dir).await;
                    report.push_directory(outcome);
                }
                Work::Visit(path) => {
                    let meta = match fs::symlink_metadata(&path).await {
                        Ok(meta) => meta,
                        Err(e) => {
                            let outcome = ShredOutcome::failed(&path, stat_failure(e));
                            emit(report, on_outcome, outcome);
                            continue;
                        }
                    };

                    let ft = meta.file_type();
                    if ft.is_file() {
                        let outcome = self.shred_file(&path).await;
                        emit(report, on_outcome, outcome);
                    } else if ft.is_dir() {
                        match read_dir_sorted(&path).await {
                            Ok(children) => {
                                stack.push(Work::RemoveDir(path));
                                stack.extend(children.into_iter().rev().map(Work::Visit));
                            }
                            Err(e) => {
                                warn!(path = %path.display(), error = %e, "cannot read directory");
                                emit(report, on_outcome, ShredOutcome::failed(&path, e.into()));
                            }
                        }
                    } else {
                        // Symlinks and special files; following a link could
                        // destroy data outside the tree
                        warn!(path = %path.display(), "skipping non-regular file");
                        let outcome = ShredOutcome::failed(&path, FailureReason::UnsupportedFileType);
                        emit(report, on_outcome, outcome);
                    }
                }
            }
        }
    }

    async fn shred_file(&mut self, path: &Path) -> ShredOutcome {
        if self.shredder.cancel_flag().is_cancelled() {
            return ShredOutcome::failed(path, FailureReason::Cancelled);
        }
        self.shredder
            .shred(path, &self.plan, self.rename_before_delete)
            .await
    }

    async fn remove_dir(&self, dir: &Path) -> DirectoryOutcome {
        if self.shredder.cancel_flag().is_cancelled() {
            return DirectoryOutcome {
                path: dir.to_path_buf(),
                removed: false,
                error: Some("cancelled".to_string()),
            };
        }

        match fs::remove_dir(dir).await {
            Ok(()) => {
                debug!(path = %dir.display(), "directory removed");
                DirectoryOutcome {
                    path: dir.to_path_buf(),
                    removed: true,
                    error: None,
                }
            }
            Err(e) => {
                debug!(path = %dir.display(), error = %e, "directory left in place");
                DirectoryOutcome {
                    path: dir.to_path_buf(),
                    removed: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Shred `paths` with a DoD-style plan of `pass_count` passes.
///
/// Only a bad pass count returns `Err`; every per-path problem is recorded
/// in the report.
pub async fn run<P: AsRef<Path>>(
    paths: &[P],
    pass_count: usize,
    recursive: bool,
    rename_before_delete: bool,
) -> Result<ShredReport, ShredError> {
    let config = Config {
        passes: pass_count,
        recursive,
        rename_before_delete,
        ..Config::default()
    };
    let mut walker = TreeWalker::new(&config)?;
    Ok(walker.run(paths).await)
}

fn emit<F: FnMut(&ShredOutcome)>(report: &mut ShredReport, on_outcome: &mut F, outcome: ShredOutcome) {
    on_outcome(&outcome);
    report.push(outcome);
}

fn stat_failure(e: io::Error) -> FailureReason {
    if e.kind() == io::ErrorKind::NotFound {
        FailureReason::PathNotFound
    } else {
        e.into()
    }
}

async fn read_dir_sorted(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut children = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        children.push(entry.path());
    }
    children.sort();
    Ok(children)
}
