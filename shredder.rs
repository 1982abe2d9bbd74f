//! Overwrite, flush, rename and delete a single regular file.
//!
//! [`FileShredder`] applies a [`PassPlan`] to one file at a time:
//!
//! 1. Stat the path without following symlinks; anything but a regular file
//!    fails with `NotAFile` before a handle is opened. On unix the open also
//!    refuses a symlink swapped in after the stat.
//! 2. For every pass: seek to 0, write exactly `N` bytes in bounded chunks,
//!    flush and `fsync`. Random passes draw fresh bytes for every chunk;
//!    deterministic passes fill their buffer once.
//! 3. Optionally rename the file to a random token in the same directory.
//! 4. Remove the entry.
//!
//! The file handle lives only for step 2 and is closed on every exit path.
//! Cancellation is honoured between passes, never mid-write.

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::FailureReason;
use crate::pattern::{Pass, PassPlan, RandomSource, MAX_PERIOD};
use crate::report::{FinalState, ShredOutcome};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// Length of the random name a file is renamed to before deletion
pub const RENAME_TOKEN_LEN: usize = 12;

const RENAME_ATTEMPTS: usize = 8;
const TOKEN_MAX_DRAWS: usize = RENAME_TOKEN_LEN * 16;
const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Shared cancellation request, checked only at pass boundaries
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bytes and whole passes finished so far for one file
#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    bytes: u64,
    passes: usize,
}

pub struct FileShredder {
    rng: Box<dyn RandomSource>,
    chunk_size: usize,
    verify: bool,
    cancel: CancelFlag,
}

impl FileShredder {
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        Self {
            rng,
            chunk_size: DEFAULT_CHUNK_SIZE,
            verify: false,
            cancel: CancelFlag::default(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Shred one regular file. Every failure is returned as data in the
    /// outcome; this never errors.
    pub async fn shred(
        &mut self,
        path: &Path,
        plan: &PassPlan,
        rename_before_delete: bool,
    ) -> ShredOutcome {
        let size = match fs::symlink_metadata(path).await {
            Ok(meta) if meta.file_type().is_file() => meta.len(),
            Ok(_) | Err(_) => {
                debug!(path = %path.display(), "refusing to shred non-regular file");
                return ShredOutcome::failed(path, FailureReason::NotAFile);
            }
        };

        debug!(path = %path.display(), size, passes = plan.len(), "shredding file");

        let mut progress = Progress::default();
        if let Err(reason) = self.overwrite(path, size, plan, &mut progress).await {
            warn!(
                path = %path.display(),
                passes_completed = progress.passes,
                error = %reason,
                "overwrite aborted"
            );
            return ShredOutcome {
                path: path.to_path_buf(),
                bytes_processed: progress.bytes,
                passes_completed: progress.passes,
                final_state: FinalState::Failed(reason),
                rename_skipped: false,
                residual_path: None,
            };
        }

        let mut current = path.to_path_buf();
        let mut rename_skipped = false;
        if rename_before_delete {
            match self.rename_obscured(path).await {
                Ok(renamed) => {
                    debug!(from = %path.display(), to = %renamed.display(), "renamed before delete");
                    current = renamed;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "rename failed, deleting under original name");
                    rename_skipped = true;
                }
            }
        }

        let (final_state, residual_path) = match fs::remove_file(&current).await {
            Ok(()) => {
                info!(path = %path.display(), bytes = progress.bytes, "file shredded");
                (FinalState::Deleted, None)
            }
            Err(e) => {
                warn!(path = %current.display(), error = %e, "content destroyed but entry could not be removed");
                (FinalState::RenamedButNotDeleted, Some(current))
            }
        };

        ShredOutcome {
            path: path.to_path_buf(),
            bytes_processed: progress.bytes,
            passes_completed: progress.passes,
            final_state,
            rename_skipped,
            residual_path,
        }
    }

    /// Run every pass of `plan` over the first `size` bytes of `path`.
    async fn overwrite(
        &mut self,
        path: &Path,
        size: u64,
        plan: &PassPlan,
        progress: &mut Progress,
    ) -> Result<(), FailureReason> {
        let mut file = open_no_follow(path).await?;

        // The entry may have been swapped between stat and open
        if !file.metadata().await?.is_file() {
            return Err(FailureReason::NotAFile);
        }

        self.run_passes(&mut file, size, plan, progress).await
    }

    async fn run_passes<S: PassSink>(
        &mut self,
        sink: &mut S,
        size: u64,
        plan: &PassPlan,
        progress: &mut Progress,
    ) -> Result<(), FailureReason> {
        let buf_len = usize::try_from(size)
            .unwrap_or(usize::MAX)
            .clamp(1, self.chunk_size.max(MAX_PERIOD));
        let mut buf = vec![0u8; buf_len];

        for (idx, pass) in plan.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(FailureReason::Cancelled);
            }

            // Deterministic passes fill the buffer once; every chunk then
            // starts on a period boundary so the same bytes line up
            let step = match pass.period() {
                Some(period) => {
                    pass.fill(&mut buf, 0, self.rng.as_mut());
                    if buf.len() >= period {
                        buf.len() - buf.len() % period
                    } else {
                        buf.len()
                    }
                }
                None => buf.len(),
            };

            sink.seek(SeekFrom::Start(0)).await?;

            let mut written = 0u64;
            while written < size {
                let n = (size - written).min(step as u64) as usize;
                if !pass.is_deterministic() {
                    pass.fill(&mut buf[..n], written, self.rng.as_mut());
                }
                sink.write_all(&buf[..n]).await?;
                written += n as u64;
                progress.bytes += n as u64;
            }

            sink.sync().await?;

            if self.verify
                && pass.is_deterministic()
                && !verify_pass(sink, size, pass, &mut buf).await?
            {
                return Err(FailureReason::VerifyMismatch { pass: idx + 1 });
            }

            progress.passes += 1;
            debug!(pass = idx + 1, total = plan.len(), pattern = %pass, "pass complete");
        }

        Ok(())
    }

    /// Move `path` to a random name in the same directory.
    async fn rename_obscured(&mut self, path: &Path) -> io::Result<PathBuf> {
        let parent = path.parent().unwrap_or_else(|| Path::new(""));

        for _ in 0..RENAME_ATTEMPTS {
            let Some(token) = random_token(self.rng.as_mut()) else {
                return Err(io::Error::other("random source yielded no usable name bytes"));
            };
            let candidate = parent.join(token);
            if fs::try_exists(&candidate).await? {
                continue;
            }
            fs::rename(path, &candidate).await?;
            return Ok(candidate);
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not find an unused name to rename to",
        ))
    }
}

/// Where pass bytes go: seekable, readable for verification, and able to
/// force written data to stable storage
trait PassSink: AsyncRead + AsyncWrite + AsyncSeek + Unpin {
    async fn sync(&mut self) -> io::Result<()>;
}

impl PassSink for File {
    async fn sync(&mut self) -> io::Result<()> {
        self.flush().await?;
        self.sync_all().await
    }
}

/// Open read-write without following a final symlink component
async fn open_no_follow(path: &Path) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.read(true).write(true);
    #[cfg(unix)]
    opts.custom_flags(libc::O_NOFOLLOW);
    opts.open(path).await
}

/// Read back the first `size` bytes and compare them with what `pass` wrote.
async fn verify_pass<S>(sink: &mut S, size: u64, pass: &Pass, buf: &mut [u8]) -> io::Result<bool>
where
    S: AsyncRead + AsyncSeek + Unpin,
{
    sink.seek(SeekFrom::Start(0)).await?;

    let mut pos = 0u64;
    while pos < size {
        let n = (size - pos).min(buf.len() as u64) as usize;
        sink.read_exact(&mut buf[..n]).await?;
        if buf[..n]
            .iter()
            .zip(pos..)
            .any(|(&b, at)| pass.byte_at(at) != Some(b))
        {
            return Ok(false);
        }
        pos += n as u64;
    }

    Ok(true)
}

/// Fixed-length lowercase alphanumeric token, or `None` when the source
/// keeps producing bytes outside the accepted range.
fn random_token(rng: &mut dyn RandomSource) -> Option<String> {
    // Largest multiple of the alphabet size that fits in a byte, to keep
    // the distribution uniform
    let limit = (256 / TOKEN_ALPHABET.len() * TOKEN_ALPHABET.len()) as u16;
    let mut token = String::with_capacity(RENAME_TOKEN_LEN);
    let mut byte = [0u8; 1];
    let mut draws = 0;

    while token.len() < RENAME_TOKEN_LEN {
        if draws == TOKEN_MAX_DRAWS {
            return None;
        }
        draws += 1;

        rng.fill(&mut byte);
        if u16::from(byte[0]) < limit {
            token.push(TOKEN_ALPHABET[byte[0] as usize % TOKEN_ALPHABET.len()] as char);
        }
    }

    Some(token)
}
