/*!
 * Token Source
 * Opening, identifying and deleting the file tokens are read from
 */

use super::config::SourceSpec;
use crate::core::errors::{io_errno, LaunchError, LaunchResult};
use crate::monitoring::diagnostics;
use nix::libc;
use std::fs::{self, File, Metadata};
use std::io::{self, Read};
use std::os::fd::AsFd;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tracing::debug;

const STDIN_DISPLAY: &str = "/dev/stdin";

/// Device, inode and file-type bits of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    pub dev: u64,
    pub ino: u64,
    pub kind: u32,
}

impl FileIdentity {
    pub fn of(metadata: &Metadata) -> Self {
        Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
            kind: metadata.mode() & libc::S_IFMT as u32,
        }
    }

    pub fn is_regular(&self) -> bool {
        self.kind == libc::S_IFREG as u32
    }
}

/// Accept regular files, devices, FIFOs and sockets; name anything else
pub fn classify(kind: u32) -> Result<(), &'static str> {
    let accepted = [
        libc::S_IFREG,
        libc::S_IFCHR,
        libc::S_IFBLK,
        libc::S_IFIFO,
        libc::S_IFSOCK,
    ];
    if accepted.iter().any(|&k| k as u32 == kind) {
        return Ok(());
    }
    if kind == libc::S_IFDIR as u32 {
        Err("directory")
    } else if kind == libc::S_IFLNK as u32 {
        Err("symbolic link")
    } else {
        Err("unknown entry type")
    }
}

/// Identity of whatever standard input currently is
pub fn stdin_identity() -> io::Result<FileIdentity> {
    let fd = io::stdin().as_fd().try_clone_to_owned()?;
    let metadata = File::from(fd).metadata()?;
    Ok(FileIdentity::of(&metadata))
}

enum SourceReader {
    Stdin(io::Stdin),
    File(File),
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SourceReader::Stdin(stdin) => stdin.read(buf),
            SourceReader::File(file) => file.read(buf),
        }
    }
}

/// An open token stream plus what is needed to delete it safely later
pub struct TokenSource {
    path: PathBuf,
    reader: Option<SourceReader>,
    identity: FileIdentity,
    stdin: bool,
    delete_pending: bool,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("path", &self.path)
            .field("open", &self.reader.is_some())
            .field("identity", &self.identity)
            .field("stdin", &self.stdin)
            .field("delete_pending", &self.delete_pending)
            .finish()
    }
}

impl TokenSource {
    /// Open `spec`, rejecting unsupported file types
    ///
    /// A path is checked with lstat(2) before it is opened, so a symbolic
    /// link is rejected even when it points at a regular file. A file that
    /// is the same as standard input is treated as standard input.
    pub fn open(spec: &SourceSpec, delete: bool) -> LaunchResult<Self> {
        match spec {
            SourceSpec::Stdin => Self::open_stdin(),
            SourceSpec::Path(path) => Self::open_path(path, delete),
        }
    }

    fn open_stdin() -> LaunchResult<Self> {
        let path = PathBuf::from(STDIN_DISPLAY);
        let identity = stdin_identity().map_err(|source| LaunchError::SourceStat {
            path: path.clone(),
            source,
        })?;
        classify(identity.kind).map_err(|kind| LaunchError::UnsupportedSource {
            path: path.clone(),
            kind,
        })?;

        Ok(Self {
            path,
            reader: Some(SourceReader::Stdin(io::stdin())),
            identity,
            stdin: true,
            delete_pending: false,
        })
    }

    fn open_path(path: &Path, delete: bool) -> LaunchResult<Self> {
        let link = fs::symlink_metadata(path).map_err(|source| LaunchError::SourceStat {
            path: path.to_path_buf(),
            source,
        })?;
        classify(FileIdentity::of(&link).kind).map_err(|kind| LaunchError::UnsupportedSource {
            path: path.to_path_buf(),
            kind,
        })?;

        let file = File::open(path).map_err(|source| LaunchError::SourceOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata = file.metadata().map_err(|source| LaunchError::SourceStat {
            path: path.to_path_buf(),
            source,
        })?;
        let identity = FileIdentity::of(&metadata);
        classify(identity.kind).map_err(|kind| LaunchError::UnsupportedSource {
            path: path.to_path_buf(),
            kind,
        })?;

        let stdin = stdin_identity().is_ok_and(|id| id == identity);
        if stdin {
            debug!(path = %path.display(), "token file is standard input");
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader: Some(SourceReader::File(file)),
            identity,
            stdin,
            delete_pending: delete && !stdin,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn identity(&self) -> FileIdentity {
        self.identity
    }

    /// Whether tokens come from standard input (directly or via its file)
    #[inline]
    pub fn is_stdin(&self) -> bool {
        self.stdin
    }

    /// Whether deletion was requested and has not happened yet
    #[inline]
    pub fn delete_pending(&self) -> bool {
        self.delete_pending
    }

    /// Reader over the token stream; `None` once closed
    pub fn reader(&mut self) -> Option<&mut (dyn Read + 'static)> {
        self.reader.as_mut().map(|r| r as &mut dyn Read)
    }

    /// Close the stream (standard input itself stays open)
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!(path = %self.path.display(), "token source closed");
        }
    }

    /// Unlink the token file if deletion was requested and the path still
    /// names the file that was opened
    ///
    /// Runs at most once. Failures are reported but never fatal.
    pub fn delete_if_unchanged(&mut self) -> bool {
        if !std::mem::take(&mut self.delete_pending) {
            return false;
        }

        let current = match fs::symlink_metadata(&self.path) {
            Ok(metadata) => FileIdentity::of(&metadata),
            Err(err) => {
                diagnostics::log_path_error(&self.path, io_errno(&err), "lstat(2)");
                return false;
            }
        };

        if current != self.identity {
            diagnostics::log(&format!(
                "{}: token file was replaced, not deleting",
                self.path.display()
            ));
            return false;
        }
        if !current.is_regular() {
            return false;
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "token file deleted");
                true
            }
            Err(err) => {
                diagnostics::log_path_error(&self.path, io_errno(&err), "unlink(2)");
                false
            }
        }
    }
}
