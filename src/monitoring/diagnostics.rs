/*!
 * Diagnostics
 * Message, errno and path-qualified reports on standard error
 *
 * These only ever describe what happened; callers never branch on them.
 */

use nix::errno::Errno;
use std::path::Path;
use tracing::{error, warn};

/// Plain diagnostic message
pub fn log(message: &str) {
    warn!("{}", message);
}

/// Diagnostic tied to an OS error number
pub fn log_with_error(errno: Errno, message: &str) {
    error!(errno = errno as i32, "{}: {}", message, errno.desc());
}

/// Diagnostic tied to a path and an OS error number
pub fn log_path_error(path: &Path, errno: Errno, message: &str) {
    error!(
        path = %path.display(),
        errno = errno as i32,
        "{} {}: {}",
        message,
        path.display(),
        errno.desc()
    );
}
