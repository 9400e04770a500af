//! Temporary worktree locations

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix shared by every worktree directory ratchet creates
pub const WORKTREE_PREFIX: &str = "ratchet-worktree-";

/// CI-provided temp directory (GitHub Actions)
pub const TEMP_DIR_ENV: &str = "RUNNER_TEMP";

/// Directory that holds ratchet worktrees: `$RUNNER_TEMP` when set and
/// non-empty, otherwise the OS temp directory.
pub fn default_temp_root() -> PathBuf {
    match std::env::var_os(TEMP_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}

/// Collision-resistant worktree path for this process:
/// `<temp_root>/ratchet-worktree-<pid>-<nanos>`.
pub fn unique_worktree_path(temp_root: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    temp_root.join(format!("{WORKTREE_PREFIX}{}-{nanos}", std::process::id()))
}

/// Glob matching every ratchet worktree under `temp_root`
pub fn worktree_glob(temp_root: &Path) -> String {
    temp_root
        .join(format!("{WORKTREE_PREFIX}*"))
        .to_string_lossy()
        .into_owned()
}

/// PID of the run that created `path`, parsed from its directory name.
pub fn owner_pid(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    let rest = name.strip_prefix(WORKTREE_PREFIX)?;
    let (pid, _nanos) = rest.split_once('-')?;
    pid.parse().ok()
}
