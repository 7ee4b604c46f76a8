/// Filesystem helpers for the per-user taxlot directory.
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use super::basic::SError;

pub const APP_DIR_NAME: &str = ".taxlot";

pub fn mk_writable_dir(dirpath: &Path) -> io::Result<()> {
    fs::create_dir_all(dirpath)?;

    let mut perms = fs::metadata(dirpath)?.permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    #[cfg(unix)]
    {
        // Does not apply to Windows
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(0o700);
    }
    fs::set_permissions(dirpath, perms)
}

// Returns a path like $HOME/.taxlot/, and ensures that it exists and is writable.
pub fn home_dir_path() -> Result<PathBuf, SError> {
    let home_dir = match dirs::home_dir() {
        Some(d) => d,
        None => return Err(SError::from("Unable to determine home directory")),
    };

    let app_dir_path = home_dir.join(APP_DIR_NAME);
    mk_writable_dir(&app_dir_path).map_err(|e| e.to_string())?;
    Ok(app_dir_path)
}

// With a file name (eg. config.json), returns a path like $HOME/.taxlot/config.json
pub fn home_dir_file_path(fname: &Path) -> Result<PathBuf, SError> {
    Ok(home_dir_path()?.join(fname))
}
