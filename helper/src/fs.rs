//! Default data-directory resolution.

//---------------------------------------------------------------------------------------------------- Use
use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

//---------------------------------------------------------------------------------------------------- Const
/// The chain's top-level directory name.
///
/// This is the PATH used for any top-level directory the chain core writes under.
///
/// | OS      | PATH                                             |
/// |---------|---------------------------------------------------|
/// | Windows | `C:\Users\Alice\AppData\Roaming\chain-core\`       |
/// | macOS   | `/Users/Alice/Library/Application Support/chain-core/` |
/// | Linux   | `/home/alice/.local/share/chain-core/`             |
pub const CHAIN_DIR: &str = "chain-core";

/// Attempt to create the default chain directory.
///
/// # Errors
/// Returns early if directory creation fails.
pub fn create_chain_dir_all() -> std::io::Result<()> {
    std::fs::create_dir_all(chain_data_dir())
}

//---------------------------------------------------------------------------------------------------- Directories
/// Create a (private) `OnceLock` and accessor function for a default data PATH.
macro_rules! impl_dir_oncelock_and_fn {
    ($(
        $(#[$attr:meta])*
        $fn:ident,
        $dirs_fn:ident,
        $once_lock:ident,
        $expect:literal
    ),* $(,)?) => {$(
        static $once_lock: OnceLock<PathBuf> = OnceLock::new();

        $(#[$attr])*
        pub fn $fn() -> &'static Path {
            $once_lock.get_or_init(|| {
                let mut path = dirs::$dirs_fn().expect($expect);

                assert!(
                    path.parent().is_some(),
                    "returned OS directory was root or empty, refusing to use it"
                );

                path.push(CHAIN_DIR);
                path
            })
        }
    )*};
}

impl_dir_oncelock_and_fn! {
    /// Default directory for the block file store and key-value database,
    /// used by `initialize` when the caller passes no explicit `data_dir`.
    ///
    /// | OS      | PATH                                                    |
    /// |---------|----------------------------------------------------------|
    /// | Windows | `C:\Users\Alice\AppData\Roaming\chain-core\`              |
    /// | macOS   | `/Users/Alice/Library/Application Support/chain-core/`   |
    /// | Linux   | `/home/alice/.local/share/chain-core/`                    |
    chain_data_dir,
    data_dir,
    CHAIN_DATA_DIR,
    "data directory was not found",
}
