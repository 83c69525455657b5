// Whole-file loading for shaders and other startup assets

use std::path::Path;

use crate::error::{GfxError, GfxResult};

/// Read an entire file into memory.
pub fn load_file(path: impl AsRef<Path>) -> GfxResult<Vec<u8>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| GfxError::FileLoad {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Loaded {:?} ({} bytes)", path, bytes.len());
    Ok(bytes)
}
