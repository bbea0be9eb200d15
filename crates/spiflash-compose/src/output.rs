//! Writing the composed image to disk.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::compose::ComposedImage;
use crate::error::Result;
use crate::report::HEAD_LEN;

/// Write `image` to `path`.
///
/// The bytes go to a temporary file next to `path` which is renamed into
/// place only after a successful write, so a failed run never leaves a
/// truncated image behind.
pub fn write_image(image: &ComposedImage, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&image.bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    tracing::debug!(path = %path.display(), len = image.bytes.len(), "wrote flash image");
    Ok(())
}

/// Read back the first [`HEAD_LEN`] bytes of a written image.
pub fn read_image_head(path: &Path) -> Result<Vec<u8>> {
    let mut head = Vec::with_capacity(HEAD_LEN);
    File::open(path)?.take(HEAD_LEN as u64).read_to_end(&mut head)?;
    Ok(head)
}
