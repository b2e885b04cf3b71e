//! Typed whole-file reads.

use crate::error::{Error, Result};
use bytemuck::Pod;
use std::path::Path;

/// Read an entire file into a buffer of `T`.
///
/// Fails unless the file size is an exact multiple of `size_of::<T>()`.
/// Used for SPIR-V blobs (`u32`) and raw asset payloads.
pub fn read_typed<T: Pod>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;

    let elem_size = std::mem::size_of::<T>();
    if elem_size == 0 || bytes.len() % elem_size != 0 {
        return Err(Error::InvalidData(format!(
            "{}: file size {} is not a multiple of element size {}",
            path.display(),
            bytes.len(),
            elem_size
        )));
    }

    let mut out = Vec::with_capacity(bytes.len() / elem_size);
    for chunk in bytes.chunks_exact(elem_size) {
        out.push(bytemuck::pod_read_unaligned(chunk));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(contents: &[u8]) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("prism-fs-test-{}", contents.len()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents).unwrap();
        path
    }

    #[test]
    fn reads_exact_multiple() {
        let path = temp_file(&[1, 0, 0, 0, 2, 0, 0, 0]);
        let words: Vec<u32> = read_typed(&path).unwrap();
        assert_eq!(words, vec![1, 2]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn rejects_trailing_bytes() {
        let path = temp_file(&[1, 0, 0, 0, 2, 0, 0]);
        let res: Result<Vec<u32>> = read_typed(&path);
        assert!(res.is_err());
        std::fs::remove_file(path).ok();
    }
}
