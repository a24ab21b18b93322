//! Streams a file through a selected hash algorithm, reporting per-chunk
//! byte counts to a progress callback as it goes.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest as Sha2Digest, Sha512};

use super::error::EngineError;
use super::record::Algo;

/// 128 KiB — matches the chunk size the original implementation uses so
/// progress reporting granularity is the same regardless of file size.
pub const CHUNK_SIZE: usize = 128 * 1024;

/// A hash algorithm that can be fed bytes incrementally.
///
/// Kept as a trait object so `hash_file` doesn't need to special-case each
/// algorithm beyond constructing the right box.
trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> String;
}

struct Md5Hasher(Md5);

impl Hasher for Md5Hasher {
    fn update(&mut self, data: &[u8]) {
        Md5Digest::update(&mut self.0, data);
    }
    fn finalize(self: Box<Self>) -> String {
        bytes_to_hex(&Md5Digest::finalize(self.0))
    }
}

struct Sha512Hasher(Sha512);

impl Hasher for Sha512Hasher {
    fn update(&mut self, data: &[u8]) {
        Sha2Digest::update(&mut self.0, data);
    }
    fn finalize(self: Box<Self>) -> String {
        bytes_to_hex(&Sha2Digest::finalize(self.0))
    }
}

struct Blake3Hasher(blake3::Hasher);

impl Hasher for Blake3Hasher {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }
    fn finalize(self: Box<Self>) -> String {
        bytes_to_hex(self.0.finalize().as_bytes())
    }
}

fn make_hasher(algo: Algo) -> Box<dyn Hasher> {
    match algo {
        Algo::Md5 => Box::new(Md5Hasher(Md5Digest::new())),
        Algo::Sha512 => Box::new(Sha512Hasher(Sha2Digest::new())),
        Algo::Blake3 => Box::new(Blake3Hasher(blake3::Hasher::new())),
    }
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hash a file's full byte stream with `algo`, invoking `on_chunk` with the
/// number of bytes read after every 128 KiB chunk (and once more, with zero,
/// on the final partial chunk) so callers can report progress without
/// re-reading the file.
pub fn hash_file(
    path: &Path,
    algo: Algo,
    mut on_chunk: impl FnMut(u64),
) -> Result<String, EngineError> {
    let mut hasher = make_hasher(algo);
    let mut file = File::open(path)
        .map_err(|e| EngineError::from_io_error(e, "reading", Some(path.to_path_buf())))?;

    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buffer)
            .map_err(|e| EngineError::from_io_error(e, "reading", Some(path.to_path_buf())))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        on_chunk(n as u64);
    }

    Ok(hasher.finalize())
}

/// Hashes a short string with MD5. Used only for the index file's embedded
/// self-checksum — this is an integrity marker, not a security boundary, and
/// must remain MD5 to stay compatible with the on-disk format.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Md5Digest::new();
    Md5Digest::update(&mut hasher, text.as_bytes());
    bytes_to_hex(&Md5Digest::finalize(hasher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn hash_text_is_md5() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(hash_text(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn hash_file_reports_chunked_progress() {
        let mut file = NamedTempFile::new().unwrap();
        let data = vec![7u8; CHUNK_SIZE + 10];
        file.write_all(&data).unwrap();

        let mut chunks = Vec::new();
        let digest = hash_file(file.path(), Algo::Blake3, |n| chunks.push(n)).unwrap();

        assert_eq!(chunks, vec![CHUNK_SIZE as u64, 10]);
        assert_eq!(digest.len(), 64); // blake3 is 256 bits = 64 hex chars
    }

    #[test]
    fn different_algorithms_disagree() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();

        let md5 = hash_file(file.path(), Algo::Md5, |_| {}).unwrap();
        let sha512 = hash_file(file.path(), Algo::Sha512, |_| {}).unwrap();
        let blake3 = hash_file(file.path(), Algo::Blake3, |_| {}).unwrap();

        assert_ne!(md5, sha512);
        assert_ne!(sha512, blake3);
        assert_eq!(md5, "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn unreadable_path_is_an_io_error() {
        let result = hash_file(Path::new("/no/such/file"), Algo::Md5, |_| {});
        assert!(result.is_err());
    }
}
