use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::models::report::DuplicatePair;

pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Pairs every file whose content digest was already seen with the first
/// path carrying that digest. Advisory only; nothing is deleted.
pub fn find_duplicates<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Vec<DuplicatePair> {
    let mut first_seen: HashMap<String, PathBuf> = HashMap::new();
    let mut duplicates = Vec::new();

    for path in paths {
        if !path.is_file() {
            continue;
        }
        let digest = match hash_file(path) {
            Ok(digest) => digest,
            Err(err) => {
                warn!("Skipping {} in duplicate scan: {err}", path.display());
                continue;
            }
        };
        match first_seen.get(&digest) {
            Some(original) => duplicates.push(DuplicatePair {
                path: path.to_path_buf(),
                duplicate_of: original.clone(),
                digest,
            }),
            None => {
                first_seen.insert(digest, path.to_path_buf());
            }
        }
    }

    duplicates
}
