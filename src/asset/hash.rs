//! Content fingerprints for staleness checks and hashed file names.

use xxhash_rust::xxh32::xxh32;

/// Length of a content token in hex characters
pub const TOKEN_LEN: usize = 8;

/// Short, non-cryptographic fingerprint of `content` (8 lowercase hex chars)
pub fn content_hash(content: &[u8]) -> String {
    format!("{:08x}", xxh32(content, 0))
}

/// Insert `token` before the final extension of `path`.
///
/// `app.js` becomes `app-<token>.js`; a path without an extension gets the
/// token appended.
pub fn with_hash(path: &str, token: &str) -> String {
    let (dir, file) = split_file(path);
    match file.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}-{}{}", dir, &file[..dot], token, &file[dot..]),
        _ => format!("{}-{}", path, token),
    }
}

/// Whether `candidate` is a hashed variant of the un-hashed `path`,
/// i.e. `with_hash(path, t)` for some token `t`.
pub fn is_hashed_variant(path: &str, candidate: &str) -> bool {
    let (dir, file) = split_file(path);
    let (cand_dir, cand_file) = split_file(candidate);
    if dir != cand_dir {
        return false;
    }

    let (stem, ext) = match file.rfind('.') {
        Some(dot) if dot > 0 => (&file[..dot], &file[dot..]),
        _ => (file, ""),
    };

    let Some(rest) = cand_file
        .strip_prefix(stem)
        .and_then(|r| r.strip_prefix('-'))
        .and_then(|r| r.strip_suffix(ext))
    else {
        return false;
    };

    rest.len() == TOKEN_LEN && rest.bytes().all(|b| b.is_ascii_hexdigit())
}

fn split_file(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(slash) => path.split_at(slash + 1),
        None => ("", path),
    }
}
