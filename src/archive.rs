//! Archive extraction
//!
//! The format is sniffed from the file's leading bytes rather than its
//! name, since downloaded archives are often served from extensionless URLs.

use crate::error::{InhouseError, InhouseResult};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

/// Offset of the `ustar` magic inside a tar header
const TAR_MAGIC_OFFSET: usize = 257;

/// Extracts an archive file into a directory
pub trait Archiver: Send + Sync {
    fn unarchive(&self, file: &Path, dest: &Path) -> InhouseResult<()>;
}

/// Detected archive container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    TarBz2,
    Tar,
}

impl ArchiveFormat {
    /// Identify the format from the first bytes of a file
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(b"PK\x03\x04") {
            Some(Self::Zip)
        } else if header.starts_with(&[0x1f, 0x8b]) {
            Some(Self::TarGz)
        } else if header.starts_with(b"BZh") {
            Some(Self::TarBz2)
        } else if header.len() >= TAR_MAGIC_OFFSET + 5
            && &header[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5] == b"ustar"
        {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// Identify the format of the file at `path`
    pub fn detect(path: &Path) -> InhouseResult<Option<Self>> {
        let mut file = File::open(path).map_err(|e| InhouseError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut header = Vec::with_capacity(512);
        file.by_ref()
            .take(512)
            .read_to_end(&mut header)
            .map_err(|e| InhouseError::io(format!("reading {}", path.display()), e))?;

        Ok(Self::sniff(&header))
    }
}

/// Archiver for zip, tar, tar.gz and tar.bz2 files
#[derive(Debug, Default, Clone, Copy)]
pub struct Unarchiver;

impl Unarchiver {
    pub fn new() -> Self {
        Self
    }

    fn unzip(file: File, archive_path: &Path, dest: &Path) -> InhouseResult<()> {
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| InhouseError::archive(archive_path, e))?;

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| InhouseError::archive(archive_path, e))?;

            let Some(relative) = entry.enclosed_name() else {
                return Err(InhouseError::archive(
                    archive_path,
                    format!("entry {} escapes the destination", entry.name()),
                ));
            };
            let target = dest.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target)
                    .map_err(|e| InhouseError::io(format!("creating {}", target.display()), e))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| InhouseError::io(format!("creating {}", parent.display()), e))?;
            }
            let mut out = File::create(&target)
                .map_err(|e| InhouseError::io(format!("creating {}", target.display()), e))?;
            io::copy(&mut entry, &mut out)
                .map_err(|e| InhouseError::archive(archive_path, e))?;
        }

        Ok(())
    }

    fn untar<R: Read>(reader: R, archive_path: &Path, dest: &Path) -> InhouseResult<()> {
        let mut archive = tar::Archive::new(reader);
        let entries = archive
            .entries()
            .map_err(|e| InhouseError::archive(archive_path, e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| InhouseError::archive(archive_path, e))?;
            let name = entry
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();

            let unpacked = entry
                .unpack_in(dest)
                .map_err(|e| InhouseError::archive(archive_path, e))?;
            if !unpacked {
                return Err(InhouseError::archive(
                    archive_path,
                    format!("entry {} escapes the destination", name),
                ));
            }
        }

        Ok(())
    }
}

impl Archiver for Unarchiver {
    fn unarchive(&self, file: &Path, dest: &Path) -> InhouseResult<()> {
        let Some(format) = ArchiveFormat::detect(file)? else {
            return Err(InhouseError::archive(file, "unsupported archive format"));
        };
        debug!("Extracting {} ({:?}) into {}", file.display(), format, dest.display());

        fs::create_dir_all(dest)
            .map_err(|e| InhouseError::io(format!("creating {}", dest.display()), e))?;

        let handle = File::open(file).map_err(|e| InhouseError::Read {
            path: file.to_path_buf(),
            source: e,
        })?;

        match format {
            ArchiveFormat::Zip => Self::unzip(handle, file, dest),
            ArchiveFormat::TarGz => Self::untar(GzDecoder::new(handle), file, dest),
            ArchiveFormat::TarBz2 => Self::untar(BzDecoder::new(handle), file, dest),
            ArchiveFormat::Tar => Self::untar(handle, file, dest),
        }
    }
}
