//! Archive extraction (tar, tar.gz, tar.bz2, tar.xz).

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use flate2::read::GzDecoder;
use tar::EntryType;

use crate::error::{QpxError, Result};

/// Supported archive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Tar,
    TarGz,
    TarBz2,
    TarXz,
}

impl ArchiveType {
    /// Detect archive type from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let path_str = path.to_string_lossy().to_lowercase();

        if path_str.ends_with(".tar.gz") || path_str.ends_with(".tgz") {
            Some(ArchiveType::TarGz)
        } else if path_str.ends_with(".tar.bz2") || path_str.ends_with(".tbz2") {
            Some(ArchiveType::TarBz2)
        } else if path_str.ends_with(".tar.xz") || path_str.ends_with(".txz") {
            Some(ArchiveType::TarXz)
        } else if path_str.ends_with(".tar") {
            Some(ArchiveType::Tar)
        } else {
            None
        }
    }

    /// Detect archive type from the leading magic bytes; anything unknown is a plain tar
    pub fn from_magic(header: &[u8]) -> Self {
        if header.starts_with(&[0x1f, 0x8b]) {
            ArchiveType::TarGz
        } else if header.starts_with(b"BZh") {
            ArchiveType::TarBz2
        } else if header.starts_with(&[0xfd, b'7', b'z', b'X', b'Z', 0x00]) {
            ArchiveType::TarXz
        } else {
            ArchiveType::Tar
        }
    }

    /// Detect the type of an archive on disk, by extension first and content second
    pub fn detect(path: &Path) -> Result<Self> {
        if let Some(archive_type) = Self::from_path(path) {
            return Ok(archive_type);
        }

        let mut header = [0u8; 6];
        let mut file = File::open(path)?;
        let read = file.read(&mut header)?;
        Ok(Self::from_magic(&header[..read]))
    }
}

/// Archive extractor
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Extract an archive to the specified directory
    pub fn extract(archive_path: &Path, dest_dir: &Path) -> Result<()> {
        let archive_type = ArchiveType::detect(archive_path)?;
        Self::extract_with_type(archive_path, dest_dir, archive_type)
    }

    /// Extract an archive with explicit type
    pub fn extract_with_type(
        archive_path: &Path,
        dest_dir: &Path,
        archive_type: ArchiveType,
    ) -> Result<()> {
        fs::create_dir_all(dest_dir)?;

        let reader = BufReader::new(File::open(archive_path)?);

        match archive_type {
            ArchiveType::Tar => Self::extract_tar_reader(reader, dest_dir),
            ArchiveType::TarGz => Self::extract_tar_reader(GzDecoder::new(reader), dest_dir),
            ArchiveType::TarBz2 => {
                Self::extract_tar_reader(bzip2::read::BzDecoder::new(reader), dest_dir)
            }
            ArchiveType::TarXz => {
                Self::extract_tar_reader(xz2::read::XzDecoder::new(reader), dest_dir)
            }
        }
    }

    /// Unpack a tar stream below `dest_dir`.
    ///
    /// Only regular files and directories are written. Every other entry type
    /// (global pax headers, links, devices, fifos) is skipped. Entries whose
    /// path is absolute or climbs out with `..` abort the extraction.
    pub fn extract_tar_reader<R: Read>(reader: R, dest_dir: &Path) -> Result<()> {
        let mut archive = tar::Archive::new(reader);

        let entries = archive
            .entries()
            .map_err(|e| QpxError::Extract(format!("Failed to read tar: {}", e)))?;

        for entry in entries {
            let mut entry = entry
                .map_err(|e| QpxError::Extract(format!("Failed to read tar entry: {}", e)))?;

            let entry_type = entry.header().entry_type();
            let path = entry
                .path()
                .map_err(|e| QpxError::Extract(format!("Invalid path in tar: {}", e)))?
                .into_owned();

            let relative = match entry_type {
                EntryType::Regular | EntryType::Continuous | EntryType::Directory => {
                    Self::safe_relative_path(&path)?
                }
                other => {
                    log::debug!("Skipping {:?} entry {}", other, path.display());
                    continue;
                }
            };

            if relative.as_os_str().is_empty() {
                continue;
            }

            let outpath = dest_dir.join(&relative);

            if entry_type.is_dir() {
                fs::create_dir_all(&outpath)?;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }

            entry
                .unpack(&outpath)
                .map_err(|e| QpxError::Extract(format!("Failed to extract {}: {}", relative.display(), e)))?;
        }

        Ok(())
    }

    /// Normalize an entry path, rejecting anything that could escape the destination
    fn safe_relative_path(path: &Path) -> Result<PathBuf> {
        let mut relative = PathBuf::new();

        for component in path.components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(QpxError::Extract(format!(
                        "Path traversal detected in archive: {}",
                        path.display()
                    )));
                }
            }
        }

        Ok(relative)
    }

    /// The directory an archive expanded into.
    ///
    /// Archives from forges wrap everything in a single `<owner>-<repo>-<sha>/`
    /// directory. When `dir` holds exactly one directory and nothing else, that
    /// directory is returned; otherwise `dir` itself is the package root.
    pub fn single_top_level_dir(dir: &Path) -> Result<PathBuf> {
        let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;

        if entries.len() == 1 && entries[0].file_type()?.is_dir() {
            if let Some(only) = entries.pop() {
                return Ok(only.path());
            }
        }

        Ok(dir.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn append_file<W: std::io::Write>(builder: &mut tar::Builder<W>, path: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Regular);
        builder.append_data(&mut header, path, data).unwrap();
    }

    fn write_tar_gz(path: &Path, build: impl FnOnce(&mut tar::Builder<GzEncoder<File>>)) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        build(&mut builder);
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_archive_type_from_path() {
        assert_eq!(ArchiveType::from_path(Path::new("package.tar.gz")), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_path(Path::new("package.tgz")), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_path(Path::new("package.tar.bz2")), Some(ArchiveType::TarBz2));
        assert_eq!(ArchiveType::from_path(Path::new("package.tar.xz")), Some(ArchiveType::TarXz));
        assert_eq!(ArchiveType::from_path(Path::new("package.tar")), Some(ArchiveType::Tar));
        assert_eq!(ArchiveType::from_path(Path::new("package.txt")), None);
    }

    #[test]
    fn test_archive_type_from_magic() {
        assert_eq!(ArchiveType::from_magic(&[0x1f, 0x8b, 0x08]), ArchiveType::TarGz);
        assert_eq!(ArchiveType::from_magic(b"BZh91AY"), ArchiveType::TarBz2);
        assert_eq!(ArchiveType::from_magic(b"ustar"), ArchiveType::Tar);
    }

    #[test]
    fn test_extract_tar_gz_without_extension() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("download");
        write_tar_gz(&archive, |b| {
            append_file(b, "owner-repo-abc123/qpm.json", b"{}");
            append_file(b, "owner-repo-abc123/src/main.qml", b"Item {}");
        });

        let dest = temp.path().join("out");
        ArchiveExtractor::extract(&archive, &dest).unwrap();

        let root = ArchiveExtractor::single_top_level_dir(&dest).unwrap();
        assert_eq!(root, dest.join("owner-repo-abc123"));
        assert_eq!(fs::read_to_string(root.join("src/main.qml")).unwrap(), "Item {}");
    }

    #[test]
    fn test_extract_skips_unknown_entry_types() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("pkg.tar.gz");
        write_tar_gz(&archive, |b| {
            let mut global = tar::Header::new_ustar();
            let pax = b"52 comment=0123456789abcdef0123456789abcdef01234567\n";
            global.set_path("pax_global_header").unwrap();
            global.set_size(pax.len() as u64);
            global.set_entry_type(EntryType::XGlobalHeader);
            global.set_cksum();
            b.append(&global, &pax[..]).unwrap();

            append_file(b, "top/qpm.json", b"{}");

            let mut link = tar::Header::new_gnu();
            link.set_size(0);
            link.set_entry_type(EntryType::Symlink);
            b.append_link(&mut link, "top/link", "/etc/passwd").unwrap();
        });

        let dest = temp.path().join("out");
        ArchiveExtractor::extract(&archive, &dest).unwrap();

        assert!(dest.join("top/qpm.json").is_file());
        assert!(!dest.join("top/link").exists());
        assert!(!dest.join("pax_global_header").exists());
        assert_eq!(ArchiveExtractor::single_top_level_dir(&dest).unwrap(), dest.join("top"));
    }

    #[test]
    fn test_extract_rejects_path_traversal() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.tar");
        {
            let mut builder = tar::Builder::new(File::create(&archive).unwrap());
            let data = b"owned";
            let mut header = tar::Header::new_old();
            header.as_old_mut().name[..7].copy_from_slice(b"../evil");
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(EntryType::Regular);
            header.set_cksum();
            builder.append(&header, &data[..]).unwrap();
            builder.finish().unwrap();
        }

        let dest = temp.path().join("out");
        let err = ArchiveExtractor::extract(&archive, &dest).unwrap_err();
        assert!(matches!(err, QpxError::Extract(_)));
        assert!(!temp.path().join("evil").exists());
    }

    #[test]
    fn test_single_top_level_dir_without_wrapper() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("qpm.json"), "{}").unwrap();
        fs::create_dir(temp.path().join("src")).unwrap();

        assert_eq!(ArchiveExtractor::single_top_level_dir(temp.path()).unwrap(), temp.path());
    }
}
