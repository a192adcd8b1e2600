//! Zip container access for package archives.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use bytes::Bytes;
use zip::ZipArchive;

use super::descriptor::PackageDescriptor;
use super::manifest::ApplicationInfo;
use crate::error::ArchiveError;

/// Suffix identifying the manifest entry.
///
/// Matches `Detection.xml` as well as `detection.xml`; packaging tools have
/// emitted both spellings.
pub const MANIFEST_SUFFIX: &str = "etection.xml";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

fn initial_capacity(declared_size: u64) -> usize {
    usize::try_from(declared_size.min(MAX_PREALLOCATION)).unwrap_or(0)
}

/// Read a package archive from disk.
pub fn read_package_file(
    path: impl AsRef<Path>,
    include_payload: bool,
) -> Result<PackageDescriptor, ArchiveError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Reading package archive {}", path.display());
    read_package(BufReader::new(file), include_payload)
}

/// Read a package archive from any seekable source.
///
/// The manifest is located by suffix, parsed, and used to find the payload
/// entry. Payload bytes are materialized only when `include_payload` is set.
pub fn read_package<R: Read + Seek>(
    source: R,
    include_payload: bool,
) -> Result<PackageDescriptor, ArchiveError> {
    let mut archive =
        ZipArchive::new(source).map_err(|source| ArchiveError::ArchiveOpen { source })?;

    let manifest_index = find_entry(&archive, |name| name.ends_with(MANIFEST_SUFFIX)).ok_or(
        ArchiveError::ManifestNotFound {
            suffix: MANIFEST_SUFFIX,
        },
    )?;
    let info = read_manifest(&mut archive, manifest_index)?;

    if info.file_name.is_empty() {
        // Nothing to look up; the draft builder reports the missing field.
        return Ok(PackageDescriptor::new(info, 0, None));
    }

    let payload_index = find_entry(&archive, |name| name.ends_with(info.file_name.as_str()))
        .ok_or_else(|| ArchiveError::PayloadNotFound {
            file_name: info.file_name.clone(),
        })?;

    let mut entry = archive
        .by_index(payload_index)
        .map_err(|e| ArchiveError::PayloadRead {
            entry: info.file_name.clone(),
            reason: e.to_string(),
        })?;
    let encrypted_size = entry.compressed_size();

    let payload = if include_payload {
        let mut data = Vec::with_capacity(initial_capacity(entry.size()));
        entry
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::PayloadRead {
                entry: entry.name().to_string(),
                reason: e.to_string(),
            })?;
        log::debug!("Read {} payload bytes from '{}'", data.len(), entry.name());
        Some(Bytes::from(data))
    } else {
        None
    };

    Ok(PackageDescriptor::new(info, encrypted_size, payload))
}

fn find_entry<R: Read + Seek>(
    archive: &ZipArchive<R>,
    matches: impl Fn(&str) -> bool,
) -> Option<usize> {
    (0..archive.len()).find(|&i| archive.name_for_index(i).is_some_and(&matches))
}

fn read_manifest<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
) -> Result<ApplicationInfo, ArchiveError> {
    let mut entry = archive.by_index(index).map_err(|e| ArchiveError::ManifestRead {
        entry: format!("#{index}"),
        reason: e.to_string(),
    })?;
    let name = entry.name().to_string();

    let mut raw = Vec::new();
    entry
        .read_to_end(&mut raw)
        .map_err(|e| ArchiveError::ManifestRead {
            entry: name.clone(),
            reason: e.to_string(),
        })?;

    let body = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw);
    let xml = std::str::from_utf8(body).map_err(|e| ArchiveError::ManifestRead {
        entry: name.clone(),
        reason: e.to_string(),
    })?;

    ApplicationInfo::from_xml(xml).map_err(|source| ArchiveError::ManifestParse {
        entry: name,
        source,
    })
}
