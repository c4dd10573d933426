use crate::artifact::SourceArtifact;
use crate::error::IngestError;
use rescore_ports::storage::SettingsDto;
use rescore_ports::types::ContainerKind;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Extension and naming rules for recognizing notation payloads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerRules {
    /// Lowercase, without the leading dot.
    pub archive_extensions: Vec<String>,
    pub notation_extensions: Vec<String>,
    /// Entry-name prefixes never selected as payload, e.g. `META-INF/`.
    pub reserved_dirs: Vec<String>,
}

impl ContainerRules {
    pub fn from_settings(settings: &SettingsDto) -> Self {
        let normalize = |exts: &[String]| -> Vec<String> {
            exts.iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect()
        };
        Self {
            archive_extensions: normalize(&settings.archive_extensions),
            notation_extensions: normalize(&settings.notation_extensions),
            reserved_dirs: settings.reserved_dirs.clone(),
        }
    }

    pub fn classify(&self, path: &Path) -> Option<ContainerKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if self.archive_extensions.contains(&ext) {
            Some(ContainerKind::Archive)
        } else if self.notation_extensions.contains(&ext) {
            Some(ContainerKind::Plain)
        } else {
            None
        }
    }

    pub fn is_payload_candidate(&self, entry_name: &str) -> bool {
        if self
            .reserved_dirs
            .iter()
            .any(|dir| entry_name.starts_with(dir.as_str()))
        {
            return false;
        }
        let lower = entry_name.to_ascii_lowercase();
        self.notation_extensions.iter().any(|ext| {
            lower
                .strip_suffix(ext.as_str())
                .is_some_and(|stem| stem.ends_with('.'))
        })
    }
}

impl Default for ContainerRules {
    fn default() -> Self {
        Self::from_settings(&SettingsDto::default())
    }
}

/// A member of an archive, as listed in its central directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub index: usize,
    pub name: String,
    pub size: u64,
}

/// Returns the raw bytes of the artifact's notation payload.
pub fn read_payload(
    artifact: &SourceArtifact,
    rules: &ContainerRules,
) -> Result<Vec<u8>, IngestError> {
    match artifact.kind() {
        ContainerKind::Plain => read_file(artifact.path()),
        ContainerKind::Archive => read_archive_payload(artifact.path(), rules),
    }
}

/// Largest candidate wins; on equal size the earlier entry is kept.
pub fn select_payload<'a>(
    entries: &'a [ArchiveEntry],
    rules: &ContainerRules,
) -> Option<&'a ArchiveEntry> {
    let mut best: Option<&ArchiveEntry> = None;
    for entry in entries
        .iter()
        .filter(|entry| rules.is_payload_candidate(&entry.name))
    {
        if best.map_or(true, |current| entry.size > current.size) {
            best = Some(entry);
        }
    }
    best
}

fn read_file(path: &Path) -> Result<Vec<u8>, IngestError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => IngestError::InputNotFound(path.to_path_buf()),
        _ => IngestError::Decode(format!("failed reading {}: {e}", path.display())),
    })
}

fn read_archive_payload(path: &Path, rules: &ContainerRules) -> Result<Vec<u8>, IngestError> {
    let data = read_file(path)?;
    let mut archive =
        ZipArchive::new(Cursor::new(data)).map_err(|e| corrupt(path, e.to_string()))?;

    let entries = list_entries(&mut archive, path)?;
    let chosen = select_payload(&entries, rules)
        .ok_or_else(|| IngestError::NoPayloadFound(path.to_path_buf()))?;
    debug!(
        archive = %path.display(),
        entry = %chosen.name,
        size = chosen.size,
        "selected archive payload"
    );

    let mut file = archive
        .by_index(chosen.index)
        .map_err(|e| corrupt(path, e.to_string()))?;
    let mut payload = Vec::with_capacity(initial_capacity(chosen.size));
    file.read_to_end(&mut payload)
        .map_err(|e| corrupt(path, format!("{}: {e}", chosen.name)))?;
    Ok(payload)
}

fn list_entries<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
) -> Result<Vec<ArchiveEntry>, IngestError> {
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive
            .by_index_raw(index)
            .map_err(|e| corrupt(path, e.to_string()))?;
        if file.is_dir() {
            continue;
        }
        entries.push(ArchiveEntry {
            index,
            name: file.name().to_string(),
            size: file.size(),
        });
    }
    Ok(entries)
}

/// Declared entry sizes come from the archive itself and are not trusted
/// beyond `MAX_PREALLOC`; larger payloads grow while reading.
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

fn corrupt(path: &Path, detail: String) -> IngestError {
    IngestError::CorruptArchive {
        path: PathBuf::from(path),
        detail,
    }
}
