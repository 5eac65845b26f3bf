// THEORY:
// The `scanner` is the leaf of the pipeline. It turns a directory path into the
// immutable `WorkSet` that the parallel processor consumes.
//
// Key architectural principles:
// 1.  **Flat**: Only the direct children of the input directory are candidates.
//     Subdirectories, including the `masks` output directory, are never entered.
// 2.  **Identity by Canonical Path**: Every candidate is canonicalized before it
//     enters the set, so two spellings of the same file produce one task. The
//     task still carries the path as found, which is what outputs are named after.
// 3.  **Fail Early, Fail Whole**: A directory that is missing or unreadable is a
//     scan error, reported before any work is dispatched. A directory without
//     matching files is not an error, just an empty `WorkSet`.

use crate::error::{MaskError, Result};
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions accepted by the scanner, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// One input image. `path` is the file as found in the input directory and is
/// what outputs are named after; `canonical` is only the identity used for
/// deduplication.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageTask {
    path: PathBuf,
    canonical: PathBuf,
}

impl ImageTask {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn canonical_path(&self) -> &Path {
        &self.canonical
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// The deduplicated set of tasks for one run. Never mutated after creation.
#[derive(Debug, Clone, Default)]
pub struct WorkSet {
    /// Sorted by canonical path, unique.
    tasks: Vec<ImageTask>,
}

impl WorkSet {
    /// Builds a `WorkSet` from arbitrary paths, deduplicated by canonical form.
    /// The first spelling of each file is the one kept. A path that cannot be
    /// resolved is kept as is, so processing reports it as a failure.
    pub fn from_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut unique: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
        for path in paths {
            let canonical = match fs::canonicalize(&path) {
                Ok(canonical) => canonical,
                Err(e) => {
                    debug!("Cannot resolve {}: {}", path.display(), e);
                    path.clone()
                }
            };
            unique.entry(canonical).or_insert(path);
        }

        Self {
            tasks: unique
                .into_iter()
                .map(|(canonical, path)| ImageTask { path, canonical })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageTask> {
        self.tasks.iter()
    }
}

impl IntoIterator for WorkSet {
    type Item = ImageTask;
    type IntoIter = std::vec::IntoIter<ImageTask>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}

/// Returns true if the path ends in one of `SUPPORTED_EXTENSIONS`, ignoring case.
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Enumerates the supported image files directly inside `dir`.
pub fn scan_directory(dir: &Path) -> Result<WorkSet> {
    let metadata = fs::metadata(dir).map_err(|source| match source.kind() {
        ErrorKind::NotFound => MaskError::DirectoryNotFound {
            path: dir.to_path_buf(),
        },
        _ => MaskError::DirectoryRead {
            path: dir.to_path_buf(),
            source,
        },
    })?;
    if !metadata.is_dir() {
        return Err(MaskError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let read_error = |source| MaskError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };
    // Entries are joined onto the resolved directory so every task path is
    // absolute, while symlinked files inside it keep their own names.
    let canonical_dir = fs::canonicalize(dir).map_err(read_error)?;
    let dir = canonical_dir.as_path();
    let entries = fs::read_dir(dir).map_err(read_error)?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if !has_supported_extension(&path) {
            continue;
        }

        // Follows symlinks, so a link to an image counts as a file.
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => candidates.push(path),
            Ok(_) => debug!("Skipping non-file entry {}", path.display()),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    let work_set = WorkSet::from_paths(candidates);
    warn_on_stem_collisions(&work_set);
    debug!("Found {} image(s) in {}", work_set.len(), dir.display());

    Ok(work_set)
}

/// Inputs sharing a stem write the same `<stem>_mask.png`.
fn warn_on_stem_collisions(work_set: &WorkSet) {
    let mut by_stem: HashMap<OsString, Vec<&Path>> = HashMap::new();
    for task in work_set.iter() {
        if let Some(stem) = task.path().file_stem() {
            by_stem.entry(stem.to_os_string()).or_default().push(task.path());
        }
    }

    for (stem, paths) in by_stem {
        if paths.len() > 1 {
            let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            warn!(
                "Images {} share the stem {:?}; their masks are written in path order \
                 and the last one is kept",
                names.join(", "),
                stem
            );
        }
    }
}
