use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempPath;

use super::error::PipelineError;
use super::project::CONFIG_FILE_NAME;

/// Path components skipped by default.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git", "node_modules", "target", CONFIG_FILE_NAME];

#[derive(Debug, Clone)]
pub struct BundleOptions {
    /// Any file whose relative path contains one of these components is skipped.
    pub exclude: BTreeSet<String>,
    /// Root-relative paths skipped exactly, e.g. a config file under a custom name.
    pub exclude_paths: BTreeSet<PathBuf>,
    /// Directory for the temporary archive. `None` uses the system temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDES.iter().map(|s| (*s).to_owned()).collect(),
            exclude_paths: BTreeSet::new(),
            temp_dir: None,
        }
    }
}

impl BundleOptions {
    pub fn with_excludes<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(extra.into_iter().map(Into::into));
        self
    }

    /// Skip `file` when it lives under `root`. Files outside the root are
    /// never bundled anyway, so they leave the options unchanged.
    pub fn exclude_file(mut self, root: &Path, file: &Path) -> Self {
        let canonical = std::fs::canonicalize(root).ok().and_then(|root| {
            let file = std::fs::canonicalize(file).ok()?;
            file.strip_prefix(&root).ok().map(Path::to_owned)
        });
        let relative = canonical.or_else(|| file.strip_prefix(root).ok().map(Path::to_owned));
        if let Some(relative) = relative.filter(|r| !r.as_os_str().is_empty()) {
            self.exclude_paths.insert(relative);
        }
        self
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        self.exclude_paths.contains(relative)
            || relative
                .components()
                .any(|c| self.exclude.contains(c.as_os_str().to_string_lossy().as_ref()))
    }
}

/// A compressed archive on disk. The file is removed when this value drops.
#[derive(Debug)]
pub struct BundleArtifact {
    path: TempPath,
    size: u64,
    entries: usize,
}

impl BundleArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of archived entries (files and symlinks).
    pub fn entries(&self) -> usize {
        self.entries
    }
}

/// Package `project_root` into a gzip-compressed tar in a private temp file.
///
/// Output is reproducible: entries are sorted and timestamps, owners and
/// modes are normalized.
#[tracing::instrument(skip(options), fields(root = %project_root.display()), err)]
pub async fn bundle(
    project_root: &Path,
    options: &BundleOptions,
) -> Result<BundleArtifact, PipelineError> {
    let root = project_root.to_owned();
    let options = options.clone();
    let artifact = tokio::task::spawn_blocking(move || bundle_sync(&root, &options))
        .await
        .map_err(PipelineError::bundle)??;

    tracing::info!(
        path = %artifact.path().display(),
        size = artifact.size,
        entries = artifact.entries,
        "bundle created"
    );
    Ok(artifact)
}

fn bundle_sync(root: &Path, options: &BundleOptions) -> Result<BundleArtifact, PipelineError> {
    let meta = std::fs::metadata(root).map_err(|e| {
        PipelineError::BundleFailed(format!("project root {}: {e}", root.display()))
    })?;
    if !meta.is_dir() {
        return Err(PipelineError::BundleFailed(format!(
            "project root {} is not a directory",
            root.display()
        )));
    }

    let mut files = Vec::new();
    collect_files(root, root, options, &mut files)?;
    if files.is_empty() {
        return Err(PipelineError::BundleFailed(format!(
            "project root {} has nothing to bundle",
            root.display()
        )));
    }
    files.sort();

    let mut builder = tempfile::Builder::new();
    builder.prefix("ecus-bundle-").suffix(".tar.gz");
    let tmp = match &options.temp_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| PipelineError::BundleFailed(format!("failed to create temp file: {e}")))?;
    let (file, path) = tmp.into_parts();

    write_archive(root, &files, file).map_err(PipelineError::bundle)?;

    let size = std::fs::metadata(&path).map_err(PipelineError::bundle)?.len();
    Ok(BundleArtifact {
        path,
        size,
        entries: files.len(),
    })
}

fn collect_files(
    root: &Path,
    dir: &Path,
    options: &BundleOptions,
    out: &mut Vec<PathBuf>,
) -> Result<(), PipelineError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| PipelineError::BundleFailed(format!("read {}: {e}", dir.display())))?;

    for entry in entries {
        let entry = entry.map_err(PipelineError::bundle)?;
        let path = entry.path();
        let relative = path.strip_prefix(root).map_err(PipelineError::bundle)?;
        if options.is_excluded(relative) {
            continue;
        }

        let file_type = entry.file_type().map_err(PipelineError::bundle)?;
        if file_type.is_dir() {
            collect_files(root, &path, options, out)?;
        } else if file_type.is_file() || file_type.is_symlink() {
            out.push(relative.to_owned());
        }
    }
    Ok(())
}

fn write_archive(root: &Path, files: &[PathBuf], file: File) -> std::io::Result<()> {
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut tar = tar::Builder::new(encoder);
    tar.follow_symlinks(false);

    for relative in files {
        let full = root.join(relative);
        let meta = std::fs::symlink_metadata(&full)?;

        let mut header = tar::Header::new_gnu();
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);

        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(&full)?;
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_mode(0o777);
            header.set_size(0);
            tar.append_link(&mut header, relative, target)?;
        } else {
            header.set_entry_type(tar::EntryType::Regular);
            header.set_mode(normalized_mode(&meta));
            header.set_size(meta.len());
            let reader = SizedReader::new(File::open(&full)?, meta.len(), &full);
            tar.append_data(&mut header, relative, reader)?;
        }
    }

    let encoder = tar.into_inner()?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    writer.into_inner().map_err(std::io::IntoInnerError::into_error)?.sync_all()
}

/// Yields exactly the size recorded in the tar header. Bytes appended after
/// the stat are ignored; a file that shrank is an error.
struct SizedReader {
    inner: io::Take<File>,
    path: PathBuf,
}

impl SizedReader {
    fn new(file: File, len: u64, path: &Path) -> Self {
        Self {
            inner: file.take(len),
            path: path.to_owned(),
        }
    }
}

impl Read for SizedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        if n == 0 && self.inner.limit() > 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} shrank while bundling", self.path.display()),
            ));
        }
        Ok(n)
    }
}

#[cfg(unix)]
fn normalized_mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    if meta.permissions().mode() & 0o111 == 0 {
        0o644
    } else {
        0o755
    }
}

#[cfg(not(unix))]
fn normalized_mode(_meta: &std::fs::Metadata) -> u32 {
    0o644
}
