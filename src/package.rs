//! Package lifecycle: extraction into an exclusively-owned working
//! directory, repackaging, and cleanup.
//!
//! The working directory is the only shared mutable resource in the
//! engine. It belongs to exactly one [`Package`] from extraction until
//! the pipeline repackages or aborts, and is removed on every exit path.

use anyhow::{anyhow, bail, Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A source archive paired with the working directory that owns its
/// extracted tree.
pub struct Package {
    source: PathBuf,
    work_dir: PathBuf,
    name: String,
}

impl Package {
    /// Create the working directory and unpack the source archive into it.
    /// A non-zip source is copied in verbatim as a raw payload; the
    /// pipeline's normalization and repackaging steps turn it into a
    /// proper container.
    pub fn extract(source: &Path, work_dir: &Path) -> Result<Package> {
        if work_dir.exists() {
            bail!(
                "working directory {} already exists; refusing to share it",
                work_dir.display()
            );
        }
        let name = source
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| anyhow!("source archive {} has no usable file name", source.display()))?
            .to_string();
        let file_name = source
            .file_name()
            .ok_or_else(|| anyhow!("source archive {} has no file name", source.display()))?;
        fs::create_dir_all(work_dir)
            .with_context(|| format!("create working directory {}", work_dir.display()))?;
        let file =
            File::open(source).with_context(|| format!("open {}", source.display()))?;
        match ZipArchive::new(file) {
            Ok(mut archive) => archive
                .extract(work_dir)
                .with_context(|| format!("extract {} to {}", source.display(), work_dir.display()))?,
            Err(_) => {
                fs::copy(source, work_dir.join(file_name))
                    .with_context(|| format!("copy raw payload {}", source.display()))?;
            }
        }
        Ok(Package {
            source: source.to_path_buf(),
            work_dir: work_dir.to_path_buf(),
            name,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Archive file name without its extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The package root: the single enclosing directory when the working
    /// directory holds exactly one directory and nothing else, otherwise
    /// the working directory itself.
    pub fn root(&self) -> Result<PathBuf> {
        let mut dirs = Vec::new();
        let mut file_count = 0usize;
        for entry in fs::read_dir(&self.work_dir)
            .with_context(|| format!("read {}", self.work_dir.display()))?
        {
            let entry = entry?;
            if entry.path().is_dir() {
                dirs.push(entry.path());
            } else {
                file_count += 1;
            }
        }
        if file_count == 0 && dirs.len() == 1 {
            Ok(dirs.remove(0))
        } else {
            Ok(self.work_dir.clone())
        }
    }

    /// Recursively zip the working directory's contents into `dest`,
    /// creating parent directories as needed. Fails loudly when `dest`
    /// exists and cannot be replaced.
    pub fn repackage(&self, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output directory {}", parent.display()))?;
        }
        let file = File::create(dest)
            .with_context(|| format!("create output archive {}", dest.display()))?;
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for dir in collect_dirs_recursive(&self.work_dir)? {
            let rel = dir
                .strip_prefix(&self.work_dir)
                .context("strip working directory prefix")?;
            writer
                .add_directory(zip_entry_name(rel)?, options)
                .with_context(|| format!("add directory entry {}", rel.display()))?;
        }
        for path in collect_files_recursive(&self.work_dir)? {
            let rel = path
                .strip_prefix(&self.work_dir)
                .context("strip working directory prefix")?;
            writer
                .start_file(zip_entry_name(rel)?, options)
                .with_context(|| format!("add file entry {}", rel.display()))?;
            let mut reader =
                File::open(&path).with_context(|| format!("open {}", path.display()))?;
            io::copy(&mut reader, &mut writer)
                .with_context(|| format!("compress {}", path.display()))?;
        }
        writer.finish().context("finalize output archive")?;
        Ok(())
    }

    /// Remove the working directory tree. Called on every pipeline exit
    /// path so no partial state is leaked.
    pub fn cleanup(&self) -> Result<()> {
        if self.work_dir.exists() {
            fs::remove_dir_all(&self.work_dir).with_context(|| {
                format!("remove working directory {}", self.work_dir.display())
            })?;
        }
        Ok(())
    }
}

fn zip_entry_name(rel: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| anyhow!("path {} is not valid UTF-8", rel.display()))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// Collect every file under `root`, depth-first, in a stable order.
pub fn collect_files_recursive(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.exists() {
        return Ok(files);
    }
    for entry in sorted_entries(root)? {
        if entry.is_dir() {
            files.extend(collect_files_recursive(&entry)?);
        } else {
            files.push(entry);
        }
    }
    Ok(files)
}

/// Collect every directory under `root` (excluding `root`), depth-first,
/// in a stable order.
pub fn collect_dirs_recursive(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    if !root.exists() {
        return Ok(dirs);
    }
    for entry in sorted_entries(root)? {
        if entry.is_dir() {
            dirs.push(entry.clone());
            dirs.extend(collect_dirs_recursive(&entry)?);
        }
    }
    Ok(dirs)
}

fn sorted_entries(root: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("read {}", root.display()))? {
        entries.push(entry?.path());
    }
    entries.sort();
    Ok(entries)
}

/// Move every child of `from` into `to` (created if needed), skipping
/// entries named in `keep`. Used for top-level-dir synthesis and
/// publisher-specific regrouping, where `to` usually sits inside `from`.
pub fn move_children(from: &Path, to: &Path, keep: &[&str]) -> Result<()> {
    fs::create_dir_all(to).with_context(|| format!("create {}", to.display()))?;
    for entry in fs::read_dir(from).with_context(|| format!("read {}", from.display()))? {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if keep.iter().any(|kept| *kept == name) {
            continue;
        }
        let dest = to.join(&file_name);
        fs::rename(entry.path(), &dest).with_context(|| {
            format!("move {} to {}", entry.path().display(), dest.display())
        })?;
    }
    Ok(())
}

/// Derive the output archive path from the input path by substituting the
/// last `input` path segment with `output`. When no `input` segment
/// exists, the archive goes to an `output` directory beside the source.
pub fn derive_output_path(source: &Path) -> Result<PathBuf> {
    let components: Vec<Component<'_>> = source.components().collect();
    let input_index = components
        .iter()
        .rposition(|c| c.as_os_str() == "input" && matches!(c, Component::Normal(_)));
    match input_index {
        Some(index) => {
            let mut path = PathBuf::new();
            for (i, component) in components.iter().enumerate() {
                if i == index {
                    path.push("output");
                } else {
                    path.push(component.as_os_str());
                }
            }
            Ok(path)
        }
        None => {
            let file_name = source
                .file_name()
                .ok_or_else(|| anyhow!("source {} has no file name", source.display()))?;
            let parent = source.parent().unwrap_or_else(|| Path::new("."));
            Ok(parent.join("output").join(file_name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).expect("create zip");
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (entry_name, content) in entries {
            writer.start_file(*entry_name, options).expect("start entry");
            writer.write_all(content.as_bytes()).expect("write entry");
        }
        writer.finish().expect("finish zip");
    }

    #[test]
    fn extract_root_repackage_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("pkg.zip");
        make_zip(&source, &[("pkg/a.txt", "alpha"), ("pkg/sub/b.txt", "beta")]);

        let work_dir = dir.path().join("pkg.work");
        let pkg = Package::extract(&source, &work_dir).unwrap();
        assert_eq!(pkg.name(), "pkg");
        assert_eq!(pkg.root().unwrap(), work_dir.join("pkg"));
        assert!(work_dir.join("pkg/sub/b.txt").is_file());

        let dest = dir.path().join("out/pkg.zip");
        pkg.repackage(&dest).unwrap();
        let mut archive = ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        assert!(names.contains(&"pkg/a.txt".to_string()));
        assert!(names.contains(&"pkg/sub/b.txt".to_string()));
        let mut content = String::new();
        io::Read::read_to_string(&mut archive.by_name("pkg/a.txt").unwrap(), &mut content)
            .unwrap();
        assert_eq!(content, "alpha");

        pkg.cleanup().unwrap();
        assert!(!work_dir.exists());
    }

    #[test]
    fn extract_refuses_shared_working_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("pkg.zip");
        make_zip(&source, &[("pkg/a.txt", "alpha")]);
        let work_dir = dir.path().join("work");
        fs::create_dir(&work_dir).unwrap();
        assert!(Package::extract(&source, &work_dir).is_err());
    }

    #[test]
    fn non_zip_source_is_copied_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("raw.zip");
        fs::write(&source, "not actually a zip").unwrap();
        let work_dir = dir.path().join("raw.work");
        let pkg = Package::extract(&source, &work_dir).unwrap();
        assert!(work_dir.join("raw.zip").is_file());
        assert_eq!(pkg.root().unwrap(), work_dir);
    }

    #[test]
    fn root_falls_back_to_work_dir_for_loose_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("loose.zip");
        make_zip(&source, &[("a.txt", "a"), ("sub/b.txt", "b")]);
        let work_dir = dir.path().join("loose.work");
        let pkg = Package::extract(&source, &work_dir).unwrap();
        assert_eq!(pkg.root().unwrap(), work_dir);
    }

    #[test]
    fn move_children_respects_keep_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        fs::create_dir(root.join("META-INF")).unwrap();
        fs::write(root.join("a.xsd"), "a").unwrap();
        fs::write(root.join("b.xml"), "b").unwrap();

        move_children(root, &root.join("files"), &["META-INF", "files"]).unwrap();
        assert!(root.join("META-INF").is_dir());
        assert!(root.join("files/a.xsd").is_file());
        assert!(root.join("files/b.xml").is_file());
        assert!(!root.join("a.xsd").exists());
    }

    #[test]
    fn output_path_substitutes_input_segment() {
        assert_eq!(
            derive_output_path(Path::new("data/input/ALL_20221101/ALL_20221101.zip")).unwrap(),
            PathBuf::from("data/output/ALL_20221101/ALL_20221101.zip")
        );
        assert_eq!(
            derive_output_path(Path::new("archives/pkg.zip")).unwrap(),
            PathBuf::from("archives/output/pkg.zip")
        );
    }
}
