//! Building a [`Classpath`] from on-disk artifacts.
//!
//! These walk a class directory or a jar and group `.class` / `.tasty`
//! payloads by package directory. They only feed the in-memory inventory; the
//! loader never touches the file system itself.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::{ClassData, Classpath, ClasspathError, PackageData, TastyData};

#[derive(Default)]
struct PackageBuckets {
    by_package: BTreeMap<String, PackageData>,
}

impl PackageBuckets {
    fn add(&mut self, package: String, name: &str, debug_path: String, bytes: Vec<u8>, tasty: bool) {
        let entry = self
            .by_package
            .entry(package.clone())
            .or_insert_with(|| PackageData::new(package));
        let bytes: Arc<[u8]> = Arc::from(bytes);
        if tasty {
            entry.tastys.push(TastyData {
                name: name.into(),
                debug_path,
                bytes,
            });
        } else {
            entry.classes.push(ClassData {
                name: name.into(),
                debug_path,
                bytes,
            });
        }
    }

    fn finish(self) -> Classpath {
        Classpath::new(self.by_package.into_values().collect())
    }
}

/// Splits `p/q/C.class` into its dotted package and simple name, or `None`
/// for payloads we do not ingest.
fn classify_relative(rel: &str) -> Option<(String, String, bool)> {
    let (stem, tasty) = if let Some(stem) = rel.strip_suffix(".class") {
        (stem, false)
    } else if let Some(stem) = rel.strip_suffix(".tasty") {
        (stem, true)
    } else {
        return None;
    };
    let (package, name) = match stem.rsplit_once('/') {
        Some((dir, name)) => (dir.replace('/', "."), name.to_string()),
        None => (String::new(), stem.to_string()),
    };
    Some((package, name, tasty))
}

impl Classpath {
    /// Walks a directory of compiled classes.
    pub fn from_class_dir(dir: &Path) -> Result<Classpath, ClasspathError> {
        let mut buckets = PackageBuckets::default();
        for entry in walkdir::WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let ext = entry.path().extension();
            if ext != Some(OsStr::new("class")) && ext != Some(OsStr::new("tasty")) {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            let Some((package, name, tasty)) = classify_relative(&rel) else {
                continue;
            };
            let bytes = std::fs::read(entry.path())?;
            buckets.add(
                package,
                &name,
                entry.path().to_string_lossy().into_owned(),
                bytes,
                tasty,
            );
        }
        Ok(buckets.finish())
    }

    /// Reads a jar's compiled classes.
    pub fn from_jar(path: &Path) -> Result<Classpath, ClasspathError> {
        let file = std::fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut buckets = PackageBuckets::default();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if !entry.is_file() {
                continue;
            }
            let name = entry.name().to_owned();
            if name.starts_with("META-INF/") {
                continue;
            }
            let Some((package, simple, tasty)) = classify_relative(&name) else {
                continue;
            };
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            buckets.add(
                package,
                &simple,
                format!("{}!{name}", path.display()),
                bytes,
                tasty,
            );
        }
        Ok(buckets.finish())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn class_dir_groups_by_package() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::write(root.join("a/Foo.class"), b"cafe").unwrap();
        std::fs::write(root.join("a/Foo.tasty"), b"tasty").unwrap();
        std::fs::write(root.join("a/b/Bar.class"), b"cafe").unwrap();
        std::fs::write(root.join("a/readme.txt"), b"skip").unwrap();

        let cp = Classpath::from_class_dir(root).unwrap();
        let names: Vec<&str> = cp.packages().iter().map(|p| p.dotted_name.as_str()).collect();
        assert_eq!(names, vec!["a", "a.b"]);

        let a = &cp.packages()[0];
        assert_eq!(a.classes.len(), 1);
        assert_eq!(a.classes[0].name, "Foo");
        assert_eq!(a.tastys.len(), 1);
        assert_eq!(a.tastys[0].name, "Foo");
    }

    #[test]
    fn jar_entries_are_ingested() {
        let tmp = TempDir::new().unwrap();
        let jar_path = tmp.path().join("dep.jar");
        let file = std::fs::File::create(&jar_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        writer.start_file("p/q/C.class", options).unwrap();
        writer.write_all(b"cafe").unwrap();
        writer.start_file("p/q/C.tasty", options).unwrap();
        writer.write_all(b"tasty").unwrap();
        writer.start_file("META-INF/MANIFEST.MF", options).unwrap();
        writer.write_all(b"Manifest-Version: 1.0\n").unwrap();
        writer.finish().unwrap();

        let cp = Classpath::from_jar(&jar_path).unwrap();
        assert_eq!(cp.packages().len(), 1);
        let pkg = &cp.packages()[0];
        assert_eq!(pkg.dotted_name, "p.q");
        assert_eq!(pkg.classes[0].name, "C");
        assert_eq!(pkg.tastys[0].name, "C");
    }
}
