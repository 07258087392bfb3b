//! Code regarding file input (reading source `.jack` files)
//! and output (writing generated `.vm` files) actions.
//!
//! ## Input
//! `jackc` accepts either a path to a single `.jack` file or a path to
//! a directory; in the latter case every `.jack` file directly inside
//! it is a compilation unit. Files are visited in name order, so
//! multi-file runs are deterministic.
//!
//! ## Output
//! Each compiled class produces a `.vm` file named after it, placed
//! alongside the source files.

const SOURCE_EXTENSION: &str = "jack";
const OUTPUT_EXTENSION: &str = "vm";

pub mod input {
    use std::{fs, io, path::PathBuf};

    /// A single compilation unit, read into memory.
    pub struct SourceFile {
        file_name: String,
        content: String,
    }

    impl SourceFile {
        /// Construct an internally supplied source file
        /// (as opposed to one read from disk).
        ///
        /// Most commonly used in tests.
        #[cfg(test)]
        pub fn internal(file_name: &str, content: &str) -> Self {
            Self {
                file_name: file_name.to_string(),
                content: content.to_string(),
            }
        }

        /// Name of the module this file defines (the file stem).
        pub fn module_name(&self) -> String {
            self.file_name
                .strip_suffix(&format!(".{}", super::SOURCE_EXTENSION))
                .unwrap_or(&self.file_name)
                .to_string()
        }

        pub fn content(&self) -> &str {
            &self.content
        }
    }

    /// The set of source files a single run compiles.
    pub struct SourceDir {
        paths: std::vec::IntoIter<PathBuf>,
    }

    impl SourceDir {
        /// Collect the source files under the given path - either a
        /// lone `.jack` file or the `.jack` files directly inside a
        /// directory.
        pub fn setup(path: &std::path::Path) -> io::Result<Self> {
            let mut paths = if path.is_file() {
                vec![path.to_path_buf()]
            } else if path.is_dir() {
                fs::read_dir(path)?
                    .map(|entry| entry.map(|e| e.path()))
                    .collect::<io::Result<Vec<_>>>()?
            } else {
                return Err(io::Error::other(
                    "provided path is not a valid file or directory",
                ));
            };

            paths.retain(|p| {
                p.extension()
                    .is_some_and(|extension| extension == super::SOURCE_EXTENSION)
            });

            if paths.is_empty() {
                return Err(io::Error::other(format!(
                    "no `.{}` files found at the provided path",
                    super::SOURCE_EXTENSION
                )));
            }

            paths.sort();

            Ok(Self {
                paths: paths.into_iter(),
            })
        }
    }

    impl Iterator for SourceDir {
        type Item = (PathBuf, io::Result<SourceFile>);

        fn next(&mut self) -> Option<Self::Item> {
            let path = self.paths.next()?;

            let source_file = fs::read_to_string(&path).map(|content| SourceFile {
                file_name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default(),
                content,
            });

            Some((path, source_file))
        }
    }
}

pub mod output {
    use std::{
        fs,
        io::{self, Write},
        path::Path,
    };

    /// A compiled module, ready to be written out.
    pub struct OutputFile {
        name: String,
        content: String,
    }

    impl OutputFile {
        pub const fn new(name: String, content: String) -> Self {
            Self { name, content }
        }

        pub fn name(&self) -> &str {
            &self.name
        }

        pub fn content(&self) -> &str {
            &self.content
        }
    }

    /// Write the compiled module as `<name>.vm`, alongside
    /// the source file it came from.
    pub fn generate(source_path: &Path, output_file: &OutputFile) -> io::Result<()> {
        let file_path = source_path
            .with_file_name(&output_file.name)
            .with_extension(super::OUTPUT_EXTENSION);

        fs::File::create(file_path)?.write_all(output_file.content.as_bytes())
    }
}
