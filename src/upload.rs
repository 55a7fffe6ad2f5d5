use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{CampusError, CampusResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_url: String,
    pub file_name: String,
}

/// File storage collaborator. Callers decide which file types are acceptable
/// before handing a file over.
pub trait Uploader {
    fn upload(&self, path: &Path) -> CampusResult<UploadedFile>;
}

/// Copies files into a local directory under a random prefix.
pub struct LocalUploader {
    dir: PathBuf,
}

impl LocalUploader {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

impl Uploader for LocalUploader {
    fn upload(&self, path: &Path) -> CampusResult<UploadedFile> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| CampusError::validation(format!("'{}' is not a file", path.display())))?;
        if !path.is_file() {
            return Err(CampusError::validation(format!(
                "'{}' does not exist or is not a regular file",
                path.display()
            )));
        }

        fs::create_dir_all(&self.dir)?;
        let prefix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        let dest = self.dir.join(format!("{}_{}", prefix, file_name));
        fs::copy(path, &dest)?;
        let dest = dest.canonicalize().unwrap_or(dest);

        tracing::debug!(source = %path.display(), dest = %dest.display(), "stored upload");
        Ok(UploadedFile {
            file_url: format!("file://{}", dest.display()),
            file_name,
        })
    }
}

/// Resumes must be PDFs: `.pdf` extension and a `%PDF-` header.
pub fn require_pdf(path: &Path) -> CampusResult<()> {
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !has_extension {
        return Err(CampusError::validation("please select a PDF file for your resume"));
    }

    let mut header = [0u8; 5];
    let mut file = fs::File::open(path)?;
    let read = file.read(&mut header)?;
    if read < header.len() || &header != b"%PDF-" {
        return Err(CampusError::validation(format!(
            "'{}' is not a valid PDF",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records uploads without touching the filesystem.
    #[derive(Default)]
    pub(crate) struct RecordingUploader {
        pub uploads: RefCell<Vec<PathBuf>>,
    }

    impl Uploader for RecordingUploader {
        fn upload(&self, path: &Path) -> CampusResult<UploadedFile> {
            self.uploads.borrow_mut().push(path.to_path_buf());
            let file_name = path.file_name().unwrap().to_string_lossy().to_string();
            Ok(UploadedFile {
                file_url: format!("memory://{}", file_name),
                file_name,
            })
        }
    }

    pub(crate) fn write_pdf(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"%PDF-1.7\n%fake resume\n").unwrap();
        path
    }

    #[test]
    fn test_local_upload_copies_file() {
        let src_dir = tempfile::tempdir().unwrap();
        let store_dir = tempfile::tempdir().unwrap();
        let src = write_pdf(src_dir.path(), "resume.pdf");

        let uploader = LocalUploader::new(&store_dir.path().join("uploads"));
        let first = uploader.upload(&src).unwrap();
        let second = uploader.upload(&src).unwrap();

        assert_eq!(first.file_name, "resume.pdf");
        assert!(first.file_url.starts_with("file://"));
        assert_ne!(first.file_url, second.file_url);
        let stored = fs::read_dir(store_dir.path().join("uploads")).unwrap().count();
        assert_eq!(stored, 2);
    }

    #[test]
    fn test_upload_missing_file() {
        let store_dir = tempfile::tempdir().unwrap();
        let uploader = LocalUploader::new(store_dir.path());
        let result = uploader.upload(&store_dir.path().join("nope.pdf"));
        assert!(matches!(result, Err(CampusError::Validation(_))));
    }

    #[test]
    fn test_require_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_pdf(dir.path(), "cv.PDF");
        assert!(require_pdf(&pdf).is_ok());

        let docx = dir.path().join("cv.docx");
        fs::write(&docx, b"PK\x03\x04").unwrap();
        assert!(require_pdf(&docx).is_err());

        let fake = dir.path().join("fake.pdf");
        fs::write(&fake, b"hello").unwrap();
        assert!(require_pdf(&fake).is_err());
    }
}
