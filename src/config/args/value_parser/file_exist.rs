use std::path::PathBuf;

/// Accept an AWS config or credentials file path only if it points at a file.
pub fn is_file_exist(file_path: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(file_path);

    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("file not found: {}", path.display()))
    }
}
