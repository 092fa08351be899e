use std::fs;
use std::path::Path;

/// Checks if a file exists at the given path
pub fn file_exists(path: &str) -> bool {
    Path::new(path).is_file()
}

/// Read a whole text file
pub fn file_get(path: &str) -> std::io::Result<String> {
    fs::read_to_string(path)
}

/// Write `content` to `path`, replacing any existing file
pub fn file_write(path: &str, content: &str) -> std::io::Result<()> {
    fs::write(path, content)
}
