//! Operator log file.

use std::path::Path;

use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};

pub const LOG_FILE_NAME: &str = "grammarguide.log";

/// Open `{dir}/grammarguide.log` for appending, creating `dir` if needed.
pub fn file_appender(dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_missing_directory() {
        let dir = std::env::temp_dir().join(format!("grammarguide-logs-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        file_appender(&dir).expect("should open log file");
        assert!(dir.join(LOG_FILE_NAME).exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unwritable_directory_is_an_error() {
        // A path below a regular file can never be created.
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml").join("logs");
        assert!(file_appender(&dir).is_err());
    }
}
