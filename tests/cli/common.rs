use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary workspace for one CLI test.
pub struct TestContext {
    pub temp_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, content).expect("Failed to write test file");
        path
    }
}

/// The joule-trace binary with colors and unicode glyphs off.
#[allow(deprecated)]
pub fn cmd() -> assert_cmd::Command {
    let mut cmd =
        assert_cmd::Command::cargo_bin("joule-trace").expect("Failed to find joule-trace binary");
    cmd.env("NO_COLOR", "1")
        .env("JOULE_TRACE_NO_UNICODE", "true")
        .env_remove("RUST_LOG")
        .env_remove("JOULE_TRACE_LOG_JSON");
    cmd
}
