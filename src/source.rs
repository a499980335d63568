use std::fs;
use std::process::Command;

use crate::constants::{ADB_BIN, MEMINFO_PATH};
use crate::error::Error;

/// Anything that can produce one full meminfo text per call.
/// The sampler reads through this seam, so tests can inject sources.
pub trait CounterSource {
    fn read(&mut self) -> Result<String, Error>;
}

/// Reads the local virtual file in full on every call.
pub struct LocalSource {
    path: String,
}

impl LocalSource {
    pub fn new() -> Self {
        Self {
            path: MEMINFO_PATH.to_string(),
        }
    }

    pub fn with_path(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

impl CounterSource for LocalSource {
    fn read(&mut self) -> Result<String, Error> {
        fs::read_to_string(&self.path).map_err(|e| Error::SourceUnavailable {
            path: self.path.clone(),
            source: e,
        })
    }
}

/// Fetches the same file from a connected device:
/// `adb shell cat /proc/meminfo`, stdout captured as UTF-8.
pub struct RemoteSource;

impl CounterSource for RemoteSource {
    fn read(&mut self) -> Result<String, Error> {
        let output = Command::new(ADB_BIN)
            .args(["shell", "cat", MEMINFO_PATH])
            .output()
            .map_err(|e| Error::RemoteCommandFailed {
                reason: format!("cannot launch {}: {}", ADB_BIN, e),
            })?;

        if !output.status.success() {
            return Err(Error::RemoteCommandFailed {
                reason: format!(
                    "{} exited with {}: {}",
                    ADB_BIN,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| Error::RemoteCommandFailed {
            reason: format!("stdout was not UTF-8: {}", e),
        })
    }
}

impl CounterSource for Box<dyn CounterSource> {
    fn read(&mut self) -> Result<String, Error> {
        (**self).read()
    }
}

pub fn make_source(remote: bool) -> Box<dyn CounterSource> {
    if remote {
        Box::new(RemoteSource)
    } else {
        Box::new(LocalSource::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn local_source_reads_whole_file() {
        let path = std::env::temp_dir().join("mem_monitor_source_test");
        fs::write(&path, "MemTotal: 1 kB\nMemFree: 1 kB\n").unwrap();
        let mut source = LocalSource::with_path(path.to_str().unwrap());
        let text = source.read().unwrap();
        assert!(text.ends_with("MemFree: 1 kB\n"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unreadable_path_is_source_unavailable() {
        let mut source = LocalSource::with_path("/definitely/not/here/meminfo");
        assert!(matches!(
            source.read(),
            Err(Error::SourceUnavailable { .. })
        ));
    }
}
