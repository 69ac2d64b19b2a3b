/// Parsing of the guard's metadata file.
///
/// The guard reports resource usage as `key:value` lines (one per line):
/// `time` (CPU seconds), `time-wall` (wall seconds), `max-rss` (KiB).
/// The file is advisory evidence; a missing or garbled file degrades to
/// absent fields, never to an error.
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GuardMeta {
    pub cpu_time: Option<f64>,
    pub wall_time: Option<f64>,
    pub max_rss_kb: Option<u64>,
}

impl GuardMeta {
    pub fn read(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                log::debug!("no guard metadata at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut meta = Self::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "time" => meta.cpu_time = value.parse().ok(),
                "time-wall" => meta.wall_time = value.parse().ok(),
                "max-rss" => meta.max_rss_kb = value.parse().ok(),
                other => log::debug!("ignoring guard metadata key '{}'", other),
            }
        }
        meta
    }

    /// Peak memory in bytes, if reported.
    pub fn memory_peak_bytes(&self) -> Option<u64> {
        self.max_rss_kb.map(|kb| kb * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_known_keys() {
        let meta = GuardMeta::parse("time:2.13\ntime-wall:2.30\nmax-rss:1024\n");
        assert_eq!(meta.cpu_time, Some(2.13));
        assert_eq!(meta.wall_time, Some(2.30));
        assert_eq!(meta.max_rss_kb, Some(1024));
        assert_eq!(meta.memory_peak_bytes(), Some(1024 * 1024));
    }

    #[test]
    fn tolerates_garbage_lines() {
        let meta = GuardMeta::parse("nonsense\ntime:abc\nmax-rss:512\n\n");
        assert_eq!(meta.cpu_time, None);
        assert_eq!(meta.max_rss_kb, Some(512));
    }

    #[test]
    fn missing_file_is_empty_meta() {
        let meta = GuardMeta::read(Path::new("/nonexistent/guard-meta"));
        assert_eq!(meta, GuardMeta::default());
    }
}
