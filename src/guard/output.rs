/// Bounded output collection for guard child processes.
///
/// Each stream is drained on its own thread up to a hard byte limit; hitting
/// the limit truncates the stream and records the fact, it never blocks the
/// child from being reaped.
use std::io::Read;
use std::thread::{self, JoinHandle};

/// Collected bytes plus whether the limit forced truncation.
#[derive(Debug)]
pub struct CollectedStream {
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

impl CollectedStream {
    pub fn empty() -> Self {
        Self {
            bytes: Vec::new(),
            truncated: false,
        }
    }

    pub fn into_lossy_string(self) -> (String, bool) {
        (
            String::from_utf8_lossy(&self.bytes).into_owned(),
            self.truncated,
        )
    }
}

/// Spawn a collector thread draining `stream` up to `limit` bytes.
/// The thread keeps consuming after truncation so the child never stalls on a
/// full pipe.
pub fn spawn_collector<R: Read + Send + 'static>(
    stream: R,
    limit: usize,
) -> JoinHandle<CollectedStream> {
    thread::spawn(move || collect_stream(stream, limit))
}

fn collect_stream<R: Read>(mut stream: R, limit: usize) -> CollectedStream {
    let mut buffer = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if truncated {
                    continue; // keep draining, discard
                }
                if buffer.len() + n > limit {
                    let remaining = limit - buffer.len();
                    buffer.extend_from_slice(&chunk[..remaining]);
                    truncated = true;
                } else {
                    buffer.extend_from_slice(&chunk[..n]);
                }
            }
            Err(e) => {
                log::debug!("output collection stopped: {}", e);
                break;
            }
        }
    }

    CollectedStream {
        bytes: buffer,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn collects_whole_stream_under_limit() {
        let out = collect_stream(Cursor::new(b"hello world".to_vec()), 1024);
        assert_eq!(out.bytes, b"hello world");
        assert!(!out.truncated);
    }

    #[test]
    fn truncates_at_limit_and_flags_it() {
        let data = vec![b'x'; 10_000];
        let out = collect_stream(Cursor::new(data), 100);
        assert_eq!(out.bytes.len(), 100);
        assert!(out.truncated);
    }

    #[test]
    fn exact_limit_is_not_truncation() {
        let out = collect_stream(Cursor::new(vec![b'y'; 64]), 64);
        assert_eq!(out.bytes.len(), 64);
        assert!(!out.truncated);
    }
}
