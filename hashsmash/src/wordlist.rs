use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::errors::{CrackError, CrackResult};

const BUFFER_CAPACITY: usize = 65536;
// Lines this long or longer are skipped rather than buffered
const MAX_LINE_BYTES: usize = 8192;
const STREAM_LABEL: &str = "<stream>";

/// One wordlist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// The entry with surrounding whitespace removed
    pub text: String,
    /// 0-based position among the non-empty, decodable lines of the wordlist
    pub line_index: u64,
}

impl Candidate {
    pub fn new(text: impl Into<String>, line_index: u64) -> Self {
        Self {
            text: text.into(),
            line_index,
        }
    }
}

/// An ordered batch of candidates handed to a single worker
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position of this chunk in the stream, starting at 0
    pub index: u64,
    /// Candidates in file order
    pub candidates: Vec<Candidate>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn first_line_index(&self) -> Option<u64> {
        self.candidates.first().map(|c| c.line_index)
    }
}

/// Lazily streams candidates from a wordlist in fixed-size chunks.
///
/// Only one chunk is materialized per call, so memory use depends on the
/// batch size and never on the size of the wordlist. Lines that are not valid
/// UTF-8 or that reach `MAX_LINE_BYTES` are skipped and counted; blank lines
/// are dropped without taking a `line_index`.
#[derive(Debug)]
pub struct CandidateSource<R> {
    reader: R,
    path: PathBuf,
    batch_size: usize,
    buffer: Vec<u8>,
    next_line_index: u64,
    next_chunk_index: u64,
    physical_lines: u64,
    skipped_lines: u64,
    finished: bool,
}

impl CandidateSource<BufReader<File>> {
    /// Opens a wordlist file
    pub fn open(path: impl AsRef<Path>, batch_size: NonZeroUsize) -> CrackResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            debug!("Failed to open wordlist {}: {}", path.display(), e);
            CrackError::wordlist_not_found(path)
        })?;

        // Opening a directory succeeds on some platforms; reading it does not
        let metadata = file
            .metadata()
            .map_err(|_| CrackError::wordlist_not_found(path))?;
        if metadata.is_dir() {
            return Err(CrackError::wordlist_not_found(path));
        }

        debug!(
            "Opened wordlist {} ({} bytes)",
            path.display(),
            metadata.len()
        );
        let reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        Ok(Self::from_reader(reader, batch_size).with_path(path))
    }
}

impl<R: BufRead> CandidateSource<R> {
    /// Streams candidates from any buffered reader
    pub fn from_reader(reader: R, batch_size: NonZeroUsize) -> Self {
        Self {
            reader,
            path: PathBuf::from(STREAM_LABEL),
            batch_size: batch_size.get(),
            buffer: Vec::with_capacity(256),
            next_line_index: 0,
            next_chunk_index: 0,
            physical_lines: 0,
            skipped_lines: 0,
            finished: false,
        }
    }

    /// Sets the path reported in errors and log messages
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of lines skipped because they were not valid UTF-8
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines
    }

    /// Number of physical lines consumed so far, including skipped ones
    pub fn lines_read(&self) -> u64 {
        self.physical_lines
    }

    /// Number of candidates emitted so far
    pub fn candidates_emitted(&self) -> u64 {
        self.next_line_index
    }

    /// Reads the next chunk, or `None` once the wordlist is exhausted
    pub fn next_chunk(&mut self) -> CrackResult<Option<Chunk>> {
        if self.finished {
            return Ok(None);
        }

        let mut candidates = Vec::with_capacity(self.batch_size);
        while candidates.len() < self.batch_size {
            self.buffer.clear();
            let read = match (&mut self.reader)
                .take(MAX_LINE_BYTES as u64)
                .read_until(b'\n', &mut self.buffer)
            {
                Ok(read) => read,
                Err(e) => {
                    self.finished = true;
                    return Err(CrackError::wordlist_read_error(&self.path, e));
                }
            };
            if read == 0 {
                self.finished = true;
                break;
            }
            self.physical_lines += 1;

            if read == MAX_LINE_BYTES && self.buffer.last() != Some(&b'\n') {
                if let Err(e) = self.skip_rest_of_line() {
                    self.finished = true;
                    return Err(CrackError::wordlist_read_error(&self.path, e));
                }
                self.skipped_lines += 1;
                warn!(
                    "Skipping line {} in {}: longer than {} bytes",
                    self.physical_lines,
                    self.path.display(),
                    MAX_LINE_BYTES
                );
                continue;
            }

            let line = match std::str::from_utf8(&self.buffer) {
                Ok(line) => line,
                Err(e) => {
                    self.skipped_lines += 1;
                    warn!(
                        "Skipping undecodable line {} in {}: {}",
                        self.physical_lines,
                        self.path.display(),
                        e
                    );
                    continue;
                }
            };

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            candidates.push(Candidate::new(text, self.next_line_index));
            self.next_line_index += 1;
        }

        if candidates.is_empty() {
            return Ok(None);
        }

        let chunk = Chunk {
            index: self.next_chunk_index,
            candidates,
        };
        self.next_chunk_index += 1;
        trace!(
            "Read chunk {} with {} candidates",
            chunk.index,
            chunk.candidates.len()
        );
        Ok(Some(chunk))
    }

    /// Consumes input up to and including the next newline without keeping it
    fn skip_rest_of_line(&mut self) -> io::Result<()> {
        loop {
            let available = match self.reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.reader.consume(pos + 1);
                    return Ok(());
                }
                None => {
                    let len = available.len();
                    self.reader.consume(len);
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for CandidateSource<R> {
    type Item = CrackResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn batch(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn collect_texts<R: BufRead>(source: CandidateSource<R>) -> Vec<(String, u64)> {
        source
            .map(|chunk| chunk.unwrap())
            .flat_map(|chunk| chunk.candidates)
            .map(|c| (c.text, c.line_index))
            .collect()
    }

    #[test]
    fn test_strips_and_skips_blank_lines() {
        let data = "  alpha \r\n\n\t\nbeta\n   \ngamma";
        let source = CandidateSource::from_reader(Cursor::new(data), batch(10));
        assert_eq!(
            collect_texts(source),
            vec![
                ("alpha".to_string(), 0),
                ("beta".to_string(), 1),
                ("gamma".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut data = Vec::new();
        data.extend_from_slice(b"first\n");
        data.extend_from_slice(&[0xff, 0xfe, b'x', b'\n']);
        data.extend_from_slice(b"second\n");

        let mut source = CandidateSource::from_reader(Cursor::new(data), batch(10));
        let chunk = source.next_chunk().unwrap().unwrap();
        let texts: Vec<_> = chunk.candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(chunk.candidates[1].line_index, 1);
        assert_eq!(source.skipped_lines(), 1);
        assert_eq!(source.lines_read(), 3);
        assert!(source.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_chunk_boundaries_preserve_order() {
        let data: String = (0..25).map(|i| format!("word{}\n", i)).collect();
        let mut source = CandidateSource::from_reader(Cursor::new(data), batch(10));

        let mut sizes = Vec::new();
        let mut expected_line = 0;
        let mut expected_chunk = 0;
        while let Some(chunk) = source.next_chunk().unwrap() {
            assert_eq!(chunk.index, expected_chunk);
            expected_chunk += 1;
            for candidate in &chunk.candidates {
                assert_eq!(candidate.line_index, expected_line);
                assert_eq!(candidate.text, format!("word{}", expected_line));
                expected_line += 1;
            }
            sizes.push(chunk.len());
        }
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(source.candidates_emitted(), 25);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let err = CandidateSource::open(dir.path().join("nope.txt"), batch(4)).unwrap_err();
        assert!(matches!(err, CrackError::WordlistNotFound(_)));
    }

    #[test]
    fn test_open_directory_is_not_found() {
        let dir = tempdir().unwrap();
        let err = CandidateSource::open(dir.path(), batch(4)).unwrap_err();
        assert!(matches!(err, CrackError::WordlistNotFound(_)));
    }

    #[test]
    fn test_open_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("words.txt");
        std::fs::write(&path, "123456\npassword\nletmein\n").unwrap();

        let source = CandidateSource::open(&path, batch(2)).unwrap();
        assert_eq!(source.path(), path.as_path());
        let texts = collect_texts(source);
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[1], ("password".to_string(), 1));
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "device error",
                ));
            }
            self.served = true;
            let data = b"one\ntwo\n";
            buf[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }
    }

    #[test]
    fn test_read_error_is_fatal() {
        let reader = BufReader::new(FailingReader { served: false });
        let mut source = CandidateSource::from_reader(reader, batch(100));
        let err = source.next_chunk().unwrap_err();
        assert!(matches!(err, CrackError::WordlistReadError { .. }));
        // The source is fused after a failure
        assert!(source.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_overlong_line_is_skipped_without_buffering() {
        // 32 MiB with no newline, then ordinary lines
        let huge = io::repeat(b'a').take(32 * 1024 * 1024);
        let reader = BufReader::new(huge.chain(Cursor::new("\nafter\nlast\n")));
        let mut source = CandidateSource::from_reader(reader, batch(10));

        let chunk = source.next_chunk().unwrap().unwrap();
        let texts: Vec<_> = chunk.candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["after", "last"]);
        assert_eq!(chunk.candidates[0].line_index, 0);
        assert_eq!(source.skipped_lines(), 1);
        assert_eq!(source.lines_read(), 3);
        assert!(source.buffer.capacity() < 1024 * 1024);
        assert!(source.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_line_just_under_limit_is_kept() {
        let long = "x".repeat(MAX_LINE_BYTES - 1);
        let data = format!("{}\nshort\n", long);
        let source = CandidateSource::from_reader(Cursor::new(data), batch(10));
        let texts = collect_texts(source);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].0.len(), MAX_LINE_BYTES - 1);
    }
}
