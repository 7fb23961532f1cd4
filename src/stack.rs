//! The file-backed line stack.

use crate::error::{Result, StackError};
use crate::scanner::{self, LastLine};
use crate::DELIMITER;
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How `push` treats values containing the line delimiter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValuePolicy {
    /// Fail with [`StackError::InvalidValue`] before touching the file.
    #[default]
    Reject,
    /// Write the value as-is. The embedded delimiter splits it into
    /// separate lines on the next pop.
    Unchecked,
}

/// Stack configuration.
#[derive(Clone, Debug)]
pub struct StackConfig {
    /// Path of the backing file.
    pub path: PathBuf,

    /// Whether to create missing parent directories on open.
    pub create_if_missing: bool,

    /// Bytes read per step when scanning backward for the last line.
    pub scan_chunk_size: usize,

    /// Handling of values containing the delimiter.
    pub value_policy: ValuePolicy,

    /// Sync the file to disk after every push and pop.
    pub sync_on_write: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./stack.txt"),
            create_if_missing: true,
            scan_chunk_size: 4096,
            value_policy: ValuePolicy::Reject,
            sync_on_write: false,
        }
    }
}

/// A LIFO stack of strings stored one per line in a text file.
///
/// The file is the only state: nothing is cached in memory, and every
/// operation opens the file, does its work, and closes it again. Calls on the
/// same instance are serialized by an internal lock, so a `LineStack` can be
/// shared between threads behind an `Arc`. Other processes writing the same
/// file are not coordinated with.
pub struct LineStack {
    config: StackConfig,

    /// Held exclusively by push and pop, shared by the read-only scans.
    lock: RwLock<()>,
}

impl LineStack {
    /// Open a stack at `path` with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(StackConfig {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        })
    }

    /// Open a stack with a custom configuration.
    ///
    /// Creates the parent directory if needed. The file itself is created by
    /// the first push.
    pub fn open_with_config(config: StackConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if !config.create_if_missing {
                    return Err(StackError::MissingDirectory(parent.to_path_buf()));
                }
                fs::create_dir_all(parent)?;
                debug!(dir = %parent.display(), "created stack directory");
            }
        }

        debug!(path = %config.path.display(), "opened line stack");

        Ok(Self {
            config,
            lock: RwLock::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Active configuration.
    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    // --- Mutating Operations ---

    /// Push a string onto the stack.
    pub fn push(&self, value: &str) -> Result<()> {
        self.push_bytes(value.as_bytes())
    }

    /// Push raw bytes onto the stack.
    ///
    /// The file grows by `value.len() + 1` bytes.
    pub fn push_bytes(&self, value: &[u8]) -> Result<()> {
        if let Some(position) = value.iter().position(|&b| b == DELIMITER) {
            match self.config.value_policy {
                ValuePolicy::Reject => return Err(StackError::InvalidValue { position }),
                ValuePolicy::Unchecked => {
                    warn!(position, "pushing value containing line delimiter")
                }
            }
        }

        let _lock = self.lock.write();

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.config.path)?;

        let mut line = Vec::with_capacity(value.len() + 1);
        line.extend_from_slice(value);
        line.push(DELIMITER);
        file.write_all(&line)?;

        if self.config.sync_on_write {
            file.sync_all()?;
        }

        debug!(bytes = line.len(), "pushed line");
        Ok(())
    }

    /// Pop the most recently pushed string.
    ///
    /// Returns `None` when the stack is empty, including when the backing file
    /// has not been created yet. A line that is not valid UTF-8 fails with
    /// [`StackError::InvalidUtf8`] and is left in place.
    pub fn pop(&self) -> Result<Option<String>> {
        self.pop_with(|value| Ok(String::from_utf8(value)?))
    }

    /// Pop the most recently pushed line as raw bytes.
    pub fn pop_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.pop_with(Ok)
    }

    /// Scan for the last line, convert it, then truncate. Truncation happens
    /// only after the scan and conversion have both succeeded.
    fn pop_with<T>(&self, convert: impl FnOnce(Vec<u8>) -> Result<T>) -> Result<Option<T>> {
        let _lock = self.lock.write();

        let mut file = match OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.config.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let Some((size, LastLine { value, start })) = self.last_line(&mut file)? else {
            return Ok(None);
        };
        let removed = size - start;
        let out = convert(value)?;

        file.set_len(start)?;
        if self.config.sync_on_write {
            file.sync_all()?;
        }

        debug!(removed, remaining = start, "popped line");
        Ok(Some(out))
    }

    // --- Read-only Operations ---

    /// Return the string the next pop would return, without removing it.
    pub fn peek(&self) -> Result<Option<String>> {
        match self.peek_bytes()? {
            Some(value) => Ok(Some(String::from_utf8(value)?)),
            None => Ok(None),
        }
    }

    /// Return the bytes the next pop would return, without removing them.
    pub fn peek_bytes(&self) -> Result<Option<Vec<u8>>> {
        let _lock = self.lock.read();

        let Some(mut file) = self.open_for_read()? else {
            return Ok(None);
        };
        Ok(self.last_line(&mut file)?.map(|(_, line)| line.value))
    }

    /// Whether the stack holds no lines.
    pub fn is_empty(&self) -> Result<bool> {
        let _lock = self.lock.read();

        match fs::metadata(&self.config.path) {
            Ok(metadata) => Ok(metadata.len() == 0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of lines in the stack. Reads the whole file.
    pub fn len(&self) -> Result<usize> {
        let mut count = 0;
        self.for_each_line(|_| {
            count += 1;
            false
        })?;
        Ok(count)
    }

    /// Whether any line equals `value`. Reads the file until a match.
    pub fn contains(&self, value: &str) -> Result<bool> {
        let needle = value.as_bytes();
        let mut found = false;
        self.for_each_line(|line| {
            found = line == needle;
            found
        })?;
        Ok(found)
    }

    /// All values, oldest first. Reads the whole file.
    pub fn lines(&self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut invalid = None;
        self.for_each_line(|line| match String::from_utf8(line.to_vec()) {
            Ok(s) => {
                lines.push(s);
                false
            }
            Err(e) => {
                invalid = Some(e);
                true
            }
        })?;

        match invalid {
            Some(e) => Err(e.into()),
            None => Ok(lines),
        }
    }

    // --- Helpers ---

    fn open_for_read(&self) -> Result<Option<File>> {
        match File::open(&self.config.path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// File size and last line, or `None` for an empty file.
    fn last_line(&self, file: &mut File) -> Result<Option<(u64, LastLine)>> {
        let size = file.metadata()?.len();
        if size == 0 {
            return Ok(None);
        }
        let line = scanner::find_last_line(file, size, self.config.scan_chunk_size)?;
        Ok(Some((size, line)))
    }

    /// Visit each line oldest first, under the shared lock. The visitor
    /// returns `true` to stop early.
    fn for_each_line(&self, mut visit: impl FnMut(&[u8]) -> bool) -> Result<()> {
        let _lock = self.lock.read();

        let Some(file) = self.open_for_read()? else {
            return Ok(());
        };
        let mut reader = BufReader::new(file);
        let mut line = Vec::new();

        loop {
            line.clear();
            if reader.read_until(DELIMITER, &mut line)? == 0 {
                return Ok(());
            }
            if line.last() == Some(&DELIMITER) {
                line.pop();
            }
            if visit(&line) {
                return Ok(());
            }
        }
    }
}
