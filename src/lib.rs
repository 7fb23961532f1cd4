//! # Line Stack
//!
//! A durable LIFO stack of strings backed by a single text file.
//!
//! ## Core Concepts
//!
//! - **Lines**: Each stored value is one `\n`-terminated line; order in the
//!   file is push order, newest last
//! - **Pop**: Scans backward from the end of the file for the last line and
//!   truncates it away, without reading the rest of the file
//! - **Locking**: One reader/writer lock per instance serializes calls from
//!   threads in the same process
//!
//! ## Example
//!
//! ```no_run
//! use linestack::LineStack;
//!
//! let stack = LineStack::open("./data/queue.txt")?;
//!
//! stack.push("Store this message for later")?;
//!
//! if let Some(line) = stack.pop()? {
//!     println!("Retrieved value: {}", line);
//! }
//! # Ok::<(), linestack::StackError>(())
//! ```

pub mod error;
pub mod scanner;
pub mod stack;

// Re-exports
pub use error::{Result, StackError};
pub use scanner::{find_last_line, LastLine};
pub use stack::{LineStack, StackConfig, ValuePolicy};

/// Byte that terminates every line in the backing file.
pub const DELIMITER: u8 = b'\n';
