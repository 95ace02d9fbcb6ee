//! Generic RouterOS export parsing and writing primitives used by higher-level tools.

pub mod parser;
pub mod tokens;
pub mod tree;
pub mod writer;

pub use parser::{parse, parse_bytes, parse_file, ParseError};
pub use tree::{fold_continuations, Classification, ConfigDocument, ConfigLine, ConfigSection};
pub use writer::{write, write_file, WriteError};
