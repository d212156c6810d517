mod token;
pub use token::{Token, TokenStream};

mod parser;
pub use parser::Lexer;

pub mod encodings;
pub use encodings::cmap::{CMap, CidSystemInfo, Code, Codes, CodespaceRange, WritingMode};

mod cmap_builder;
pub use cmap_builder::{CMapBuilder, Destination};

mod cmap_metadata;
mod cmap_parser;
mod cmap_section;
pub use cmap_parser::parse;

mod error;
pub use error::{Error, Result};
