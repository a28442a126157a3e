//! Core definitions (error taxonomy, result type and checked index arithmetic),
//! relied upon by all lazyseq-* crates.

pub mod error;
pub mod macros;
pub mod result;
pub mod size;

pub use error::{Error, ErrorKind};
pub use result::Result;
pub use size::Offset;
