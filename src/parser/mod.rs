//! Parsing of command output into metric values.

mod number;

pub use number::{format_number, parse_number, ParseNumberError};
