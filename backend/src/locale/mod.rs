//! Locale parsers: raw cell values to canonical dates and numbers.

pub mod date;
pub mod number;

pub use date::{month_label, parse_date, parse_date_str, serial_to_datetime, DateFormat};
pub use number::{
    parse_number, parse_number_str, try_parse_number, try_parse_number_str, NumberFormat,
    ParsedNumber,
};
