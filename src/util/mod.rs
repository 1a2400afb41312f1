//! Small conversions shared by the display and clock drivers.

pub mod bcd;
pub mod numfmt;
