//! # ncat-logline
//!
//! Log-line extraction for the ncat event parser.
//!
//! Bot frameworks log every received event as
//! `[time] LEVEL Component ctx | 收到事件: {...}`, where the payload is
//! either JSON or a single-quoted map literal that may elide long lists
//! with `...`. This crate turns those lines back into JSON maps:
//!
//! - [`split_line`]: header fields and message body of one line
//! - [`balanced_map_literal`]: the `{...}` slice, quote-aware
//! - [`parse_map_literal`]: JSON first, then the literal grammar
//! - [`LogLineExtractor`]: the [`ncat_core::LineExtractor`] implementation,
//!   plus [`LogLineExtractor::scan_events`] for whole log files

#![deny(unsafe_code)]

pub mod extract;
pub mod line;
pub mod literal;

pub use extract::{DEFAULT_EVENT_LABEL, LogLineExtractor, ScanEvents, ScannedEvent};
pub use line::{LogLine, split_line};
pub use literal::{MAX_NESTING, balanced_map_literal, parse_literal, parse_map_literal};
