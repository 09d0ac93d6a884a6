//! # ncat-core
//!
//! Message segment type system, type registry and event dispatcher for
//! OneBot-style chat payloads.
//!
//! This crate provides the vocabulary every consumer of raw protocol events
//! depends on:
//!
//! - **Segments**: [`Segment`] sum type over text, mentions, faces, replies,
//!   media, opaque misc kinds, forwards and nodes, plus [`Unknown`] and
//!   collaborator-registered [`Extension`] arms
//! - **Events**: [`MessageEvent`] and [`MetaEvent`] envelopes behind [`Event`]
//! - **Registry**: [`SegmentRegistry`] for wire tags this crate does not know
//! - **Dispatcher**: [`Dispatcher`] turning raw payloads into typed event trees
//!   and reporting per-segment fallbacks
//! - **Wire ids**: [`WireId`] / [`WireInt`] coercions that remember how a value
//!   was spelled on the wire so encoding reproduces it
//! - **Errors**: the [`errors`] taxonomy via `thiserror`

#![deny(unsafe_code)]

pub mod dispatch;
pub mod errors;
pub mod event;
mod fields;
pub mod ids;
pub mod logging;
pub mod registry;
pub mod segments;

pub use dispatch::{
    DEFAULT_MAX_FORWARD_DEPTH, DecodeContext, Dispatcher, LineExtractor, ParseOptions, RawPayload,
    parse,
};
pub use errors::{
    DecodeError, DecodeReport, ExtractionError, ParseError, RegistryError, SegmentFallback,
    ShapeError, ValidationError,
};
pub use event::{Event, KindKey, MessageEvent, MetaEvent, Sender};
pub use ids::{WireId, WireInt};
pub use registry::{SegmentDecoder, SegmentRegistry, global_registry, install_registry};
pub use segments::{
    At, BUILTIN_TAGS, Extension, Face, Forward, Media, MediaKind, MessageSegment, Misc, MiscKind,
    Node, NodeContent, Reply, Resource, Segment, Text, Unknown, is_builtin_tag,
};
