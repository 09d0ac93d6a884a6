//! Segment registry: decoders for wire tags the built-in sum type does not
//! cover.
//!
//! Collaborators register a decoder per tag before the registry is shared.
//! Once wrapped in an `Arc` (by a [`Dispatcher`](crate::Dispatcher) or by
//! [`install_registry`]) it is read-only.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{DecodeError, RegistryError};
use crate::segments::{MessageSegment, is_builtin_tag};

/// Decoder for one extension tag. Receives the segment's `data` map.
pub type SegmentDecoder =
    Arc<dyn Fn(&Map<String, Value>) -> Result<Arc<dyn MessageSegment>, DecodeError> + Send + Sync>;

/// Maps extension wire tags to their decoders.
#[derive(Clone, Default)]
pub struct SegmentRegistry {
    decoders: HashMap<String, SegmentDecoder>,
}

impl SegmentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder for a new tag.
    ///
    /// Rejects tags that already have a decoder and tags owned by a built-in
    /// variant. Use [`replace`](Self::replace) to override deliberately.
    pub fn register<F>(&mut self, tag: impl Into<String>, decoder: F) -> Result<(), RegistryError>
    where
        F: Fn(&Map<String, Value>) -> Result<Arc<dyn MessageSegment>, DecodeError>
            + Send
            + Sync
            + 'static,
    {
        let tag = tag.into();
        if is_builtin_tag(&tag) {
            return Err(RegistryError::Reserved(tag));
        }
        if self.decoders.contains_key(&tag) {
            return Err(RegistryError::Duplicate(tag));
        }
        debug!(tag = %tag, "segment decoder registered");
        let _ = self.decoders.insert(tag, Arc::new(decoder));
        Ok(())
    }

    /// Install a decoder, returning the one it displaced.
    pub fn replace<F>(
        &mut self,
        tag: impl Into<String>,
        decoder: F,
    ) -> Result<Option<SegmentDecoder>, RegistryError>
    where
        F: Fn(&Map<String, Value>) -> Result<Arc<dyn MessageSegment>, DecodeError>
            + Send
            + Sync
            + 'static,
    {
        let tag = tag.into();
        if is_builtin_tag(&tag) {
            return Err(RegistryError::Reserved(tag));
        }
        let previous = self.decoders.insert(tag.clone(), Arc::new(decoder));
        debug!(tag = %tag, replaced = previous.is_some(), "segment decoder replaced");
        Ok(previous)
    }

    /// Look up the decoder for a tag.
    pub fn get(&self, tag: &str) -> Option<&SegmentDecoder> {
        self.decoders.get(tag)
    }

    /// Whether a decoder is registered for the tag.
    pub fn contains(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// Registered tags, sorted alphabetically.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Number of registered decoders.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

impl fmt::Debug for SegmentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Process-wide registry
// ─────────────────────────────────────────────────────────────────────────────

static GLOBAL_REGISTRY: OnceLock<Arc<SegmentRegistry>> = OnceLock::new();

/// Install the process-wide registry used by [`Dispatcher::global`](crate::Dispatcher::global).
///
/// Fails once a registry was installed or the default one was already read.
pub fn install_registry(registry: SegmentRegistry) -> Result<(), RegistryError> {
    let tags = registry.len();
    GLOBAL_REGISTRY
        .set(Arc::new(registry))
        .map_err(|_| RegistryError::AlreadyInstalled)?;
    debug!(tags, "global segment registry installed");
    Ok(())
}

/// The process-wide registry (empty unless one was installed first).
pub fn global_registry() -> Arc<SegmentRegistry> {
    Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(SegmentRegistry::new())))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
