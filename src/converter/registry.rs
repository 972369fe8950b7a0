//! The converter registry: priority-ordered lookup with a fallback.
//!
//! Converters are registered with a priority (lower first, insertion order
//! among equals). Registering a converter that is already present moves it to
//! the end of its priority class. Lookups walk a cached ordered snapshot; every
//! registration drops the snapshot and the next lookup rebuilds it.
//!
//! ```text
//!  Unpopulated --add--> Populated --lookup--> Ordered
//!                          ^                     |
//!                          +--------add----------+
//! ```
//!
//! # Examples
//!
//! ```rust
//! use http_wire::{converter::TargetType, converters, ConverterRegistry, MediaType, RegistryState};
//!
//! let registry = ConverterRegistry::builder()
//!     .converter(converters::text())
//!     .fallback(converters::bytes())
//!     .build();
//! assert_eq!(registry.state(), RegistryState::Populated);
//!
//! let string = TargetType::of::<String>();
//! let found = registry.find_readable(&string, Some(&MediaType::TEXT_PLAIN)).unwrap();
//! assert_eq!(found.name(), "text");
//! assert_eq!(registry.state(), RegistryState::Ordered);
//!
//! // nothing reads u32, so the fallback answers
//! let found = registry.find_readable(&TargetType::of::<u32>(), None).unwrap();
//! assert_eq!(found.name(), "bytes");
//! ```

use core::any::Any;

use alloc::{string::String, sync::Arc, vec, vec::Vec};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use super::{describe, AnyConverter, InputMessage, OutputMessage, TargetType};
use crate::{
    error::{Direction, NoConverterError},
    HeaderMapExt, MediaType, Result,
};

/// A converter together with the priority it was registered with.
#[derive(Debug, Clone)]
pub struct ConverterEntry {
    converter: AnyConverter,
    priority: i32,
}

impl ConverterEntry {
    /// An entry using the converter's own [`order`](super::MessageConverter::order).
    pub fn new(converter: impl Into<AnyConverter>) -> Self {
        let converter = converter.into();
        let priority = converter.order();
        Self {
            converter,
            priority,
        }
    }

    /// An entry with an explicit priority.
    pub fn with_priority(converter: impl Into<AnyConverter>, priority: i32) -> Self {
        Self {
            converter: converter.into(),
            priority,
        }
    }

    /// The converter.
    pub fn converter(&self) -> &AnyConverter {
        &self.converter
    }

    /// The priority; lower values are consulted first.
    pub fn priority(&self) -> i32 {
        self.priority
    }
}

/// Lifecycle of a [`ConverterRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    /// No converter registered yet.
    Unpopulated,
    /// Converters registered, ordering not computed since the last change.
    Populated,
    /// The ordered snapshot is cached.
    Ordered,
}

/// Priority-ordered collection of converters with an optional fallback.
///
/// All methods take `&self`; the registry can be shared between threads and
/// populated while lookups run. Lookups see either the converters before or
/// after a concurrent registration, never a partial list.
pub struct ConverterRegistry {
    entries: Mutex<Vec<ConverterEntry>>,
    ordered: ArcSwapOption<Vec<AnyConverter>>,
    fallback: Option<AnyConverter>,
}

impl core::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("entries", &*self.entries.lock())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterRegistry {
    /// An empty registry without fallback.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            ordered: ArcSwapOption::empty(),
            fallback: None,
        }
    }

    /// An empty registry that answers every failed lookup with `fallback`.
    pub fn with_fallback(fallback: impl Into<AnyConverter>) -> Self {
        Self {
            fallback: Some(fallback.into()),
            ..Self::new()
        }
    }

    /// Starts a [`RegistryBuilder`].
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registers a converter with its own [`order`](super::MessageConverter::order).
    pub fn add(&self, converter: impl Into<AnyConverter>) {
        self.add_entry(ConverterEntry::new(converter));
    }

    /// Registers a converter with an explicit priority.
    pub fn add_with_priority(&self, converter: impl Into<AnyConverter>, priority: i32) {
        self.add_entry(ConverterEntry::with_priority(converter, priority));
    }

    /// Registers an entry.
    ///
    /// An entry whose converter is the [same](AnyConverter::same_as) as an
    /// already registered one replaces it and moves to the end of the
    /// insertion order.
    pub fn add_entry(&self, entry: ConverterEntry) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|existing| !existing.converter.same_as(&entry.converter));
        tracing::debug!(
            converter = entry.converter.name(),
            priority = entry.priority,
            replaced = before != entries.len(),
            "registered message converter"
        );
        entries.push(entry);
        self.ordered.store(None);
    }

    /// Number of registered converters, fallback excluded.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no converter is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// The fallback converter, if any.
    pub fn fallback(&self) -> Option<&AnyConverter> {
        self.fallback.as_ref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistryState {
        let entries = self.entries.lock();
        if entries.is_empty() {
            RegistryState::Unpopulated
        } else if self.ordered.load().is_some() {
            RegistryState::Ordered
        } else {
            RegistryState::Populated
        }
    }

    /// The registered converters, sorted by priority and then insertion
    /// order. Computed once per change and shared afterwards.
    pub fn ordered(&self) -> Arc<Vec<AnyConverter>> {
        if let Some(ordered) = self.ordered.load_full() {
            return ordered;
        }
        let entries = self.entries.lock();
        // another thread may have rebuilt it while we waited for the lock
        if let Some(ordered) = self.ordered.load_full() {
            return ordered;
        }
        let mut sorted: Vec<&ConverterEntry> = entries.iter().collect();
        sorted.sort_by_key(|entry| entry.priority);
        let ordered: Arc<Vec<AnyConverter>> =
            Arc::new(sorted.into_iter().map(|entry| entry.converter.clone()).collect());
        tracing::trace!(converters = ordered.len(), "ordered message converters");
        self.ordered.store(Some(Arc::clone(&ordered)));
        ordered
    }

    /// The first converter that can read `target` from `media_type`, else the
    /// fallback.
    pub fn find_readable(
        &self,
        target: &TargetType,
        media_type: Option<&MediaType>,
    ) -> Option<AnyConverter> {
        let found = self
            .ordered()
            .iter()
            .find(|converter| converter.can_read(target, media_type))
            .cloned();
        found.or_else(|| self.use_fallback(Direction::Read, target, media_type))
    }

    /// The first converter that can write `target` as `media_type`, else the
    /// fallback.
    pub fn find_writable(
        &self,
        target: &TargetType,
        media_type: Option<&MediaType>,
    ) -> Option<AnyConverter> {
        let found = self
            .ordered()
            .iter()
            .find(|converter| converter.can_write(target, media_type))
            .cloned();
        found.or_else(|| self.use_fallback(Direction::Write, target, media_type))
    }

    fn use_fallback(
        &self,
        direction: Direction,
        target: &TargetType,
        media_type: Option<&MediaType>,
    ) -> Option<AnyConverter> {
        let fallback = self.fallback.clone();
        tracing::debug!(
            ?direction,
            target = target.name(),
            media_type = ?media_type.map(alloc::string::ToString::to_string),
            fallback = fallback.as_ref().map(AnyConverter::name),
            "no registered converter matched"
        );
        fallback
    }

    /// Picks a converter and a concrete content type for writing `target` to
    /// a client that sent `accept`.
    ///
    /// Accepted media types are tried by descending quality and specificity;
    /// for each, converters are tried in priority order. An empty `accept`
    /// means `*/*` and entries with `q=0` are never chosen. When nothing
    /// matches, the fallback is returned with its default content type.
    pub fn negotiate_writable(
        &self,
        target: &TargetType,
        accept: &[MediaType],
    ) -> Option<(AnyConverter, MediaType)> {
        let mut acceptable: Vec<MediaType> = if accept.is_empty() {
            vec![MediaType::ALL]
        } else {
            accept
                .iter()
                .filter(|media_type| media_type.quality() > 0.0)
                .cloned()
                .collect()
        };
        MediaType::sort_by_specificity_and_quality(&mut acceptable);

        let ordered = self.ordered();
        for accepted in &acceptable {
            for converter in ordered.iter() {
                if !converter.can_write(target, Some(accepted)) {
                    continue;
                }
                if let Some(content_type) = concrete_content_type(converter, target, accepted) {
                    tracing::trace!(
                        converter = converter.name(),
                        %content_type,
                        "negotiated response converter"
                    );
                    return Some((converter.clone(), content_type));
                }
            }
        }

        let fallback = self.use_fallback(Direction::Write, target, acceptable.first())?;
        let content_type = fallback
            .default_content_type(target)
            .unwrap_or(MediaType::APPLICATION_OCTET_STREAM);
        Some((fallback, content_type))
    }

    /// Reads a `T` from `message` with the first suitable converter.
    ///
    /// # Errors
    ///
    /// - [`HeaderError`](crate::HeaderError) (400) when `Content-Type` is malformed
    /// - [`NoConverterError`] (415) when neither a converter nor a fallback fits
    /// - [`ReadError`](crate::ReadError) (400) when the converter fails
    pub async fn read<T: Any + Send>(&self, message: &mut dyn InputMessage) -> Result<T> {
        let target = TargetType::of::<T>();
        let content_type = message.headers().content_type()?;
        let converter = self
            .find_readable(&target, content_type.as_ref())
            .ok_or_else(|| {
                NoConverterError::new(Direction::Read, target.name(), describe(content_type.as_ref()))
            })?;
        Ok(converter.read::<T>(message).await?)
    }

    /// Writes `value` into `message`, negotiating the content type against
    /// `accept`.
    ///
    /// # Errors
    ///
    /// - [`NoConverterError`] (406) when neither a converter nor a fallback fits
    /// - [`WriteError`](crate::WriteError) (500) when the converter fails
    pub async fn write<T: Any + Send + Sync>(
        &self,
        value: &T,
        accept: &[MediaType],
        message: &mut dyn OutputMessage,
    ) -> Result<()> {
        let target = TargetType::of::<T>();
        let (converter, content_type) =
            self.negotiate_writable(&target, accept).ok_or_else(|| {
                NoConverterError::new(Direction::Write, target.name(), join(accept))
            })?;
        converter.write(value, Some(&content_type), message).await?;
        Ok(())
    }
}

fn concrete_content_type(
    converter: &AnyConverter,
    target: &TargetType,
    accepted: &MediaType,
) -> Option<MediaType> {
    if accepted.is_concrete() {
        return Some(accepted.without_quality());
    }
    converter
        .default_content_type(target)
        .filter(|default| accepted.includes(default))
        .or_else(|| {
            converter
                .supported_media_types()
                .iter()
                .find(|supported| supported.is_concrete() && accepted.includes(supported))
                .cloned()
        })
}

fn join(media_types: &[MediaType]) -> Option<String> {
    if media_types.is_empty() {
        return None;
    }
    let parts: Vec<String> = media_types
        .iter()
        .map(alloc::string::ToString::to_string)
        .collect();
    Some(parts.join(", "))
}

/// Builder for [`ConverterRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<ConverterEntry>,
    fallback: Option<AnyConverter>,
}

impl RegistryBuilder {
    /// Registers a converter with its own order.
    pub fn converter(mut self, converter: impl Into<AnyConverter>) -> Self {
        self.entries.push(ConverterEntry::new(converter));
        self
    }

    /// Registers a converter with an explicit priority.
    pub fn converter_with_priority(
        mut self,
        converter: impl Into<AnyConverter>,
        priority: i32,
    ) -> Self {
        self.entries
            .push(ConverterEntry::with_priority(converter, priority));
        self
    }

    /// Sets the fallback converter.
    pub fn fallback(mut self, converter: impl Into<AnyConverter>) -> Self {
        self.fallback = Some(converter.into());
        self
    }

    /// Registers the [`bytes`](super::builtin::bytes) and
    /// [`text`](super::builtin::text) converters.
    pub fn defaults(self) -> Self {
        self.converter(super::builtin::text())
            .converter(super::builtin::bytes())
    }

    /// Builds the registry.
    pub fn build(self) -> ConverterRegistry {
        let registry = ConverterRegistry {
            fallback: self.fallback,
            ..ConverterRegistry::new()
        };
        for entry in self.entries {
            registry.add_entry(entry);
        }
        registry
    }
}
