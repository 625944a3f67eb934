//! Generic status-synchronization registry.
//!
//! The TCP reader hands every status line here as `(type token, message)`.
//! The registry routes the message to the handler registered for that token;
//! handlers own keyed collections of typed objects and apply add / update /
//! remove transitions:
//!
//! - **Add**: id absent and the message is not a removal -- construct a
//!   default object, insert, then apply properties.
//! - **Update**: id present -- apply properties to the existing object in
//!   place. The object is never replaced, so snapshots taken before and
//!   after an update describe the same instance.
//! - **Remove**: message carries the type's removal marker -- delete the id;
//!   no properties are applied.
//!
//! Handlers are registered by token, so a new object type is one
//! [`StatusRegistry::register`] call away; nothing central changes.
//! Each collection carries its own lock; the TCP reader is the only writer
//! and status application is O(1) amortized per line.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::objects::{
    Amplifier, Interlock, Meter, Panadapter, RadioObject, Slice, StaticObject, Tnf, Transmit,
    Wan, Waterfall,
};

/// A registered recipient for one status type token.
pub trait StatusHandler: Send + Sync {
    /// Apply one status message (type token already stripped).
    fn handle_status(&self, message: &str);

    /// Drop all state, used at disconnect.
    fn clear(&self);
}

// ---------------------------------------------------------------------------
// Keyed collections
// ---------------------------------------------------------------------------

/// A keyed collection of one [`RadioObject`] type.
///
/// Updates mutate the stored object in place; readers take clones or run
/// closures under the read lock.
pub struct StatusCollection<T: RadioObject> {
    objects: RwLock<HashMap<T::Id, T>>,
}

impl<T: RadioObject> StatusCollection<T> {
    pub fn new() -> Arc<StatusCollection<T>> {
        Arc::new(StatusCollection {
            objects: RwLock::new(HashMap::new()),
        })
    }

    /// Snapshot one object by id.
    pub fn get(&self, id: &T::Id) -> Option<T>
    where
        T: Clone,
    {
        self.objects.read().unwrap().get(id).cloned()
    }

    /// Run a closure against one object under the read lock.
    pub fn with<R>(&self, id: &T::Id, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.objects.read().unwrap().get(id).map(f)
    }

    /// Run a closure against one object under the write lock.
    pub fn with_mut<R>(&self, id: &T::Id, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.objects.write().unwrap().get_mut(id).map(f)
    }

    /// All current ids.
    pub fn ids(&self) -> Vec<T::Id> {
        self.objects.read().unwrap().keys().cloned().collect()
    }

    /// Snapshot the whole collection.
    pub fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.objects.read().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().unwrap().is_empty()
    }

    /// Apply one status message: the add/update/remove transition.
    pub fn apply_status(&self, message: &str) {
        if T::is_removal(message) {
            // Removal lines still lead with the id; nothing else is applied.
            let Some(id) = message
                .split_whitespace()
                .next()
                .and_then(T::parse_id)
                .or_else(|| T::parse_status(message).map(|(id, _)| id))
            else {
                tracing::warn!(
                    kind = T::TYPE_NAME,
                    message = %message,
                    "status removal without parseable id"
                );
                return;
            };
            if self.objects.write().unwrap().remove(&id).is_some() {
                tracing::debug!(kind = T::TYPE_NAME, id = ?id, "removed");
            }
            return;
        }

        let Some((id, properties)) = T::parse_status(message) else {
            tracing::warn!(
                kind = T::TYPE_NAME,
                message = %message,
                "status without parseable id"
            );
            return;
        };

        let mut objects = self.objects.write().unwrap();
        let object = objects.entry(id.clone()).or_insert_with(|| {
            tracing::debug!(kind = T::TYPE_NAME, id = ?id, "added");
            T::new(id.clone())
        });

        let was_initialized = object.initialized();
        object.apply(&properties);
        if !was_initialized && object.initialized() {
            tracing::debug!(kind = T::TYPE_NAME, id = ?id, "initialized");
        }
    }
}

impl<T: RadioObject> StatusHandler for StatusCollection<T> {
    fn handle_status(&self, message: &str) {
        self.apply_status(message);
    }

    fn clear(&self) {
        self.objects.write().unwrap().clear();
    }
}

impl StatusCollection<Meter> {
    /// Apply a raw streamed meter reading from the UDP meter stream.
    pub fn apply_reading(&self, id: u32, raw: i16) {
        if let Some(meter) = self.objects.write().unwrap().get_mut(&id) {
            meter.apply_raw(raw);
        }
        // Readings for unlisted meters are normal right after subscribe;
        // the meter list catches up over TCP.
    }
}

// ---------------------------------------------------------------------------
// Singletons
// ---------------------------------------------------------------------------

/// Holder for a [`StaticObject`] singleton (transmit, interlock, wan).
pub struct Singleton<T: StaticObject> {
    object: RwLock<T>,
}

impl<T: StaticObject> Singleton<T> {
    pub fn new() -> Arc<Singleton<T>> {
        Arc::new(Singleton {
            object: RwLock::new(T::default()),
        })
    }

    /// Snapshot the current state.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.object.read().unwrap().clone()
    }
}

impl<T: StaticObject> StatusHandler for Singleton<T> {
    fn handle_status(&self, message: &str) {
        let properties = flex6k_proto::key_values(message, T::delimiter());
        self.object.write().unwrap().apply(&properties);
    }

    fn clear(&self) {
        *self.object.write().unwrap() = T::default();
    }
}

// ---------------------------------------------------------------------------
// Display pre-processor
// ---------------------------------------------------------------------------

/// Routes `display pan ...` / `display waterfall ...` into the panadapter
/// and waterfall collections.
struct DisplayHandler {
    panadapters: Arc<StatusCollection<Panadapter>>,
    waterfalls: Arc<StatusCollection<Waterfall>>,
}

impl StatusHandler for DisplayHandler {
    fn handle_status(&self, message: &str) {
        let message = message.trim();
        let (kind, rest) = match message.find(' ') {
            Some(space) => (&message[..space], message[space + 1..].trim_start()),
            None => (message, ""),
        };
        match kind {
            "pan" | "panadapter" => self.panadapters.apply_status(rest),
            "waterfall" => self.waterfalls.apply_status(rest),
            other => {
                tracing::warn!(kind = %other, "display status for unknown kind");
            }
        }
    }

    fn clear(&self) {
        // The registry clears the underlying collections directly.
    }
}

// ---------------------------------------------------------------------------
// The registry
// ---------------------------------------------------------------------------

/// Token-keyed router for status messages, holding the per-type collections.
pub struct StatusRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn StatusHandler>>>,

    pub slices: Arc<StatusCollection<Slice>>,
    pub panadapters: Arc<StatusCollection<Panadapter>>,
    pub waterfalls: Arc<StatusCollection<Waterfall>>,
    pub meters: Arc<StatusCollection<Meter>>,
    pub amplifiers: Arc<StatusCollection<Amplifier>>,
    pub tnfs: Arc<StatusCollection<Tnf>>,

    pub transmit: Arc<Singleton<Transmit>>,
    pub interlock: Arc<Singleton<Interlock>>,
    pub wan: Arc<Singleton<Wan>>,
}

impl StatusRegistry {
    pub fn new() -> Arc<StatusRegistry> {
        let slices = StatusCollection::<Slice>::new();
        let panadapters = StatusCollection::<Panadapter>::new();
        let waterfalls = StatusCollection::<Waterfall>::new();
        let meters = StatusCollection::<Meter>::new();
        let amplifiers = StatusCollection::<Amplifier>::new();
        let tnfs = StatusCollection::<Tnf>::new();
        let transmit = Singleton::<Transmit>::new();
        let interlock = Singleton::<Interlock>::new();
        let wan = Singleton::<Wan>::new();

        let registry = StatusRegistry {
            handlers: RwLock::new(HashMap::new()),
            slices: slices.clone(),
            panadapters: panadapters.clone(),
            waterfalls: waterfalls.clone(),
            meters: meters.clone(),
            amplifiers: amplifiers.clone(),
            tnfs: tnfs.clone(),
            transmit: transmit.clone(),
            interlock: interlock.clone(),
            wan: wan.clone(),
        };

        registry.register("slice", slices);
        registry.register("meter", meters);
        registry.register("amplifier", amplifiers);
        registry.register("tnf", tnfs);
        registry.register(
            "display",
            Arc::new(DisplayHandler {
                panadapters: panadapters.clone(),
                waterfalls: waterfalls.clone(),
            }),
        );
        registry.register("transmit", transmit);
        registry.register("interlock", interlock);
        registry.register("wan", wan);

        Arc::new(registry)
    }

    /// Register (or replace) the handler for a status type token.
    pub fn register(&self, token: &str, handler: Arc<dyn StatusHandler>) {
        self.handlers
            .write()
            .unwrap()
            .insert(token.to_string(), handler);
    }

    /// Route one status message to its type's handler.
    ///
    /// Unknown tokens are logged and skipped; the radio grows new types
    /// faster than clients grow handlers.
    pub fn dispatch(&self, object: &str, message: &str) {
        let handler = self.handlers.read().unwrap().get(object).cloned();
        match handler {
            Some(handler) => handler.handle_status(message),
            None => {
                tracing::warn!(token = %object, "unknown status token");
            }
        }
    }

    /// Drop every object; used at disconnect.
    pub fn clear_all(&self) {
        for handler in self.handlers.read().unwrap().values() {
            handler.clear();
        }
        self.panadapters.clear();
        self.waterfalls.clear();
        tracing::debug!("registry cleared");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
