//! The handler registry: opaque handles to live caller objects.
//!
//! Transports identify handlers by opaque handles with no type
//! information. The registry is the single source of truth mapping a
//! handle back to a live handler; a handle that has been unregistered
//! never resolves again. The four roles keep independent namespaces, so
//! handles cannot collide across roles.

use crate::handler::{OutputHandler, ProgressHandler, ResolveHandler, SsoHandler};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// An opaque handle naming one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One role's handle table.
struct RoleTable<H: ?Sized> {
    entries: Mutex<HashMap<u64, Arc<H>>>,
}

impl<H: ?Sized> RoleTable<H> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn register(&self, id: HandleId, handler: Arc<H>) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.0, handler);
    }

    fn lookup(&self, id: HandleId) -> Option<Arc<H>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id.0)
            .cloned()
    }

    fn unregister(&self, id: HandleId) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id.0)
            .is_some()
    }
}

/// Process-wide registry of caller-supplied handlers, one namespace per
/// role. Handles come from an arena counter, never from addresses.
pub struct HandlerRegistry {
    next: AtomicU64,
    output: RoleTable<dyn OutputHandler>,
    progress: RoleTable<dyn ProgressHandler>,
    resolve: RoleTable<dyn ResolveHandler>,
    sso: RoleTable<dyn SsoHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            output: RoleTable::new(),
            progress: RoleTable::new(),
            resolve: RoleTable::new(),
            sso: RoleTable::new(),
        }
    }

    /// The process-wide shared registry, created on first use.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<HandlerRegistry>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new())))
    }

    fn next_id(&self) -> HandleId {
        HandleId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    pub fn register_output(&self, handler: Arc<dyn OutputHandler>) -> HandleId {
        let id = self.next_id();
        self.output.register(id, handler);
        id
    }

    pub fn output(&self, id: HandleId) -> Option<Arc<dyn OutputHandler>> {
        self.output.lookup(id)
    }

    pub fn unregister_output(&self, id: HandleId) -> bool {
        self.output.unregister(id)
    }

    pub fn register_progress(&self, handler: Arc<dyn ProgressHandler>) -> HandleId {
        let id = self.next_id();
        self.progress.register(id, handler);
        id
    }

    pub fn progress(&self, id: HandleId) -> Option<Arc<dyn ProgressHandler>> {
        self.progress.lookup(id)
    }

    pub fn unregister_progress(&self, id: HandleId) -> bool {
        self.progress.unregister(id)
    }

    pub fn register_resolve(&self, handler: Arc<dyn ResolveHandler>) -> HandleId {
        let id = self.next_id();
        self.resolve.register(id, handler);
        id
    }

    pub fn resolve(&self, id: HandleId) -> Option<Arc<dyn ResolveHandler>> {
        self.resolve.lookup(id)
    }

    pub fn unregister_resolve(&self, id: HandleId) -> bool {
        self.resolve.unregister(id)
    }

    pub fn register_sso(&self, handler: Arc<dyn SsoHandler>) -> HandleId {
        let id = self.next_id();
        self.sso.register(id, handler);
        id
    }

    pub fn sso(&self, id: HandleId) -> Option<Arc<dyn SsoHandler>> {
        self.sso.lookup(id)
    }

    pub fn unregister_sso(&self, id: HandleId) -> bool {
        self.sso.unregister(id)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
