//! Operation Registry: operation name → owning session
//!
//! Records keep their first discovery position. Re-registering a name
//! overwrites the record in place, so `names()` stays in discovery order
//! while the newest owner wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use super::error::BrokerError;
use crate::config::CollisionPolicy;
use crate::session::Session;
use crate::types::OperationSpec;

/// Runtime binding between a server name and its live session
pub struct SessionHandle {
    id: u64,
    server: String,
    session: Arc<dyn Session>,
    closed: AtomicBool,
}

impl SessionHandle {
    /// Create an open handle
    pub fn new(id: u64, server: impl Into<String>, session: Arc<dyn Session>) -> Self {
        Self {
            id,
            server: server.into(),
            session,
            closed: AtomicBool::new(false),
        }
    }

    /// Unique per broker, increases with every connection
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the server this session belongs to
    pub fn server(&self) -> &str {
        &self.server
    }

    /// The underlying session
    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Whether disconnect has marked this handle closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("server", &self.server)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// One registered operation
#[derive(Debug, Clone)]
pub struct OperationRecord {
    /// Registry key
    pub name: String,
    /// Name sent to the server. Differs from `name` only under
    /// `CollisionPolicy::Namespace`.
    pub remote_name: String,
    pub description: String,
    /// Opaque argument schema, validated by the server
    pub input_schema: Value,
    handle: Arc<SessionHandle>,
}

impl OperationRecord {
    /// Create a record routing `name` to `handle`
    pub fn new(name: impl Into<String>, spec: OperationSpec, handle: Arc<SessionHandle>) -> Self {
        Self {
            name: name.into(),
            remote_name: spec.name,
            description: spec.description,
            input_schema: spec.input_schema,
            handle,
        }
    }

    /// Name of the server that owns this operation
    pub fn server(&self) -> &str {
        self.handle.server()
    }

    /// Session handle that serves this operation
    pub fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }
}

/// Ordered operation registry
#[derive(Debug, Default)]
pub struct OperationRegistry {
    records: Vec<OperationRecord>,
    index: HashMap<String, usize>,
}

impl OperationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a record. Returns the replaced record, if any.
    pub fn insert(&mut self, record: OperationRecord) -> Option<OperationRecord> {
        match self.index.get(&record.name) {
            Some(&pos) => Some(std::mem::replace(&mut self.records[pos], record)),
            None => {
                self.index.insert(record.name.clone(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    /// Merge one server's advertised operations according to `policy`.
    ///
    /// Returns the names that were registered and, under
    /// `CollisionPolicy::Reject`, one `NameCollision` per skipped operation.
    pub fn merge(
        &mut self,
        handle: &Arc<SessionHandle>,
        specs: Vec<OperationSpec>,
        policy: CollisionPolicy,
    ) -> (Vec<String>, Vec<BrokerError>) {
        let mut registered = Vec::with_capacity(specs.len());
        let mut collisions = Vec::new();

        for spec in specs {
            let key = match policy {
                CollisionPolicy::Namespace => format!("{}/{}", handle.server(), spec.name),
                CollisionPolicy::LastWriteWins | CollisionPolicy::Reject => spec.name.clone(),
            };

            if policy == CollisionPolicy::Reject {
                if let Some(existing) = self.get(&key) {
                    if existing.server() != handle.server() {
                        collisions.push(BrokerError::NameCollision {
                            operation: key,
                            existing: existing.server().to_string(),
                            server: handle.server().to_string(),
                        });
                        continue;
                    }
                }
            }

            self.insert(OperationRecord::new(key.clone(), spec, handle.clone()));
            registered.push(key);
        }

        (registered, collisions)
    }

    /// Look up a record by registered name
    pub fn get(&self, name: &str) -> Option<&OperationRecord> {
        self.index.get(name).map(|&pos| &self.records[pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Operation names in discovery order
    pub fn names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.name.clone()).collect()
    }

    /// All records in discovery order
    pub fn records(&self) -> &[OperationRecord] {
        &self.records
    }

    /// Records owned by `server`
    pub fn operations_for_server(&self, server: &str) -> Vec<&OperationRecord> {
        self.records.iter().filter(|r| r.server() == server).collect()
    }

    /// Remove every record owned by `server`. Returns the removed records.
    pub fn remove_server(&mut self, server: &str) -> Vec<OperationRecord> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| r.server() == server);
        self.records = kept;
        self.reindex();
        removed
    }

    /// Remove everything. Returns the removed records in discovery order.
    pub fn clear(&mut self) -> Vec<OperationRecord> {
        self.index.clear();
        std::mem::take(&mut self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn reindex(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.name.clone(), pos))
            .collect();
    }
}
