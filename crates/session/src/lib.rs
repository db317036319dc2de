//! `SessionStore` implementations for the driver-support orchestrator.
//!
//! The default implementation keeps sessions in memory behind a per-
//! conversation-id lock so concurrent turns on different ids never contend,
//! while turns on the same id serialize (spec §4.5, §5). A durable store is
//! an allowed substitution behind the same trait; [`stub_durable`] shows the
//! shape such a store would take without actually wiring a network backend.

mod memory;
mod stub_durable;

pub use memory::InMemorySessionStore;
pub use stub_durable::StubDurableSessionStore;
