//! Audit domain module - append-only payment audit trail.

mod entry;

pub use entry::{Actor, AuditAction, AuditDraft, AuditLogEntry, AuditMetadata, RequestContext};
