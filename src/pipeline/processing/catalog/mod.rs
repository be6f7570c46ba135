// Catalog persistence: natural keys, typed upserts and the per-record resolver

pub mod changes;
pub mod keys;
pub mod resolver;
pub mod upsert;

pub use changes::{ChangeSet, FieldChange, Upsert};
pub use resolver::{ResolveSettings, ResolvedRecord, Resolver};
