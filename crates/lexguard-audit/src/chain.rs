//! SHA-256 hash chain over audit entries.
//!
//! `entry_hash = SHA256(prev_hash || len(field) || field || ...)` over the
//! canonical fields of the entry. Length prefixes keep adjacent fields from
//! bleeding into each other.

use chrono::{DateTime, Utc};
use lexguard_types::{HASH_LENGTH, Hash, LogId};
use sha2::{Digest, Sha256};

use crate::entry::{AuditLogEntry, AuditRecord};

fn update_field(hasher: &mut Sha256, field: &[u8]) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field);
}

pub(crate) fn compute_entry_hash(
    prev_hash: &Hash,
    id: LogId,
    timestamp: DateTime<Utc>,
    record: &AuditRecord,
) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(id.as_u64().to_le_bytes());
    update_field(&mut hasher, timestamp.to_rfc3339().as_bytes());
    update_field(&mut hasher, record.actor.id().as_bytes());
    update_field(&mut hasher, record.actor.role_label().as_bytes());
    update_field(&mut hasher, record.action_type.as_str().as_bytes());
    update_field(&mut hasher, record.target.target_type.as_str().as_bytes());
    update_field(&mut hasher, record.target.target_id.as_bytes());
    update_field(&mut hasher, record.details.as_bytes());
    update_field(
        &mut hasher,
        record.origin.ip_address.as_deref().unwrap_or("").as_bytes(),
    );
    update_field(
        &mut hasher,
        record.origin.session_id.as_deref().unwrap_or("").as_bytes(),
    );
    update_field(&mut hasher, record.outcome.kind().as_str().as_bytes());
    update_field(
        &mut hasher,
        record.outcome.reason().unwrap_or("").as_bytes(),
    );

    let mut bytes = [0u8; HASH_LENGTH];
    bytes.copy_from_slice(&hasher.finalize());
    Hash::from_bytes(bytes)
}

/// Recomputes the hash of a stored entry.
pub(crate) fn rehash(entry: &AuditLogEntry) -> Hash {
    let record = AuditRecord {
        actor: entry.actor.clone(),
        action_type: entry.action_type,
        target: entry.target.clone(),
        details: entry.details.clone(),
        origin: entry.origin.clone(),
        outcome: entry.outcome.clone(),
    };
    compute_entry_hash(&entry.prev_hash, entry.id, entry.timestamp, &record)
}
