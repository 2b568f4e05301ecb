//! # Snapshot Export
//!
//! A snapshot is the whole hackathon as one postcard stream, used for
//! backups and for moving between the `memory` and `redb` backends.
//!
//! Format:
//! ```text
//! [header_len: u32 LE] [SnapshotHeader (postcard)] [Snapshot (postcard)]
//! ```
//!
//! Records are written in ascending id order, so exporting the same state
//! twice yields identical bytes.

use crate::primitives::{MAX_IMPORT_RECORDS, MAX_SNAPSHOT_SIZE, SNAPSHOT_MAGIC, SNAPSHOT_VERSION};
use crate::store::Change;
use crate::system::Stage;
use crate::{
    Hackathon, IdKind, Idea, Join, Reaction, Submission, Team, User, VisionSprintError, Vote,
};
use serde::{Deserialize, Serialize};

/// Header preceding the snapshot payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub users: u64,
    pub ideas: u64,
    pub votes: u64,
    pub joins: u64,
    pub teams: u64,
    pub submissions: u64,
    pub reactions: u64,
    pub next_ids: IdCounters,
    /// [`snapshot_checksum`] of the payload bytes.
    pub checksum: u64,
}

impl SnapshotHeader {
    fn for_snapshot(snapshot: &Snapshot, checksum: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: SNAPSHOT_VERSION,
            users: snapshot.users.len() as u64,
            ideas: snapshot.ideas.len() as u64,
            votes: snapshot.votes.len() as u64,
            joins: snapshot.joins.len() as u64,
            teams: snapshot.teams.len() as u64,
            submissions: snapshot.submissions.len() as u64,
            reactions: snapshot.reactions.len() as u64,
            next_ids: snapshot.next_ids,
            checksum,
        }
    }

    /// Total number of records announced by the header.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        [
            self.users,
            self.ideas,
            self.votes,
            self.joins,
            self.teams,
            self.submissions,
            self.reactions,
        ]
        .iter()
        .fold(0u64, |acc, n| acc.saturating_add(*n))
    }

    /// Validate magic and version.
    ///
    /// Messages stay generic so a rejected upload reveals nothing about the format.
    pub fn validate(&self) -> Result<(), VisionSprintError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(VisionSprintError::SerializationError(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != SNAPSHOT_VERSION {
            return Err(VisionSprintError::SerializationError(
                "Unsupported file version".to_string(),
            ));
        }
        Ok(())
    }
}

/// Next free id of every sequence.
///
/// Carried separately from the records: deleted ideas and disbanded teams
/// leave gaps that the counters must keep skipping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdCounters {
    pub users: u64,
    pub ideas: u64,
    pub teams: u64,
    pub submissions: u64,
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            users: 1,
            ideas: 1,
            teams: 1,
            submissions: 1,
        }
    }
}

impl IdCounters {
    #[must_use]
    pub fn get(&self, kind: IdKind) -> u64 {
        match kind {
            IdKind::User => self.users,
            IdKind::Idea => self.ideas,
            IdKind::Team => self.teams,
            IdKind::Submission => self.submissions,
        }
    }
}

/// Full hackathon state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub stage: Stage,
    pub next_ids: IdCounters,
    pub users: Vec<User>,
    pub ideas: Vec<Idea>,
    pub votes: Vec<Vote>,
    pub joins: Vec<Join>,
    pub teams: Vec<Team>,
    pub submissions: Vec<Submission>,
    pub reactions: Vec<Reaction>,
}

impl Snapshot {
    /// Capture the current state of a hackathon.
    pub fn capture(hackathon: &Hackathon) -> Result<Self, VisionSprintError> {
        let store = hackathon.store();
        Ok(Self {
            stage: store.stage()?,
            next_ids: IdCounters {
                users: store.next_id(IdKind::User)?,
                ideas: store.next_id(IdKind::Idea)?,
                teams: store.next_id(IdKind::Team)?,
                submissions: store.next_id(IdKind::Submission)?,
            },
            users: store.users()?,
            ideas: store.ideas()?,
            votes: store.votes()?,
            joins: store.joins()?,
            teams: store.teams()?,
            submissions: store.submissions()?,
            reactions: store.reactions()?,
        })
    }

    fn into_changes(self) -> Vec<Change> {
        let mut changes = vec![Change::SetStage(self.stage)];
        changes.extend(IdKind::ALL.iter().map(|kind| Change::SetCounter {
            kind: *kind,
            next: self.next_ids.get(*kind),
        }));
        changes.extend(self.users.into_iter().map(Change::PutUser));
        changes.extend(self.ideas.into_iter().map(Change::PutIdea));
        changes.extend(self.votes.into_iter().map(Change::PutVote));
        changes.extend(self.joins.into_iter().map(Change::PutJoin));
        changes.extend(self.teams.into_iter().map(Change::PutTeam));
        changes.extend(self.submissions.into_iter().map(Change::PutSubmission));
        changes.extend(self.reactions.into_iter().map(Change::PutReaction));
        changes
    }
}

// =============================================================================
// CHECKSUMS
// =============================================================================

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over `bytes`.
///
/// Detects accidental corruption only; it is not a cryptographic hash.
#[must_use]
pub fn snapshot_checksum(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// BLAKE3 of an exported snapshot, hex encoded.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn snapshot_blake3(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Serialize the whole hackathon.
pub fn export_snapshot(hackathon: &Hackathon) -> Result<Vec<u8>, VisionSprintError> {
    let snapshot = Snapshot::capture(hackathon)?;

    let data_bytes = postcard::to_allocvec(&snapshot)
        .map_err(|e| VisionSprintError::SerializationError(format!("Data: {}", e)))?;
    let header = SnapshotHeader::for_snapshot(&snapshot, snapshot_checksum(&data_bytes));
    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| VisionSprintError::SerializationError(format!("Header: {}", e)))?;

    let header_len = u32::try_from(header_bytes.len())
        .map_err(|_| VisionSprintError::SerializationError("Header too large".to_string()))?;

    let mut result = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    result.extend_from_slice(&header_len.to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&data_bytes);
    Ok(result)
}

/// Parse and verify snapshot bytes.
pub fn import_snapshot(data: &[u8]) -> Result<Snapshot, VisionSprintError> {
    if data.len() > MAX_SNAPSHOT_SIZE {
        return Err(VisionSprintError::SerializationError(format!(
            "Snapshot size {} exceeds maximum {} bytes",
            data.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }
    let (len_bytes, rest) = data
        .split_first_chunk::<4>()
        .ok_or_else(|| VisionSprintError::SerializationError("Data too short".to_string()))?;
    let header_len = u32::from_le_bytes(*len_bytes) as usize;
    if rest.len() < header_len {
        return Err(VisionSprintError::SerializationError(
            "Data too short for header".to_string(),
        ));
    }
    let (header_bytes, data_bytes) = rest.split_at(header_len);

    let header: SnapshotHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| VisionSprintError::SerializationError(format!("Header: {}", e)))?;
    header.validate()?;

    // Bound the record count before decoding the payload.
    if header.record_count() > MAX_IMPORT_RECORDS {
        return Err(VisionSprintError::SerializationError(format!(
            "Record count {} exceeds maximum allowed {}",
            header.record_count(),
            MAX_IMPORT_RECORDS
        )));
    }

    let computed = snapshot_checksum(data_bytes);
    if computed != header.checksum {
        return Err(VisionSprintError::SerializationError(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }

    let snapshot: Snapshot = postcard::from_bytes(data_bytes)
        .map_err(|e| VisionSprintError::SerializationError(format!("Data: {}", e)))?;
    if SnapshotHeader::for_snapshot(&snapshot, computed) != header {
        return Err(VisionSprintError::SerializationError(
            "Record count mismatch".to_string(),
        ));
    }
    Ok(snapshot)
}

impl Hackathon {
    /// Load a snapshot into this hackathon.
    ///
    /// The store must hold no records and must never have issued an id. Only
    /// the stage may differ from a fresh store; the snapshot's stage wins.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<(), VisionSprintError> {
        let store = self.store();
        let mut empty = store.users()?.is_empty()
            && store.ideas()?.is_empty()
            && store.votes()?.is_empty()
            && store.joins()?.is_empty()
            && store.teams()?.is_empty()
            && store.submissions()?.is_empty()
            && store.reactions()?.is_empty();
        for kind in IdKind::ALL {
            empty = empty && store.next_id(kind)? == 1;
        }
        if !empty {
            return Err(VisionSprintError::Conflict(
                "snapshots can only be restored into an empty database".to_string(),
            ));
        }
        self.commit_unchecked(snapshot.into_changes())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Identity, ReactionKind};

    fn populated() -> Hackathon {
        let mut h = Hackathon::new();
        let admin = h
            .sign_in(
                &Identity::new("admin@example.com", "Admin"),
                &["admin@example.com".to_string()],
            )
            .expect("admin")
            .id;
        let bob = h
            .sign_in(&Identity::new("bob@example.com", "Bob"), &[])
            .expect("bob")
            .id;
        let idea = h.submit_idea(admin, "Robot barista", "coffee").expect("idea").id;
        h.vote(bob, idea).expect("vote");
        h.join(bob, idea).expect("join");
        let team = h.form_team(admin, idea, "Baristas", &[bob]).expect("team").id;
        h.advance_stage(admin).expect("sprint");
        let sub = h
            .submit_demo(bob, team, "https://example.com/demo", "")
            .expect("demo")
            .id;
        h.advance_stage(admin).expect("showcase");
        h.react(admin, sub, ReactionKind::Rocket).expect("react");
        h
    }

    #[test]
    fn export_import_restore_preserves_state() {
        let original = populated();
        let bytes = export_snapshot(&original).expect("export");
        let snapshot = import_snapshot(&bytes).expect("import");

        let mut restored = Hackathon::new();
        restored.restore(snapshot).expect("restore");

        assert_eq!(
            Snapshot::capture(&restored).expect("capture"),
            Snapshot::capture(&original).expect("capture")
        );
        assert_eq!(restored.stage().expect("stage"), Stage::Showcase);
        assert_eq!(export_snapshot(&restored).expect("export"), bytes);
    }

    #[test]
    fn export_is_deterministic() {
        let h = populated();
        assert_eq!(
            export_snapshot(&h).expect("export"),
            export_snapshot(&h).expect("export")
        );
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let mut bytes = export_snapshot(&populated()).expect("export");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(import_snapshot(&bytes).is_err());
    }

    #[test]
    fn record_limit_counts_every_kind() {
        let half = MAX_IMPORT_RECORDS / 2 + 1;
        let header = SnapshotHeader {
            magic: SNAPSHOT_MAGIC,
            version: SNAPSHOT_VERSION,
            users: half,
            ideas: half,
            votes: 0,
            joins: 0,
            teams: 0,
            submissions: 0,
            reactions: 0,
            next_ids: IdCounters::default(),
            checksum: snapshot_checksum(&[]),
        };
        let header_bytes = postcard::to_allocvec(&header).expect("header");
        let mut bytes = (header_bytes.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&header_bytes);

        assert!(matches!(
            import_snapshot(&bytes),
            Err(VisionSprintError::SerializationError(msg)) if msg.contains("Record count")
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = export_snapshot(&Hackathon::new()).expect("export");
        bytes[4] ^= 0xFF;
        assert!(import_snapshot(&bytes).is_err());
        assert!(import_snapshot(&[1, 0]).is_err());
    }

    #[test]
    fn restore_requires_empty_store() {
        let mut h = populated();
        let snapshot = Snapshot::capture(&h).expect("capture");
        assert!(matches!(
            h.restore(snapshot),
            Err(VisionSprintError::Conflict(_))
        ));
    }

    #[test]
    fn restored_counters_continue_after_imported_ids() {
        let bytes = export_snapshot(&populated()).expect("export");
        let mut restored = Hackathon::new();
        restored
            .restore(import_snapshot(&bytes).expect("import"))
            .expect("restore");
        let carol = restored
            .sign_in(&Identity::new("carol@example.com", "Carol"), &[])
            .expect("carol");
        assert_eq!(carol.id.0, 3);
    }

    #[test]
    fn deleted_ids_stay_retired_after_restore() {
        let mut h = Hackathon::new();
        let ada = h
            .sign_in(&Identity::new("ada@example.com", "Ada"), &[])
            .expect("ada")
            .id;
        h.submit_idea(ada, "First", "").expect("first");
        let second = h.submit_idea(ada, "Second", "").expect("second").id;
        h.delete_idea(ada, second).expect("delete");

        let bytes = export_snapshot(&h).expect("export");
        let snapshot = import_snapshot(&bytes).expect("import");
        assert_eq!(snapshot.next_ids.ideas, 3);

        let mut restored = Hackathon::new();
        restored.restore(snapshot).expect("restore");
        let third = restored.submit_idea(ada, "Third", "").expect("third").id;
        assert_ne!(third, second);
        assert_eq!(third.0, 3);
    }

    #[test]
    fn restore_after_stage_change_only() {
        let mut target = Hackathon::new();
        target.set_stage_unchecked(Stage::Sprint).expect("stage");

        let bytes = export_snapshot(&populated()).expect("export");
        target
            .restore(import_snapshot(&bytes).expect("import"))
            .expect("restore");
        assert_eq!(target.stage().expect("stage"), Stage::Showcase);
    }

    #[test]
    fn restore_refuses_store_that_issued_ids() {
        let mut target = Hackathon::new();
        target
            .commit_unchecked(vec![Change::SetCounter {
                kind: IdKind::Idea,
                next: 4,
            }])
            .expect("counter");

        let snapshot = Snapshot::capture(&Hackathon::new()).expect("capture");
        assert!(matches!(
            target.restore(snapshot),
            Err(VisionSprintError::Conflict(_))
        ));
    }

    #[test]
    fn checksum_is_order_sensitive() {
        assert_ne!(snapshot_checksum(b"ab"), snapshot_checksum(b"ba"));
        assert_eq!(snapshot_checksum(b""), FNV_OFFSET_BASIS);
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn blake3_hash_is_hex() {
        let hash = snapshot_blake3(b"visionsprint");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
