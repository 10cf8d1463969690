/// Accumulate Module
///
/// Collects keyed records produced by the extract stage into an
/// insertion-ordered RecordSet.
///
/// Duplicate identifiers follow an explicit [`DuplicatePolicy`]: with
/// `LastWriteWins` a later record replaces the earlier one but keeps its
/// original position; with `FailFast` the collision is an error.
use crate::models::{EnrichedRecord, NaturalId};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    LastWriteWins,
    FailFast,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("duplicate natural identifier {0}")]
pub struct DuplicateId(pub NaturalId);

/// Outcome of a successful insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    New,
    Replaced,
}

#[derive(Debug, Default)]
pub struct RecordAccumulator {
    policy: DuplicatePolicy,
    positions: HashMap<NaturalId, usize>,
    records: Vec<(NaturalId, EnrichedRecord)>,
    overwrites: usize,
}

impl RecordAccumulator {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self { policy, ..Default::default() }
    }

    /// Insert a record under its natural identifier
    pub fn insert(&mut self, id: NaturalId, record: EnrichedRecord) -> Result<Insert, DuplicateId> {
        match self.positions.get(&id) {
            Some(&pos) => {
                if self.policy == DuplicatePolicy::FailFast {
                    return Err(DuplicateId(id));
                }
                tracing::warn!("Natural identifier {} seen again, replacing earlier record", id);
                self.records[pos].1 = record;
                self.overwrites += 1;
                Ok(Insert::Replaced)
            }
            None => {
                self.positions.insert(id, self.records.len());
                self.records.push((id, record));
                Ok(Insert::New)
            }
        }
    }

    /// Number of unique identifiers collected so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Number of inserts that replaced an existing record
    pub fn overwrites(&self) -> usize {
        self.overwrites
    }

    /// Finish accumulation, yielding records in insertion order
    pub fn into_record_set(self) -> Vec<EnrichedRecord> {
        self.records.into_iter().map(|(_, record)| record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;

    fn named(name: &str) -> EnrichedRecord {
        EnrichedRecord::new().with("name", name)
    }

    #[test]
    fn test_insertion_order() {
        let mut acc = RecordAccumulator::new(DuplicatePolicy::LastWriteWins);
        acc.insert(4, named("charmander")).unwrap();
        acc.insert(1, named("bulbasaur")).unwrap();
        acc.insert(7, named("squirtle")).unwrap();

        assert_eq!(acc.len(), 3);
        let names: Vec<FieldValue> = acc.into_record_set().iter().map(|r| r.get("name").unwrap().clone()).collect();
        assert_eq!(names, vec!["charmander".into(), "bulbasaur".into(), "squirtle".into()]);
    }

    #[test]
    fn test_last_write_wins_keeps_position() {
        let mut acc = RecordAccumulator::new(DuplicatePolicy::LastWriteWins);
        assert_eq!(acc.insert(1, named("bulbasaur")), Ok(Insert::New));
        acc.insert(2, named("ivysaur")).unwrap();
        assert_eq!(acc.insert(1, named("bulbasaur-v2")), Ok(Insert::Replaced));

        assert_eq!(acc.len(), 2);
        assert_eq!(acc.overwrites(), 1);

        let records = acc.into_record_set();
        assert_eq!(records[0].get("name"), Some(&FieldValue::Text("bulbasaur-v2".into())));
        assert_eq!(records[1].get("name"), Some(&FieldValue::Text("ivysaur".into())));
    }

    #[test]
    fn test_fail_fast_rejects_duplicate() {
        let mut acc = RecordAccumulator::new(DuplicatePolicy::FailFast);
        acc.insert(1, named("bulbasaur")).unwrap();

        assert_eq!(acc.insert(1, named("other")), Err(DuplicateId(1)));
        assert_eq!(acc.len(), 1);
        assert_eq!(acc.overwrites(), 0);
    }
}
