//! Intake validation and deduplication.

use procura_transfer::{FileRef, IntakeRules, ValidationError};

use crate::entry::QueueEntry;
use crate::store::QueueStore;

/// Files sorted into accepted entries and refusals.
#[derive(Debug, Default)]
pub(crate) struct Admission {
    pub(crate) entries: Vec<QueueEntry>,
    pub(crate) rejected: Vec<ValidationError>,
    pub(crate) duplicates: Vec<ValidationError>,
}

/// Validates `files` in input order and builds pending entries for the
/// survivors.
///
/// Type and size failures are collected per file. Files whose name and size
/// match an entry already in `store`, or an earlier file of the same batch,
/// are collected as duplicates. Nothing is written to the store.
pub(crate) fn admit(store: &QueueStore, rules: &IntakeRules, files: Vec<FileRef>) -> Admission {
    let mut admission = Admission::default();

    for file in files {
        if let Err(e) = rules.check(file.name(), file.size()) {
            admission.rejected.push(e);
            continue;
        }

        let queued = store.contains_file(file.name(), file.size())
            || admission
                .entries
                .iter()
                .any(|e| e.is_same_file(file.name(), file.size()));
        if queued {
            admission.duplicates.push(ValidationError::Duplicate {
                name: file.name().to_string(),
            });
            continue;
        }

        admission.entries.push(QueueEntry::new(file));
    }

    admission
}
