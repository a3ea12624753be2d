use bson::{doc, Document};

use super::SubjectId;
use crate::database::ResourceId;

/// Field holding the owning subject on every scoped document
pub const OWNER_FIELD: &str = "user_id";

/// Query scope applied to every operation of one request.
///
/// A document outside the caller's scope is treated exactly like a missing
/// one, so callers never learn that another subject's document exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Owner(SubjectId),
    Unscoped,
}

impl Scope {
    pub fn new(scoped: bool, subject: &SubjectId) -> Self {
        if scoped {
            Scope::Owner(subject.clone())
        } else {
            Scope::Unscoped
        }
    }

    /// Filter used by list
    pub fn filter(&self) -> Document {
        match self {
            Scope::Owner(subject) => {
                let mut filter = Document::new();
                filter.insert(OWNER_FIELD, subject.as_str());
                filter
            }
            Scope::Unscoped => Document::new(),
        }
    }

    /// Filter used by get, update and delete
    pub fn key_filter(&self, id: ResourceId) -> Document {
        let mut filter = doc! { "_id": id.object_id() };
        for (field, value) in self.filter() {
            filter.insert(field, value);
        }
        filter
    }

    /// Record the owner on a document about to be inserted
    pub fn stamp(&self, document: &mut Document) {
        if let Scope::Owner(subject) = self {
            document.insert(OWNER_FIELD, subject.as_str());
        }
    }
}
