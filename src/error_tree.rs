//! Nested, client-facing validation error trees.
//!
//! Validators report failures as flat paths rooted at a synthetic segment:
//!
//! ```text
//! Payload.addresses[0].street  → "Street is a required field"
//! Payload.books[2]             → "Books[2] is a required field"
//! Payload.email                → "Email is a required field"
//! ```
//!
//! [`ErrorTree`] rebuilds the shape of the submitted payload from them, so the
//! client gets errors where it sent the data:
//!
//! ```json
//! {
//!   "addresses": [{ "street": "Street is a required field" }],
//!   "books": [null, null, "Books[2] is a required field"],
//!   "email": "Email is a required field"
//! }
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::FieldFailure;

type Fields = BTreeMap<String, ErrorNode>;

/// One node of an [`ErrorTree`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorNode {
    Message(String),
    Fields(BTreeMap<String, ErrorNode>),
    /// Slots nobody reported on serialize as `null`.
    Items(Vec<Option<ErrorNode>>),
}

impl ErrorNode {
    fn empty_fields() -> Self {
        Self::Fields(BTreeMap::new())
    }

    fn as_fields(&mut self) -> Option<&mut Fields> {
        match self {
            Self::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    /// The node's slots, grown to at least `len`, if it is a list.
    fn as_items(&mut self, len: usize) -> Option<&mut Vec<Option<ErrorNode>>> {
        match self {
            Self::Items(items) => {
                if items.len() < len {
                    items.resize(len, None);
                }
                Some(items)
            }
            _ => None,
        }
    }
}

/// Validation errors keyed by camelCase field name, nested like the payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorTree(BTreeMap<String, ErrorNode>);

impl ErrorTree {
    /// Builds a tree from flat `path → message` entries.
    ///
    /// Entries are applied in lexical path order. If two entries land on the
    /// same slot the first one wins, and once a key holds a message, map or
    /// list, later entries needing another kind there are dropped.
    pub fn from_entries<I, P, M>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, M)>,
        P: Into<String>,
        M: Into<String>,
    {
        let sorted: BTreeMap<String, String> = entries
            .into_iter()
            .map(|(path, message)| (path.into(), message.into()))
            .collect();

        let mut tree = Self::default();
        for (path, message) in sorted {
            tree.insert(&path, message);
        }
        tree
    }

    pub fn from_failures(failures: impl IntoIterator<Item = FieldFailure>) -> Self {
        Self::from_entries(failures.into_iter().map(|f| (f.path, f.message)))
    }

    /// Places one message. The first path segment is the synthetic root and
    /// is skipped; a path with nothing after it is ignored.
    pub fn insert(&mut self, path: &str, message: String) {
        let segments: Vec<Segment> = path.split('.').skip(1).map(Segment::parse).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut fields = &mut self.0;
        for segment in parents {
            let Some(next) = segment.descend(fields) else {
                tracing::debug!(path, "dropping validation message for a conflicting path");
                return;
            };
            fields = next;
        }
        last.place(fields, message);
    }

    pub fn get(&self, key: &str) -> Option<&ErrorNode> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// ── Path segments ─────────────────────────────────────────────────────────────

enum Segment {
    Key(String),
    Index(String, usize),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if let Some((name, rest)) = raw.split_once('[') {
            if let Some(index) = rest.strip_suffix(']').and_then(|i| i.parse().ok()) {
                return Self::Index(camel_case(name), index);
            }
        }
        Self::Key(camel_case(raw))
    }

    fn descend<'t>(&self, fields: &'t mut Fields) -> Option<&'t mut Fields> {
        match self {
            Self::Key(name) => fields
                .entry(name.clone())
                .or_insert_with(ErrorNode::empty_fields)
                .as_fields(),
            Self::Index(name, index) => fields
                .entry(name.clone())
                .or_insert_with(|| ErrorNode::Items(Vec::new()))
                .as_items(index + 1)?[*index]
                .get_or_insert_with(ErrorNode::empty_fields)
                .as_fields(),
        }
    }

    fn place(&self, fields: &mut Fields, message: String) {
        match self {
            Self::Key(name) => {
                fields.entry(name.clone()).or_insert(ErrorNode::Message(message));
            }
            Self::Index(name, index) => {
                let slots = fields
                    .entry(name.clone())
                    .or_insert_with(|| ErrorNode::Items(Vec::new()))
                    .as_items(index + 1);
                if let Some(items) = slots {
                    items[*index].get_or_insert(ErrorNode::Message(message));
                }
            }
        }
    }
}

// ── Naming ────────────────────────────────────────────────────────────────────

/// Key under which `validator` reports struct-level (schema) failures. It is
/// kept verbatim in trees.
pub(crate) const STRUCT_ERRORS: &str = "__all__";

/// `user_name` → `userName`, `UserName` → `userName`, `user_ID` → `userId`.
pub(crate) fn camel_case(name: &str) -> String {
    if name == STRUCT_ERRORS {
        return name.to_owned();
    }
    let mut words = name.split('_');
    let mut out = String::with_capacity(name.len());
    if let Some(first) = words.next() {
        out.push_str(first);
    }
    for word in words {
        push_title(&mut out, word);
    }
    lower_first(&out)
}

/// `user_name` → `UserName`. Used for the field name shown inside messages.
pub(crate) fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut words = name.split('_');
    if let Some(first) = words.next() {
        let mut chars = first.chars();
        if let Some(c) = chars.next() {
            out.extend(c.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    for word in words {
        push_title(&mut out, word);
    }
    out
}

fn push_title(out: &mut String, word: &str) {
    let mut chars = word.chars();
    if let Some(c) = chars.next() {
        out.extend(c.to_uppercase());
        out.push_str(&chars.as_str().to_lowercase());
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
