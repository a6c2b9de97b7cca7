//! Configuration reconciliation
//!
//! [`reconcile`] pulls values out of an `old` tree into a `new` tree. The
//! walk is driven by `old`'s keys, so the result always has `new`'s shape,
//! key order and comments:
//!
//! | old / new at a path              | result                                   |
//! |----------------------------------|------------------------------------------|
//! | both mappings                    | recurse                                  |
//! | both sequences                   | new elements, then old elements not already present |
//! | same scalar type                 | old value                                |
//! | old integer, new float           | old value as a float                     |
//! | new declares string / integer    | old value coerced to the declared type   |
//! | other type mismatch              | new value kept, conflict logged          |
//! | key only in old                  | dropped                                  |
//! | key only in new                  | kept                                     |
//!
//! Mapping iteration follows insertion order, so a given `(old, new)` pair
//! always produces the same output.

use serde::Serialize;

use crate::document::{key_path, parse_integer_text, Kind, Mapping, Node, Value};

/// How a type conflict was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Old value converted to the string type declared by new
    CoercedToString,
    /// Old value converted to the integer type declared by new
    CoercedToInt,
    /// Old value discarded
    KeptNew,
}

/// Old and new hold incompatible types at `path`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeConflict {
    pub path: String,
    pub old_kind: &'static str,
    pub new_kind: &'static str,
    pub resolution: Resolution,
}

/// What a reconcile pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Scalar slots that took the old value
    pub updated: usize,
    /// Sequence elements carried over from old
    pub appended: usize,
    pub conflicts: Vec<TypeConflict>,
    /// Old-only keys that were not carried over
    pub dropped: Vec<String>,
}

impl ReconcileReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Merge `old`'s compatible values into `new` in place.
pub fn reconcile(old: &Node, new: &mut Node) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    merge_slot("", old, new, &mut report);
    tracing::debug!(
        updated = report.updated,
        appended = report.appended,
        conflicts = report.conflicts.len(),
        dropped = report.dropped.len(),
        "reconcile finished"
    );
    report
}

fn merge_slot(path: &str, old: &Node, new: &mut Node, report: &mut ReconcileReport) {
    let old_kind = old.kind();
    let new_kind = new.kind();

    if let (Value::Map(old_map), Value::Map(new_map)) = (&old.value, &mut new.value) {
        merge_mappings(path, old_map, new_map, report);
        return;
    }
    if let (Value::Seq(old_items), Value::Seq(new_items)) = (&old.value, &mut new.value) {
        report.appended += fold_sequence(old_items, new_items);
        return;
    }
    if old_kind == new_kind {
        new.value = old.value.clone();
        report.updated += 1;
        return;
    }
    // JSON writes a whole-number float as an integer
    if let (Value::Int(i), Value::Float(_)) = (&old.value, &new.value) {
        new.value = Value::Float(*i as f64);
        report.updated += 1;
        return;
    }

    let coerced = if old_kind.is_container() || new_kind.is_container() {
        None
    } else if new.declares_str() {
        old.value
            .coerce_to_string()
            .map(|text| (Value::Str(text), Resolution::CoercedToString))
    } else if new.declares_int() {
        old.value
            .coerce_to_int()
            .map(|i| (Value::Int(i), Resolution::CoercedToInt))
    } else {
        None
    };

    let resolution = match coerced {
        Some((value, resolution)) => {
            new.value = value;
            resolution
        }
        None => Resolution::KeptNew,
    };
    conflict(path, old_kind, new_kind, resolution, report);
}

fn merge_mappings(path: &str, old: &Mapping, new: &mut Mapping, report: &mut ReconcileReport) {
    for (key, old_child) in old.iter() {
        let child_path = key_path(path, key);
        match new.get_mut(key) {
            Some(new_child) => merge_slot(&child_path, old_child, new_child, report),
            None => {
                tracing::debug!(path = %child_path, "dropping key missing from new document");
                report.dropped.push(child_path);
            }
        }
    }
}

/// Append old elements after new ones. Nulls are dropped, integer-looking
/// strings become integers, and elements equal to one of new's original
/// elements are not repeated. Returns the number appended.
fn fold_sequence(old: &[Node], new: &mut Vec<Node>) -> usize {
    let original_len = new.len();
    let mut appended = 0;
    for item in old {
        let value = match &item.value {
            Value::Null => continue,
            Value::Str(s) => match parse_integer_text(s) {
                Some(i) => Value::Int(i),
                None => Value::Str(s.clone()),
            },
            other => other.clone(),
        };
        let carried = Node::new(value).without_comments();
        if new[..original_len].iter().any(|n| n.same_value(&carried)) {
            continue;
        }
        new.push(carried);
        appended += 1;
    }
    appended
}

fn conflict(path: &str, old_kind: Kind, new_kind: Kind, resolution: Resolution, report: &mut ReconcileReport) {
    match resolution {
        Resolution::KeptNew => tracing::warn!(
            path = %display_path(path),
            old = %old_kind,
            new = %new_kind,
            "type conflict, keeping new value"
        ),
        _ => tracing::warn!(
            path = %display_path(path),
            old = %old_kind,
            new = %new_kind,
            ?resolution,
            "type conflict, coerced old value"
        ),
    }
    report.conflicts.push(TypeConflict {
        path: path.to_string(),
        old_kind: old_kind.name(),
        new_kind: new_kind.name(),
        resolution,
    });
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}
