//! Old/new image reconciliation.

use serde_json::Value;

use super::{DispatchError, Result};
use crate::store::Record;

/// Reconcile a change event's images into one record.
///
/// - new only: the new image
/// - old only: the old image (REMOVE)
/// - both: old deep-merged with new; new wins on conflicts, nested maps merge
///   recursively, every other value (lists included) is replaced wholesale
/// - neither: `DispatchError::MissingImages`
pub fn full_record(old: Option<Record>, new: Option<Record>) -> Result<Record> {
    match (old, new) {
        (None, None) => Err(DispatchError::MissingImages),
        (Some(old), None) => Ok(old),
        (None, Some(new)) => Ok(new),
        (Some(mut old), Some(new)) => {
            merge_into(&mut old, new);
            Ok(old)
        }
    }
}

fn merge_into(target: &mut Record, overlay: Record) {
    for (name, value) in overlay {
        match value {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = target.get_mut(&name) {
                    merge_into(existing, incoming);
                    continue;
                }
                target.insert(name, Value::Object(incoming));
            }
            other => {
                target.insert(name, other);
            }
        }
    }
}
