//! Form merge strategies.
//!
//! A merge turns a desired-state document plus the server's create or edit
//! form into the payload actually written.

use crate::error::{SyncError, SyncResult};
use hyperdata_protocol::Representation;
use serde_json::{Map, Value};

/// Turns documents into wire payloads using the server's forms.
pub trait FormMerge: Send + Sync {
    /// Builds the payload for creating `document` in a collection.
    fn create_merge(
        &self,
        document: &Representation,
        form: &Representation,
    ) -> SyncResult<Representation>;

    /// Builds the payload for updating `resource` towards `document`.
    ///
    /// `Ok(None)` means nothing would change and the write is skipped.
    fn edit_merge(
        &self,
        resource: &Representation,
        document: &Representation,
        form: &Representation,
    ) -> SyncResult<Option<Representation>>;
}

/// Merges attributes named by the form's field list.
///
/// A form lists its fields as items: `{"items": [{"name": "title"}, ...]}`.
/// When the form lists no fields every document attribute is taken, except
/// nested documents (objects carrying `links` or `items`), which belong to
/// child resources.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldMerge;

impl FieldMerge {
    fn fields(form: &Representation) -> SyncResult<Option<Vec<String>>> {
        let Some(items) = form.items.as_ref().filter(|items| !items.is_empty()) else {
            return Ok(None);
        };
        items
            .iter()
            .map(|field| {
                field
                    .attribute_str("name")
                    .map(str::to_owned)
                    .ok_or_else(|| SyncError::Merge("form field without a name".into()))
            })
            .collect::<SyncResult<Vec<_>>>()
            .map(Some)
    }

    fn is_nested_document(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|o| o.contains_key("links") || o.contains_key("items"))
    }

    fn accepted<'d>(
        document: &'d Representation,
        form: &Representation,
    ) -> SyncResult<Vec<(&'d String, &'d Value)>> {
        let fields = Self::fields(form)?;
        Ok(document
            .attributes
            .iter()
            .filter(|(name, value)| match &fields {
                Some(fields) => fields.iter().any(|f| f == *name),
                None => !Self::is_nested_document(value),
            })
            .collect())
    }
}

impl FormMerge for FieldMerge {
    fn create_merge(
        &self,
        document: &Representation,
        form: &Representation,
    ) -> SyncResult<Representation> {
        let attributes: Map<String, Value> = Self::accepted(document, form)?
            .into_iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Ok(Representation {
            attributes,
            ..Representation::default()
        })
    }

    fn edit_merge(
        &self,
        resource: &Representation,
        document: &Representation,
        form: &Representation,
    ) -> SyncResult<Option<Representation>> {
        let mut merged = resource.attributes.clone();
        let mut changed = false;
        for (name, value) in Self::accepted(document, form)? {
            if merged.get(name) != Some(value) {
                merged.insert(name.clone(), value.clone());
                changed = true;
            }
        }
        if !changed {
            return Ok(None);
        }
        Ok(Some(Representation {
            links: resource.links.clone(),
            attributes: merged,
            items: None,
        }))
    }
}
