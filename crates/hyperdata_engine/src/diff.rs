//! Collection differencing.
//!
//! Given an existing collection and a desired one, the differencer pairs
//! items with an ordered list of comparators and then executes three
//! phases in strict order: delete, update, create.

use crate::error::{SyncError, SyncResult};
use crate::resource::Resource;
use async_trait::async_trait;
use futures::future::join_all;
use hyperdata_protocol::Representation;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Decides whether an existing item and a desired document are the same
/// resource.
pub trait Comparator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Returns true if `existing` and `desired` denote the same resource.
    fn matches(&self, existing: &Representation, desired: &Representation) -> bool;
}

/// Matches on identity: `canonical`, else `self`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkRelationComparator;

impl Comparator for LinkRelationComparator {
    fn name(&self) -> &str {
        "link-relation"
    }

    fn matches(&self, existing: &Representation, desired: &Representation) -> bool {
        match (existing.identity(), desired.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Matches on equal, non-null values of one attribute.
#[derive(Debug, Clone)]
pub struct AttributeComparator {
    attribute: String,
}

impl AttributeComparator {
    /// Creates a comparator on `attribute`.
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
        }
    }
}

impl Comparator for AttributeComparator {
    fn name(&self) -> &str {
        &self.attribute
    }

    fn matches(&self, existing: &Representation, desired: &Representation) -> bool {
        match (
            existing.attribute(&self.attribute),
            desired.attribute(&self.attribute),
        ) {
            (Some(a), Some(b)) => !a.is_null() && a == b,
            _ => false,
        }
    }
}

/// Identity, then `name`, then `title`.
pub fn default_comparators() -> Vec<Arc<dyn Comparator>> {
    vec![
        Arc::new(LinkRelationComparator) as Arc<dyn Comparator>,
        Arc::new(AttributeComparator::new("name")),
        Arc::new(AttributeComparator::new("title")),
    ]
}

/// What the synchronizer did to reach a document's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// The resource was created from the document.
    Create,
    /// The resource was updated towards the document.
    Update,
    /// The resource was deleted.
    Delete,
}

/// A resource paired with the document it was reconciled against.
///
/// Produced by the differencer and consumed within the same pass.
#[derive(Debug, Clone)]
pub struct SyncInfo {
    /// The local resource.
    pub resource: Resource,
    /// The desired-state document.
    pub document: Representation,
    /// What was done.
    pub action: SyncAction,
}

/// The matched partition of a collection diff.
#[derive(Debug, Default)]
pub struct CollectionDiff {
    /// Desired documents with no existing match.
    pub create: Vec<Representation>,
    /// Existing items paired with their desired document.
    pub update: Vec<(Resource, Representation)>,
    /// Existing items with no desired match.
    pub delete: Vec<Resource>,
}

/// Write operations the differencer invokes during execution.
#[async_trait]
pub trait DiffActions: Send + Sync {
    /// Creates `document`. `Ok(None)` when nothing was created.
    async fn create(&self, document: &Representation) -> SyncResult<Option<Resource>>;

    /// Updates `resource` towards `document`.
    async fn update(&self, resource: &Resource, document: &Representation) -> SyncResult<()>;

    /// Deletes `resource`.
    async fn delete(&self, resource: &Resource) -> SyncResult<()>;
}

/// Pairs existing items with desired documents.
///
/// Comparators run in order; for each, every remaining existing item is
/// paired with the first remaining desired document the comparator accepts.
/// A pair once made is never reconsidered.
pub fn partition(
    existing: &[Resource],
    desired: &[Representation],
    comparators: &[Arc<dyn Comparator>],
) -> CollectionDiff {
    let mut delete: Vec<(Resource, Representation)> = existing
        .iter()
        .map(|r| (r.clone(), r.representation()))
        .collect();
    let mut create: Vec<Representation> = desired.to_vec();
    let mut update = Vec::new();

    for comparator in comparators {
        let mut i = 0;
        while i < delete.len() {
            let found = create
                .iter()
                .position(|doc| comparator.matches(&delete[i].1, doc));
            match found {
                Some(j) => {
                    let (resource, _) = delete.remove(i);
                    let document = create.remove(j);
                    update.push((resource, document));
                }
                None => i += 1,
            }
        }
    }

    CollectionDiff {
        create,
        update,
        delete: delete.into_iter().map(|(r, _)| r).collect(),
    }
}

/// Runs one phase: concurrently when `sequential` is false (every item
/// settles, then the first error is reported), else one at a time.
pub(crate) async fn run_phase<T, R, F, Fut>(
    inputs: Vec<T>,
    sequential: bool,
    f: F,
) -> SyncResult<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = SyncResult<R>>,
{
    if sequential {
        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            results.push(f(input).await?);
        }
        Ok(results)
    } else {
        join_all(inputs.into_iter().map(f))
            .await
            .into_iter()
            .collect()
    }
}

/// Reconciles `existing`'s items against `desired`'s items.
///
/// Returns one [`SyncInfo`] per updated pair and per created item. Deleted
/// items have no future state and are not reported.
pub async fn diff_collection(
    existing: &Resource,
    desired: &Representation,
    comparators: &[Arc<dyn Comparator>],
    actions: &dyn DiffActions,
    batch_size: Option<usize>,
) -> SyncResult<Vec<SyncInfo>> {
    let diff = partition(&existing.items(), desired.items(), comparators);
    let sequential = matches!(batch_size, Some(n) if n > 0);
    debug!(
        delete = diff.delete.len(),
        update = diff.update.len(),
        create = diff.create.len(),
        sequential,
        "collection diff"
    );

    run_phase(diff.delete, sequential, |resource| async move {
        actions.delete(&resource).await
    })
    .await?;

    let updated = run_phase(diff.update, sequential, |(resource, document)| async move {
        actions.update(&resource, &document).await?;
        Ok::<_, SyncError>(SyncInfo {
            resource,
            document,
            action: SyncAction::Update,
        })
    })
    .await?;

    let created = run_phase(diff.create, sequential, |document| async move {
        let created = actions.create(&document).await?;
        Ok::<_, SyncError>(created.map(|resource| SyncInfo {
            resource,
            document,
            action: SyncAction::Create,
        }))
    })
    .await?;

    Ok(updated.into_iter().chain(created.into_iter().flatten()).collect())
}

/// Per-identifier operations for [`diff_uri_list`].
#[async_trait]
pub trait UriListActions: Send + Sync {
    /// Adds `uri`.
    async fn create(&self, uri: &str) -> SyncResult<()>;

    /// Removes `uri`.
    async fn delete(&self, uri: &str) -> SyncResult<()>;
}

/// The set difference of two identifier lists.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UriListDiff {
    /// Identifiers only in the desired list.
    pub create: Vec<String>,
    /// Identifiers only in the existing list.
    pub delete: Vec<String>,
}

impl UriListDiff {
    /// Computes the difference in both directions, keeping list order.
    pub fn compute(existing: &[String], desired: &[String]) -> Self {
        let mut create: Vec<String> = Vec::new();
        for uri in desired {
            if !existing.contains(uri) && !create.contains(uri) {
                create.push(uri.clone());
            }
        }
        let mut delete: Vec<String> = Vec::new();
        for uri in existing {
            if !desired.contains(uri) && !delete.contains(uri) {
                delete.push(uri.clone());
            }
        }
        Self { create, delete }
    }

    /// Returns true if the lists already agree.
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.delete.is_empty()
    }
}

/// Reconciles identifier lists: deletes, then creates. There is no update
/// phase.
pub async fn diff_uri_list(
    existing: &[String],
    desired: &[String],
    actions: &dyn UriListActions,
    batch_size: Option<usize>,
) -> SyncResult<UriListDiff> {
    let diff = UriListDiff::compute(existing, desired);
    let sequential = matches!(batch_size, Some(n) if n > 0);
    debug!(
        delete = diff.delete.len(),
        create = diff.create.len(),
        "uri-list diff"
    );

    run_phase(diff.delete.clone(), sequential, |uri| async move {
        actions.delete(&uri).await
    })
    .await?;
    run_phase(diff.create.clone(), sequential, |uri| async move {
        actions.create(&uri).await
    })
    .await?;

    Ok(diff)
}
