//! Keyed-list reconciliation with minimal-move reordering.
//!
//! A list entry is keyed; across updates a retained key keeps its mounted
//! subtree untouched — internal scopes and signals are not torn down, so
//! nested state survives reordering. Items on the longest increasing
//! subsequence of the retained old positions stay where they are; every
//! other retained item is moved with a single reinsertion. Total moves
//! equal retained count minus LIS length, the minimum achievable with
//! single-item moves.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use weft_reactive::Scope;
use weft_scene::{HostAdapter, Key, KeyedList, ListItem, Node};

use crate::error::MountError;
use crate::metrics::inc_metric;
use crate::reconciler::{MountHandle, MountedKind, Reconciler};

/// One mounted list entry. Its scope stands alone (not a child of the
/// list scope) so entries can be closed individually as keys come and go.
pub(crate) struct ListEntry<H: HostAdapter> {
    pub(crate) key: Key,
    pub(crate) scope: Scope,
    pub(crate) handle: MountHandle<H>,
}

enum Plan<H: HostAdapter> {
    Reuse { old_position: usize, entry: ListEntry<H> },
    Fresh { item: ListItem<H> },
}

impl<H: HostAdapter> Reconciler<H> {
    pub(crate) fn mount_list(
        &self,
        list: &KeyedList<H>,
        parent: &H::Node,
        anchor: Option<&H::Node>,
        parent_scope: &Scope,
    ) -> Result<MountHandle<H>, MountError> {
        let scope = parent_scope.child();
        let anchor_node = self.place_anchor(parent, anchor, &scope);
        let entries: Rc<RefCell<Vec<ListEntry<H>>>> = Rc::new(RefCell::new(Vec::new()));

        {
            let entries = entries.clone();
            scope.defer(move || {
                for entry in entries.borrow_mut().drain(..) {
                    entry.scope.close();
                }
            });
        }

        self.reconcile_list(&list.items.get(), parent, &anchor_node, &entries);

        {
            let reconciler = self.clone();
            let parent = parent.clone();
            let anchor_node = anchor_node.clone();
            let entries = entries.clone();
            let subscription = list.items.subscribe(move |items| {
                reconciler.reconcile_list(items, &parent, &anchor_node, &entries);
            });
            scope.defer(move || subscription.unsubscribe());
        }

        Ok(MountHandle {
            scope,
            kind: MountedKind::List {
                anchor: anchor_node,
                entries,
            },
        })
    }

    fn reconcile_list(
        &self,
        items: &[ListItem<H>],
        parent: &H::Node,
        anchor: &H::Node,
        entries: &Rc<RefCell<Vec<ListEntry<H>>>>,
    ) {
        inc_metric!(LIST_RECONCILES);
        let old: Vec<ListEntry<H>> = entries.borrow_mut().drain(..).collect();
        let old_index: FxHashMap<Key, usize> = old
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.key.clone(), position))
            .collect();
        let mut old_slots: Vec<Option<ListEntry<H>>> = old.into_iter().map(Some).collect();

        // Plan the new order: reuse retained keys, mark the rest fresh.
        let mut seen: FxHashSet<Key> = FxHashSet::default();
        let mut plans: Vec<Plan<H>> = Vec::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.key.clone()) {
                log::warn!("list: duplicate key `{}`, entry skipped", item.key);
                continue;
            }
            let reuse = old_index
                .get(&item.key)
                .and_then(|&position| old_slots[position].take().map(|entry| (position, entry)));
            match reuse {
                Some((old_position, entry)) => plans.push(Plan::Reuse { old_position, entry }),
                None => plans.push(Plan::Fresh { item: item.clone() }),
            }
        }

        // Keys absent from the new order: tear the entry down.
        for slot in old_slots {
            if let Some(entry) = slot {
                entry.scope.close();
            }
        }

        // Retained items on the LIS of old positions keep their place.
        let retained_positions: Vec<usize> = plans
            .iter()
            .filter_map(|plan| match plan {
                Plan::Reuse { old_position, .. } => Some(*old_position),
                Plan::Fresh { .. } => None,
            })
            .collect();
        let stable: FxHashSet<usize> = longest_increasing_subsequence(&retained_positions)
            .into_iter()
            .collect();

        // Walk the new order back to front; everything not stable is
        // (re)inserted before the entry that follows it.
        let mut next_anchor: H::Node = anchor.clone();
        let mut new_entries: Vec<ListEntry<H>> = Vec::with_capacity(plans.len());
        let mut retained_remaining = retained_positions.len();
        for plan in plans.into_iter().rev() {
            match plan {
                Plan::Reuse { entry, .. } => {
                    retained_remaining -= 1;
                    let nodes = entry.handle.host_nodes();
                    if !stable.contains(&retained_remaining) {
                        inc_metric!(LIST_MOVES);
                        for node in &nodes {
                            self.adapter().insert_before(parent, node, Some(&next_anchor));
                        }
                    }
                    if let Some(first) = nodes.first() {
                        next_anchor = first.clone();
                    }
                    new_entries.push(entry);
                }
                Plan::Fresh { item } => {
                    let entry_scope = Scope::root();
                    let description = Node::Component {
                        thunk: item.build.clone(),
                        key: Some(item.key.clone()),
                    };
                    match self.mount_node(&description, parent, Some(&next_anchor), &entry_scope) {
                        Ok(handle) => {
                            if let Some(first) = handle.host_nodes().first() {
                                next_anchor = first.clone();
                            }
                            new_entries.push(ListEntry {
                                key: item.key.clone(),
                                scope: entry_scope,
                                handle,
                            });
                        }
                        Err(error) => {
                            log::error!("list: mounting item `{}` failed: {error}", item.key);
                            entry_scope.close();
                        }
                    }
                }
            }
        }
        new_entries.reverse();
        *entries.borrow_mut() = new_entries;
    }
}

/// Indices of one longest strictly-increasing subsequence of `values`.
///
/// Patience algorithm, O(n log n): `tails[k]` holds the index of the
/// smallest possible tail of an increasing subsequence of length k+1;
/// predecessors chain each element back to the subsequence it extends.
fn longest_increasing_subsequence(values: &[usize]) -> Vec<usize> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut tails: Vec<usize> = Vec::new();
    let mut predecessors: Vec<Option<usize>> = vec![None; values.len()];
    for (index, &value) in values.iter().enumerate() {
        let position = tails.partition_point(|&tail| values[tail] < value);
        if position > 0 {
            predecessors[index] = Some(tails[position - 1]);
        }
        if position == tails.len() {
            tails.push(index);
        } else {
            tails[position] = index;
        }
    }
    let mut result = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(index) = cursor {
        result.push(index);
        cursor = predecessors[index];
    }
    result.reverse();
    result
}
