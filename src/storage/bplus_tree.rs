use std::collections::VecDeque;

use tracing::trace;

use crate::{
    storage::{
        node::{BTreeNode, MAX_VALUE_SIZE, USABLE_SPACE},
        page_store::PageStore,
    },
    types::{
        PageId, RowId,
        error::{DatabaseError, Result},
    },
};

/// Split of a non-root child: the separator and the new right sibling.
struct SplitResult {
    separator: RowId,
    right_page_id: PageId,
}

/// B+tree from row id to row bytes, stored in pages of a [`PageStore`].
///
/// The root page id never changes: a root split moves the root's contents
/// into two new children, and a root with a single child absorbs it.
pub struct BTreeIndex<'s> {
    store: &'s mut PageStore,
    root_page_id: PageId,
}

impl<'s> BTreeIndex<'s> {
    pub fn open(store: &'s mut PageStore, root_page_id: PageId) -> Self {
        Self {
            store,
            root_page_id,
        }
    }

    /// Allocate an empty tree and return its root page id.
    pub fn create(store: &mut PageStore) -> Result<PageId> {
        let root_page_id = store.allocate()?;
        store.write(root_page_id, BTreeNode::empty_leaf().encode())?;
        Ok(root_page_id)
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    fn load(&self, page_id: PageId) -> Result<BTreeNode> {
        let page = self.store.read(page_id)?;
        BTreeNode::decode(&page, page_id)
    }

    fn store_node(&mut self, page_id: PageId, node: &BTreeNode) -> Result<()> {
        self.store.write(page_id, node.encode())
    }

    fn allocate_node(&mut self, node: &BTreeNode) -> Result<PageId> {
        let page_id = self.store.allocate()?;
        self.store_node(page_id, node)?;
        Ok(page_id)
    }

    pub fn lookup(&self, key: RowId) -> Result<Option<Vec<u8>>> {
        let mut page_id = self.root_page_id;
        loop {
            match self.load(page_id)? {
                BTreeNode::Leaf { entries } => {
                    return Ok(entries
                        .binary_search_by_key(&key, |(k, _)| *k)
                        .ok()
                        .map(|index| entries[index].1.clone()));
                }
                BTreeNode::Interior { keys, children } => {
                    page_id = children[child_index(&keys, key)];
                }
            }
        }
    }

    /// Insert or overwrite. Returns the previous value for `key`, if any.
    pub fn insert(&mut self, key: RowId, value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        if value.len() > MAX_VALUE_SIZE {
            return Err(DatabaseError::RowTooLarge {
                size: value.len(),
                max: MAX_VALUE_SIZE,
            });
        }
        let root_page_id = self.root_page_id;
        let (previous, _) = self.insert_into(root_page_id, key, value)?;
        Ok(previous)
    }

    fn insert_into(
        &mut self,
        page_id: PageId,
        key: RowId,
        value: Vec<u8>,
    ) -> Result<(Option<Vec<u8>>, Option<SplitResult>)> {
        let (node, previous) = match self.load(page_id)? {
            BTreeNode::Leaf { mut entries } => {
                let previous = match entries.binary_search_by_key(&key, |(k, _)| *k) {
                    Ok(index) => Some(std::mem::replace(&mut entries[index].1, value)),
                    Err(index) => {
                        entries.insert(index, (key, value));
                        None
                    }
                };
                (BTreeNode::Leaf { entries }, previous)
            }
            BTreeNode::Interior {
                mut keys,
                mut children,
            } => {
                let index = child_index(&keys, key);
                let (previous, split) = self.insert_into(children[index], key, value)?;
                let Some(split) = split else {
                    return Ok((previous, None));
                };
                keys.insert(index, split.separator);
                children.insert(index + 1, split.right_page_id);
                (BTreeNode::Interior { keys, children }, previous)
            }
        };

        if !node.is_overflow() {
            self.store_node(page_id, &node)?;
            return Ok((previous, None));
        }

        let (left, separator, right) = node.split();
        if page_id == self.root_page_id {
            let left_page_id = self.allocate_node(&left)?;
            let right_page_id = self.allocate_node(&right)?;
            let root = BTreeNode::Interior {
                keys: vec![separator],
                children: vec![left_page_id, right_page_id],
            };
            self.store_node(page_id, &root)?;
            trace!(root = page_id, separator, "split root");
            return Ok((previous, None));
        }

        self.store_node(page_id, &left)?;
        let right_page_id = self.allocate_node(&right)?;
        trace!(page_id, right_page_id, separator, "split node");
        Ok((
            previous,
            Some(SplitResult {
                separator,
                right_page_id,
            }),
        ))
    }

    /// Remove `key`, returning its value when it was present.
    pub fn delete(&mut self, key: RowId) -> Result<Option<Vec<u8>>> {
        let root_page_id = self.root_page_id;
        self.delete_from(root_page_id, key)
    }

    fn delete_from(&mut self, page_id: PageId, key: RowId) -> Result<Option<Vec<u8>>> {
        match self.load(page_id)? {
            BTreeNode::Leaf { mut entries } => {
                match entries.binary_search_by_key(&key, |(k, _)| *k) {
                    Ok(index) => {
                        let (_, removed) = entries.remove(index);
                        self.store_node(page_id, &BTreeNode::Leaf { entries })?;
                        Ok(Some(removed))
                    }
                    Err(_) => Ok(None),
                }
            }
            BTreeNode::Interior { keys, children } => {
                let index = child_index(&keys, key);
                let removed = self.delete_from(children[index], key)?;
                if removed.is_some() && self.load(children[index])?.is_underflow() {
                    self.rebalance(page_id, keys, children, index)?;
                }
                Ok(removed)
            }
        }
    }

    /// Fix an underfull child by merging it with a sibling, or by
    /// redistributing cells when the pair does not fit in one page.
    fn rebalance(
        &mut self,
        parent_page_id: PageId,
        mut keys: Vec<RowId>,
        mut children: Vec<PageId>,
        index: usize,
    ) -> Result<()> {
        if children.len() < 2 {
            return Ok(());
        }
        let left_index = if index > 0 { index - 1 } else { index };
        let left_page_id = children[left_index];
        let right_page_id = children[left_index + 1];
        let separator = keys[left_index];

        let merged = match (self.load(left_page_id)?, self.load(right_page_id)?) {
            (
                BTreeNode::Leaf { entries: mut left },
                BTreeNode::Leaf { entries: right },
            ) => {
                left.extend(right);
                BTreeNode::Leaf { entries: left }
            }
            (
                BTreeNode::Interior {
                    keys: mut left_keys,
                    children: mut left_children,
                },
                BTreeNode::Interior {
                    keys: right_keys,
                    children: right_children,
                },
            ) => {
                left_keys.push(separator);
                left_keys.extend(right_keys);
                left_children.extend(right_children);
                BTreeNode::Interior {
                    keys: left_keys,
                    children: left_children,
                }
            }
            _ => {
                return Err(DatabaseError::corruption(format!(
                    "siblings {} and {} are at different depths",
                    left_page_id, right_page_id
                )));
            }
        };

        if merged.used_space() <= USABLE_SPACE {
            self.store_node(left_page_id, &merged)?;
            self.store.free(right_page_id)?;
            keys.remove(left_index);
            children.remove(left_index + 1);
            trace!(left_page_id, right_page_id, "merged siblings");
        } else {
            let (left, new_separator, right) = merged.split();
            self.store_node(left_page_id, &left)?;
            self.store_node(right_page_id, &right)?;
            keys[left_index] = new_separator;
            trace!(left_page_id, right_page_id, "redistributed siblings");
        }

        if parent_page_id == self.root_page_id && keys.is_empty() {
            // Root is down to one child: pull it up into the root page.
            let only_child = children[0];
            let child = self.load(only_child)?;
            self.store_node(parent_page_id, &child)?;
            self.store.free(only_child)?;
            trace!(root = parent_page_id, "collapsed root");
            return Ok(());
        }

        self.store_node(parent_page_id, &BTreeNode::Interior { keys, children })
    }

    /// Largest key in the tree.
    pub fn last_key(&self) -> Result<Option<RowId>> {
        let mut page_id = self.root_page_id;
        loop {
            match self.load(page_id)? {
                BTreeNode::Leaf { entries } => return Ok(entries.last().map(|(k, _)| *k)),
                BTreeNode::Interior { children, .. } => {
                    page_id = children[children.len() - 1];
                }
            }
        }
    }

    /// Ascending entries with `low <= key <= high`.
    pub fn scan(&self, low: RowId, high: RowId) -> BTreeScan<'_> {
        BTreeScan {
            store: &*self.store,
            root_page_id: self.root_page_id,
            next_low: (low <= high).then_some(low),
            high,
            buffer: VecDeque::new(),
        }
    }

    pub fn scan_all(&self) -> BTreeScan<'_> {
        self.scan(RowId::MIN, RowId::MAX)
    }

    /// Free every page of the tree, root included.
    pub fn destroy(self) -> Result<usize> {
        let mut pending = vec![self.root_page_id];
        let mut freed = 0;
        while let Some(page_id) = pending.pop() {
            if let BTreeNode::Interior { children, .. } = self.load(page_id)? {
                pending.extend(children);
            }
            self.store.free(page_id)?;
            freed += 1;
        }
        trace!(root = self.root_page_id, pages = freed, "destroyed tree");
        Ok(freed)
    }
}

/// Index of the child whose range holds `key`.
fn child_index(keys: &[RowId], key: RowId) -> usize {
    keys.partition_point(|separator| *separator <= key)
}

/// Lazy range scan. Each refill descends from the root to the leaf that
/// holds the next key, so no page is held between leaves.
pub struct BTreeScan<'a> {
    store: &'a PageStore,
    root_page_id: PageId,
    next_low: Option<RowId>,
    high: RowId,
    buffer: VecDeque<(RowId, Vec<u8>)>,
}

impl BTreeScan<'_> {
    /// Load the leaf holding `low`; returns the leaf's upper fence key.
    fn fill(&mut self, low: RowId) -> Result<Option<RowId>> {
        let mut page_id = self.root_page_id;
        let mut upper_fence = None;
        loop {
            let page = self.store.read(page_id)?;
            match BTreeNode::decode(&page, page_id)? {
                BTreeNode::Leaf { entries } => {
                    self.buffer.extend(
                        entries
                            .into_iter()
                            .filter(|(k, _)| *k >= low && *k <= self.high),
                    );
                    return Ok(upper_fence);
                }
                BTreeNode::Interior { keys, children } => {
                    let index = child_index(&keys, low);
                    if let Some(&fence) = keys.get(index) {
                        upper_fence = Some(fence);
                    }
                    page_id = children[index];
                }
            }
        }
    }
}

impl Iterator for BTreeScan<'_> {
    type Item = Result<(RowId, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            let low = self.next_low?;
            match self.fill(low) {
                Ok(fence) => {
                    self.next_low = fence.filter(|fence| *fence <= self.high);
                }
                Err(error) => {
                    self.next_low = None;
                    return Some(Err(error));
                }
            }
        }
    }
}
