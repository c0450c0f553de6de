use crate::types::{
    PAGE_SIZE, PageId, RowId,
    error::{DatabaseError, Result},
    page::{Page, PageType},
};

const CELL_COUNT_OFFSET: usize = 2;
const RIGHT_CHILD_OFFSET: usize = 4;
const NODE_HEADER_SIZE: usize = 16;

/// Bytes available for cells in one node page.
pub const USABLE_SPACE: usize = PAGE_SIZE - NODE_HEADER_SIZE;
/// key(8) + value length(2)
pub const LEAF_CELL_OVERHEAD: usize = 10;
/// key(8) + left child(8)
pub const INTERIOR_CELL_SIZE: usize = 16;
/// Largest leaf cell. Four of them always fit, so any split leaves two
/// valid halves.
pub const MAX_CELL_SIZE: usize = USABLE_SPACE / 4;
pub const MAX_VALUE_SIZE: usize = MAX_CELL_SIZE - LEAF_CELL_OVERHEAD;
/// Non-root nodes below this many cell bytes are rebalanced.
pub const MIN_FILL: usize = USABLE_SPACE / 4;

/// Decoded form of a B-tree node page.
///
/// Interior nodes keep `children.len() == keys.len() + 1`; every key `k`
/// under `children[i]` satisfies `keys[i - 1] <= k < keys[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BTreeNode {
    Leaf {
        entries: Vec<(RowId, Vec<u8>)>,
    },
    Interior {
        keys: Vec<RowId>,
        children: Vec<PageId>,
    },
}

impl BTreeNode {
    pub fn empty_leaf() -> Self {
        BTreeNode::Leaf {
            entries: Vec::new(),
        }
    }

    /// Cell bytes this node occupies once encoded.
    pub fn used_space(&self) -> usize {
        match self {
            BTreeNode::Leaf { entries } => entries
                .iter()
                .map(|(_, value)| LEAF_CELL_OVERHEAD + value.len())
                .sum(),
            BTreeNode::Interior { keys, .. } => keys.len() * INTERIOR_CELL_SIZE,
        }
    }

    pub fn is_overflow(&self) -> bool {
        self.used_space() > USABLE_SPACE
    }

    pub fn is_underflow(&self) -> bool {
        self.used_space() < MIN_FILL
    }

    pub fn encode(&self) -> Page {
        let mut page = Page::new();
        let mut offset = NODE_HEADER_SIZE;

        match self {
            BTreeNode::Leaf { entries } => {
                page.as_bytes_mut()[0] = PageType::LeafTable.as_u8();
                page.put_u16(CELL_COUNT_OFFSET, entries.len() as u16);
                for (key, value) in entries {
                    page.put_i64(offset, *key);
                    page.put_u16(offset + 8, value.len() as u16);
                    let start = offset + LEAF_CELL_OVERHEAD;
                    page.as_bytes_mut()[start..start + value.len()].copy_from_slice(value);
                    offset = start + value.len();
                }
            }
            BTreeNode::Interior { keys, children } => {
                page.as_bytes_mut()[0] = PageType::InteriorTable.as_u8();
                page.put_u16(CELL_COUNT_OFFSET, keys.len() as u16);
                page.put_u64(RIGHT_CHILD_OFFSET, children[keys.len()]);
                for (key, child) in keys.iter().zip(children) {
                    page.put_i64(offset, *key);
                    page.put_u64(offset + 8, *child);
                    offset += INTERIOR_CELL_SIZE;
                }
            }
        }

        page
    }

    pub fn decode(page: &Page, page_id: PageId) -> Result<Self> {
        let cell_count = page.get_u16(CELL_COUNT_OFFSET) as usize;
        let bytes = page.as_bytes();
        let mut offset = NODE_HEADER_SIZE;

        match page.page_type() {
            Some(PageType::LeafTable) => {
                let mut entries = Vec::with_capacity(cell_count);
                for _ in 0..cell_count {
                    if offset + LEAF_CELL_OVERHEAD > PAGE_SIZE {
                        return Err(cell_overrun(page_id));
                    }
                    let key = page.get_i64(offset);
                    let length = page.get_u16(offset + 8) as usize;
                    let start = offset + LEAF_CELL_OVERHEAD;
                    let value = bytes
                        .get(start..start + length)
                        .ok_or_else(|| cell_overrun(page_id))?;
                    entries.push((key, value.to_vec()));
                    offset = start + length;
                }
                Ok(BTreeNode::Leaf { entries })
            }
            Some(PageType::InteriorTable) => {
                if offset + cell_count * INTERIOR_CELL_SIZE > PAGE_SIZE {
                    return Err(cell_overrun(page_id));
                }
                let mut keys = Vec::with_capacity(cell_count);
                let mut children = Vec::with_capacity(cell_count + 1);
                for _ in 0..cell_count {
                    keys.push(page.get_i64(offset));
                    children.push(page.get_u64(offset + 8));
                    offset += INTERIOR_CELL_SIZE;
                }
                children.push(page.get_u64(RIGHT_CHILD_OFFSET));
                Ok(BTreeNode::Interior { keys, children })
            }
            other => Err(DatabaseError::corruption(format!(
                "page {} is not a B-tree node (type {:?})",
                page_id, other
            ))),
        }
    }

    /// Split an overflowing node into two halves and the separator that
    /// goes between them. Leaves split by bytes, interiors by key count.
    pub fn split(self) -> (BTreeNode, RowId, BTreeNode) {
        match self {
            BTreeNode::Leaf { mut entries } => {
                let at = leaf_split_point(&entries);
                let right = entries.split_off(at);
                let separator = right[0].0;
                (
                    BTreeNode::Leaf { entries },
                    separator,
                    BTreeNode::Leaf { entries: right },
                )
            }
            BTreeNode::Interior {
                mut keys,
                mut children,
            } => {
                let middle = keys.len() / 2;
                let right_keys = keys.split_off(middle + 1);
                let separator = keys.pop().unwrap_or_default();
                let right_children = children.split_off(middle + 1);
                (
                    BTreeNode::Interior { keys, children },
                    separator,
                    BTreeNode::Interior {
                        keys: right_keys,
                        children: right_children,
                    },
                )
            }
        }
    }
}

/// First index of the right half: the point where the left half first
/// reaches half of the total bytes. Always leaves both halves non-empty.
fn leaf_split_point(entries: &[(RowId, Vec<u8>)]) -> usize {
    let total: usize = entries
        .iter()
        .map(|(_, value)| LEAF_CELL_OVERHEAD + value.len())
        .sum();
    let mut running = 0;
    for (index, (_, value)) in entries.iter().enumerate() {
        running += LEAF_CELL_OVERHEAD + value.len();
        if running * 2 >= total {
            return (index + 1).clamp(1, entries.len().saturating_sub(1).max(1));
        }
    }
    entries.len() / 2
}

fn cell_overrun(page_id: PageId) -> DatabaseError {
    DatabaseError::corruption(format!("cells of page {} run past the page end", page_id))
}
