use std::fmt;

use crate::types::{PAGE_SIZE, PageId, error::DatabaseError};

/// Type tag stored in the first byte of every non-header page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Allocated but not yet initialised by its owner.
    Blank = 0,
    /// On the free list.
    Free = 1,
    InteriorTable = 5,
    LeafTable = 13,
}

impl PageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PageType::Blank),
            1 => Some(PageType::Free),
            5 => Some(PageType::InteriorTable),
            13 => Some(PageType::LeafTable),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/*
 * Every page is a PAGE_SIZE byte buffer. The layout of its contents
 * belongs to the owner:
 *
 *   page 0          file header (storage::header)
 *   free pages      type(1) | reserved(7) | next_free(8)
 *   B-tree nodes    see storage::node
 */
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    data: Box<[u8]>,
}

impl Page {
    pub fn new() -> Self {
        Self {
            data: vec![0u8; PAGE_SIZE].into_boxed_slice(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DatabaseError> {
        if bytes.len() != PAGE_SIZE {
            return Err(DatabaseError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            data: bytes.to_vec().into_boxed_slice(),
        })
    }

    /// A free-list page pointing at the next free page (0 ends the list).
    pub fn free_list_entry(next_free: PageId) -> Self {
        let mut page = Self::new();
        page.data[0] = PageType::Free.as_u8();
        page.put_u64(8, next_free);
        page
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn page_type(&self) -> Option<PageType> {
        PageType::from_u8(self.data[0])
    }

    pub fn is_free(&self) -> bool {
        self.data[0] == PageType::Free.as_u8()
    }

    pub fn get_u16(&self, offset: usize) -> u16 {
        read_u16(&self.data, offset)
    }

    pub fn get_u64(&self, offset: usize) -> u64 {
        read_u64(&self.data, offset)
    }

    pub fn get_i64(&self, offset: usize) -> i64 {
        read_u64(&self.data, offset) as i64
    }

    pub fn put_u16(&mut self, offset: usize, value: u16) {
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_u64(&mut self, offset: usize, value: u64) {
        self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    pub fn put_i64(&mut self, offset: usize, value: i64) {
        self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("page_type", &self.page_type())
            .field("checksum", &crc32fast::hash(&self.data))
            .finish()
    }
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

pub(crate) fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}
