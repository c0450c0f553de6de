use crate::{
    storage::LEMBAR_MAGIC,
    types::{
        CATALOG_ROOT_PAGE_ID, HEADER_SIZE, PAGE_SIZE, PageId,
        error::DatabaseError,
        page::{Page, read_u32, read_u64},
    },
    utils::hash::calculate_header_checksum,
};

const FILE_FORMAT_VERSION: u8 = 1;

// Byte offsets inside page 0
const MAGIC_OFFSET: usize = 0;
const PAGE_SIZE_OFFSET: usize = 16;
const FORMAT_VERSION_OFFSET: usize = 20;
const PAGE_COUNT_OFFSET: usize = 24;
const FREELIST_HEAD_OFFSET: usize = 32;
const FREELIST_COUNT_OFFSET: usize = 40;
const CHECKPOINT_SEQ_OFFSET: usize = 48;
const CHANGE_COUNTER_OFFSET: usize = 56;
const CATALOG_ROOT_OFFSET: usize = 60;
const CHECKSUM_OFFSET: usize = 68;

/// Database file header, stored in the first bytes of page 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 16],
    pub page_size: u32,
    pub file_format_version: u8,
    /// Pages in the file, header page included.
    pub page_count: u64,
    /// Head of the LIFO free list, 0 when empty.
    pub freelist_head: PageId,
    pub freelist_count: u64,
    /// WAL state pointer: sequence of the last completed checkpoint.
    pub checkpoint_seq: u64,
    pub change_counter: u32,
    pub catalog_root: PageId,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            magic: *LEMBAR_MAGIC,
            page_size: PAGE_SIZE as u32,
            file_format_version: FILE_FORMAT_VERSION,
            page_count: CATALOG_ROOT_PAGE_ID + 1,
            freelist_head: 0,
            freelist_count: 0,
            checkpoint_seq: 0,
            change_counter: 1,
            catalog_root: CATALOG_ROOT_PAGE_ID,
        }
    }
}

impl FileHeader {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; HEADER_SIZE];

        buffer[MAGIC_OFFSET..MAGIC_OFFSET + 16].copy_from_slice(&self.magic);
        buffer[PAGE_SIZE_OFFSET..PAGE_SIZE_OFFSET + 4].copy_from_slice(&self.page_size.to_le_bytes());
        buffer[FORMAT_VERSION_OFFSET] = self.file_format_version;
        buffer[PAGE_COUNT_OFFSET..PAGE_COUNT_OFFSET + 8]
            .copy_from_slice(&self.page_count.to_le_bytes());
        buffer[FREELIST_HEAD_OFFSET..FREELIST_HEAD_OFFSET + 8]
            .copy_from_slice(&self.freelist_head.to_le_bytes());
        buffer[FREELIST_COUNT_OFFSET..FREELIST_COUNT_OFFSET + 8]
            .copy_from_slice(&self.freelist_count.to_le_bytes());
        buffer[CHECKPOINT_SEQ_OFFSET..CHECKPOINT_SEQ_OFFSET + 8]
            .copy_from_slice(&self.checkpoint_seq.to_le_bytes());
        buffer[CHANGE_COUNTER_OFFSET..CHANGE_COUNTER_OFFSET + 4]
            .copy_from_slice(&self.change_counter.to_le_bytes());
        buffer[CATALOG_ROOT_OFFSET..CATALOG_ROOT_OFFSET + 8]
            .copy_from_slice(&self.catalog_root.to_le_bytes());

        let checksum = calculate_header_checksum(&buffer[..CHECKSUM_OFFSET]);
        buffer[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&checksum.to_le_bytes());

        buffer
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DatabaseError> {
        if bytes.len() < HEADER_SIZE {
            return Err(DatabaseError::Open {
                reason: "header too short".to_string(),
            });
        }

        let mut magic = [0u8; 16];
        magic.copy_from_slice(&bytes[MAGIC_OFFSET..MAGIC_OFFSET + 16]);
        if &magic != LEMBAR_MAGIC {
            return Err(DatabaseError::Open {
                reason: "not a lembar database (bad magic)".to_string(),
            });
        }

        let stored_checksum = read_u32(bytes, CHECKSUM_OFFSET);
        if calculate_header_checksum(&bytes[..CHECKSUM_OFFSET]) != stored_checksum {
            return Err(DatabaseError::Open {
                reason: "header checksum mismatch".to_string(),
            });
        }

        let page_size = read_u32(bytes, PAGE_SIZE_OFFSET);
        if page_size != PAGE_SIZE as u32 {
            return Err(DatabaseError::Open {
                reason: format!("unsupported page size: {}", page_size),
            });
        }

        let file_format_version = bytes[FORMAT_VERSION_OFFSET];
        if file_format_version > FILE_FORMAT_VERSION {
            return Err(DatabaseError::Open {
                reason: format!("unsupported file format version: {}", file_format_version),
            });
        }

        let header = Self {
            magic,
            page_size,
            file_format_version,
            page_count: read_u64(bytes, PAGE_COUNT_OFFSET),
            freelist_head: read_u64(bytes, FREELIST_HEAD_OFFSET),
            freelist_count: read_u64(bytes, FREELIST_COUNT_OFFSET),
            checkpoint_seq: read_u64(bytes, CHECKPOINT_SEQ_OFFSET),
            change_counter: read_u32(bytes, CHANGE_COUNTER_OFFSET),
            catalog_root: read_u64(bytes, CATALOG_ROOT_OFFSET),
        };

        if header.page_count <= header.catalog_root {
            return Err(DatabaseError::Open {
                reason: format!("page count {} is too small", header.page_count),
            });
        }

        Ok(header)
    }

    /// The header as a full page 0 image.
    pub fn to_page(&self) -> Page {
        let mut page = Page::new();
        page.as_bytes_mut()[..HEADER_SIZE].copy_from_slice(&self.to_bytes());
        page
    }
}
