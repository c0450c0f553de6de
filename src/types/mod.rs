pub mod error;
pub mod page;
pub mod row;
pub mod value;

// Common type aliases
pub type PageId = u64;
pub type RowId = i64;
pub type SequenceNumber = u64;

pub const PAGE_SIZE: usize = 4096;
pub const HEADER_SIZE: usize = 100; // Database header size, at the start of page 0

pub const HEADER_PAGE_ID: PageId = 0;
pub const CATALOG_ROOT_PAGE_ID: PageId = 1;
