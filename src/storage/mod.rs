pub mod bplus_tree;
pub mod catalog;
pub mod header;
pub mod node;
pub mod page_store;
pub mod schema;
pub mod wal;

const LEMBAR_MAGIC: &[u8; 16] = b"LEMBAR DB v0.1\0\0";
