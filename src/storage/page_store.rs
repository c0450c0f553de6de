use std::{
    collections::{BTreeMap, HashMap},
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, trace};

use crate::{
    storage::{header::FileHeader, node::BTreeNode},
    types::{
        CATALOG_ROOT_PAGE_ID, HEADER_PAGE_ID, HEADER_SIZE, PAGE_SIZE, PageId,
        error::{DatabaseError, Result},
        page::Page,
    },
};

/// One page touched by the running transaction.
#[derive(Debug, Clone)]
pub struct PageChange {
    pub page_id: PageId,
    pub before: Page,
    pub after: Page,
}

#[derive(Debug, Default)]
struct PageTransaction {
    /// Image of each touched page before its first change. `None` marks a
    /// page that did not exist yet (the file was extended).
    before: BTreeMap<PageId, Option<Page>>,
}

/// Fixed-size page allocation over a single database file.
///
/// Writes are buffered in memory; the file itself is only written by
/// [`PageStore::flush`], which the WAL calls at checkpoint time.
pub struct PageStore {
    path: PathBuf,
    file: File,
    header: FileHeader,
    dirty: HashMap<PageId, Page>,
    transaction: Option<PageTransaction>,
}

impl PageStore {
    /// Mount an existing database file, or create a fresh one when the
    /// path is missing or empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_new = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len() == 0,
            Err(_) => true,
        };
        if is_new {
            return Self::create(path);
        }

        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut header_buffer = vec![0u8; HEADER_SIZE];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header_buffer)
            .map_err(|_| DatabaseError::Open {
                reason: "file is shorter than the database header".to_string(),
            })?;
        if header_buffer.iter().all(|&byte| byte == 0) {
            // The header is written last, so creation never finished.
            debug!(path = %path.display(), "header never written, recreating file");
            drop(file);
            return Self::create(path);
        }
        let header = FileHeader::from_bytes(&header_buffer)?;

        debug!(
            path = %path.display(),
            page_count = header.page_count,
            free_pages = header.freelist_count,
            "mounted database file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            header,
            dirty: HashMap::new(),
            transaction: None,
        })
    }

    fn create(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let header = FileHeader::default();
        let catalog_root = BTreeNode::empty_leaf().encode();
        file.seek(SeekFrom::Start(PAGE_SIZE as u64))?;
        file.write_all(catalog_root.as_bytes())?;
        file.sync_data()?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(header.to_page().as_bytes())?;
        file.sync_all()?;

        debug!(path = %path.display(), "created database file");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            header,
            dirty: HashMap::new(),
            transaction: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn page_count(&self) -> u64 {
        self.header.page_count
    }

    pub fn free_page_count(&self) -> u64 {
        self.header.freelist_count
    }

    pub fn catalog_root(&self) -> PageId {
        self.header.catalog_root
    }

    fn page_offset(page_id: PageId) -> u64 {
        page_id * PAGE_SIZE as u64
    }

    /// Current image of a page, without the free-page check.
    fn current_image(&self, page_id: PageId) -> Result<Page> {
        if page_id == HEADER_PAGE_ID {
            return Ok(self.header.to_page());
        }
        if page_id >= self.header.page_count {
            return Err(DatabaseError::InvalidPageId(page_id));
        }
        if let Some(page) = self.dirty.get(&page_id) {
            return Ok(page.clone());
        }

        let mut buffer = vec![0u8; PAGE_SIZE];
        let mut file = &self.file;
        file.seek(SeekFrom::Start(Self::page_offset(page_id)))?;
        file.read_exact(&mut buffer)?;
        Page::from_bytes(&buffer)
    }

    /// Read a live page. Freed pages are invalid until reallocated.
    pub fn read(&self, page_id: PageId) -> Result<Page> {
        let page = self.current_image(page_id)?;
        if page_id != HEADER_PAGE_ID && page.is_free() {
            return Err(DatabaseError::InvalidPageId(page_id));
        }
        Ok(page)
    }

    /// Buffer a new image for a live page. Page 0 belongs to the store.
    pub fn write(&mut self, page_id: PageId, page: Page) -> Result<()> {
        if page_id == HEADER_PAGE_ID || page_id >= self.header.page_count {
            return Err(DatabaseError::InvalidPageId(page_id));
        }
        if self.current_image(page_id)?.is_free() {
            return Err(DatabaseError::InvalidPageId(page_id));
        }
        self.touch(page_id)?;
        self.dirty.insert(page_id, page);
        Ok(())
    }

    /// Hand out a blank page, reusing the most recently freed one first.
    pub fn allocate(&mut self) -> Result<PageId> {
        self.touch(HEADER_PAGE_ID)?;

        let page_id = if self.header.freelist_head != 0 {
            let page_id = self.header.freelist_head;
            let free_page = self.current_image(page_id)?;
            if !free_page.is_free() {
                return Err(DatabaseError::corruption(format!(
                    "free list head {} is not a free page",
                    page_id
                )));
            }
            self.touch(page_id)?;
            self.header.freelist_head = free_page.get_u64(8);
            self.header.freelist_count = self.header.freelist_count.saturating_sub(1);
            page_id
        } else {
            let page_id = self.header.page_count;
            self.touch(page_id)?;
            self.header.page_count += 1;
            page_id
        };

        self.dirty.insert(page_id, Page::new());
        self.stage_header();

        trace!(page_id, page_count = self.header.page_count, "allocated page");
        Ok(page_id)
    }

    /// Return a page to the head of the free list.
    pub fn free(&mut self, page_id: PageId) -> Result<()> {
        if page_id == HEADER_PAGE_ID
            || page_id == CATALOG_ROOT_PAGE_ID
            || page_id >= self.header.page_count
        {
            return Err(DatabaseError::InvalidPageId(page_id));
        }
        if self.current_image(page_id)?.is_free() {
            return Err(DatabaseError::InvalidPageId(page_id));
        }

        self.touch(HEADER_PAGE_ID)?;
        self.touch(page_id)?;
        self.dirty
            .insert(page_id, Page::free_list_entry(self.header.freelist_head));
        self.header.freelist_head = page_id;
        self.header.freelist_count += 1;
        self.stage_header();

        trace!(page_id, free_pages = self.header.freelist_count, "freed page");
        Ok(())
    }

    fn stage_header(&mut self) {
        self.dirty.insert(HEADER_PAGE_ID, self.header.to_page());
    }

    /// Remember the pre-transaction image of a page the first time it is
    /// touched.
    fn touch(&mut self, page_id: PageId) -> Result<()> {
        let needs_image = match &self.transaction {
            Some(transaction) => !transaction.before.contains_key(&page_id),
            None => false,
        };
        if !needs_image {
            return Ok(());
        }

        let image = if page_id < self.header.page_count || page_id == HEADER_PAGE_ID {
            Some(self.current_image(page_id)?)
        } else {
            None
        };
        if let Some(transaction) = self.transaction.as_mut() {
            transaction.before.insert(page_id, image);
        }
        Ok(())
    }

    pub fn begin(&mut self) {
        if self.transaction.is_none() {
            self.transaction = Some(PageTransaction::default());
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Before/after images of every page the running transaction changed,
    /// in page order.
    pub fn pending_changes(&self) -> Result<Vec<PageChange>> {
        let Some(transaction) = &self.transaction else {
            return Ok(Vec::new());
        };

        let mut changes = Vec::with_capacity(transaction.before.len());
        for (&page_id, before) in &transaction.before {
            let after = self.current_image(page_id)?;
            let before = before.clone().unwrap_or_default();
            if before != after {
                changes.push(PageChange {
                    page_id,
                    before,
                    after,
                });
            }
        }
        Ok(changes)
    }

    /// Keep the transaction's changes; they stay buffered until flushed.
    pub fn end_transaction(&mut self) {
        self.transaction = None;
    }

    /// Put every touched page back to its pre-transaction image.
    pub fn rollback(&mut self) -> Result<()> {
        let Some(transaction) = self.transaction.take() else {
            return Ok(());
        };

        let restored = transaction.before.len();
        for (page_id, before) in transaction.before {
            match before {
                Some(page) => {
                    if page_id == HEADER_PAGE_ID {
                        self.header = FileHeader::from_bytes(page.as_bytes())?;
                    }
                    self.dirty.insert(page_id, page);
                }
                None => {
                    self.dirty.remove(&page_id);
                }
            }
        }

        debug!(pages = restored, "rolled back transaction");
        Ok(())
    }

    /// Install a page image as-is. Used by WAL replay, which may also
    /// carry page 0.
    pub fn apply(&mut self, page_id: PageId, page: Page) -> Result<()> {
        if page_id == HEADER_PAGE_ID {
            self.header = FileHeader::from_bytes(page.as_bytes())?;
        }
        self.dirty.insert(page_id, page);
        Ok(())
    }

    pub fn set_checkpoint_seq(&mut self, checkpoint_seq: u64) {
        self.header.checkpoint_seq = checkpoint_seq;
        self.header.change_counter = self.header.change_counter.wrapping_add(1);
        self.stage_header();
    }

    pub fn dirty_page_count(&self) -> usize {
        self.dirty.len()
    }

    /// Write all buffered pages into the database file and sync it. Page 0
    /// goes last so a header on disk never points past pages that are not.
    pub fn flush(&mut self) -> Result<()> {
        if self.dirty.is_empty() {
            return Ok(());
        }

        let mut page_ids: Vec<PageId> = self
            .dirty
            .keys()
            .copied()
            .filter(|&page_id| page_id != HEADER_PAGE_ID)
            .collect();
        page_ids.sort_unstable();

        for page_id in &page_ids {
            if let Some(page) = self.dirty.get(page_id) {
                self.file.seek(SeekFrom::Start(Self::page_offset(*page_id)))?;
                self.file.write_all(page.as_bytes())?;
            }
        }
        self.file
            .set_len(self.header.page_count * PAGE_SIZE as u64)?;
        self.file.sync_data()?;

        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(self.header.to_page().as_bytes())?;
        self.file.sync_all()?;

        debug!(pages = page_ids.len() + 1, "flushed pages to database file");
        self.dirty.clear();
        Ok(())
    }
}
