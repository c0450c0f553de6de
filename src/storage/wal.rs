use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    storage::page_store::PageStore,
    types::{
        PAGE_SIZE, PageId, SequenceNumber,
        error::{DatabaseError, Result},
        page::{Page, read_u32, read_u64},
    },
    utils::hash::{calculate_frame_checksum, calculate_header_checksum, verify_frame_checksum},
};

const WAL_MAGIC: &[u8; 8] = b"LMBRWAL\0";
const WAL_VERSION: u32 = 1;
pub const WAL_HEADER_SIZE: usize = 32;
pub const FRAME_HEADER_SIZE: usize = 32;
const PAGE_FRAME_PAYLOAD: usize = PAGE_SIZE * 2;

// Frame header layout
const FRAME_SEQUENCE_OFFSET: usize = 0;
const FRAME_PAGE_ID_OFFSET: usize = 8;
const FRAME_KIND_OFFSET: usize = 16;
const FRAME_PAYLOAD_LEN_OFFSET: usize = 20;
const FRAME_CHECKSUM_OFFSET: usize = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Page = 1,
    Commit = 2,
}

impl FrameKind {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(FrameKind::Page),
            2 => Some(FrameKind::Commit),
            _ => None,
        }
    }
}

/// A verified page frame from the log.
#[derive(Debug, Clone)]
pub struct WalFrame {
    pub sequence: SequenceNumber,
    pub page_id: PageId,
    pub before: Page,
    pub after: Page,
    pub checksum: u32,
}

/// Outcome of scanning the log for its committed prefix.
#[derive(Debug, Default)]
pub struct WalScan {
    pub frames: Vec<WalFrame>,
    /// Byte offset just past the last commit frame.
    pub valid_end: u64,
    pub last_sequence: SequenceNumber,
    /// Verified page frames with no commit frame after them.
    pub uncommitted_frames: usize,
    /// Bytes past `valid_end`, torn or uncommitted.
    pub discarded_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoveryReport {
    pub frames_replayed: usize,
    pub frames_discarded: usize,
    pub bytes_discarded: u64,
}

/// `<db>-wal`, next to the database file.
pub fn wal_path(db_path: &Path) -> PathBuf {
    let mut name = db_path.as_os_str().to_os_string();
    name.push("-wal");
    PathBuf::from(name)
}

/// Append-only log of page images, replayed into the database file at
/// checkpoint time.
///
/// Frames carry a contiguous sequence number starting at 1 after every
/// checkpoint, and a checksum salted with the checkpoint sequence, so
/// frames from an earlier log generation never verify.
pub struct Wal {
    path: PathBuf,
    file: File,
    checkpoint_seq: u64,
    next_sequence: SequenceNumber,
    end_offset: u64,
    committed_offset: u64,
    committed_sequence: SequenceNumber,
    pending_frames: usize,
    frames_since_checkpoint: usize,
}

impl Wal {
    /// Open the log belonging to a database whose header records
    /// `checkpoint_seq`. A missing, damaged or stale log is reset.
    pub fn open<P: AsRef<Path>>(path: P, checkpoint_seq: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        let mut wal = Self {
            path,
            file,
            checkpoint_seq,
            next_sequence: 1,
            end_offset: WAL_HEADER_SIZE as u64,
            committed_offset: WAL_HEADER_SIZE as u64,
            committed_sequence: 0,
            pending_frames: 0,
            frames_since_checkpoint: 0,
        };

        match wal.read_header()? {
            Some(seq) if seq == checkpoint_seq => {
                let scan = wal.read_committed()?;
                wal.end_offset = scan.valid_end;
                wal.committed_offset = scan.valid_end;
                wal.committed_sequence = scan.last_sequence;
                wal.next_sequence = scan.last_sequence + 1;
                wal.frames_since_checkpoint = scan.frames.len();
            }
            Some(seq) => {
                debug!(
                    wal_seq = seq,
                    db_seq = checkpoint_seq,
                    "log belongs to another checkpoint, resetting"
                );
                wal.reset(checkpoint_seq)?;
            }
            None => wal.reset(checkpoint_seq)?,
        }

        Ok(wal)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn checkpoint_seq(&self) -> u64 {
        self.checkpoint_seq
    }

    /// Committed page frames since the last checkpoint.
    pub fn frames_since_checkpoint(&self) -> usize {
        self.frames_since_checkpoint
    }

    /// Checkpoint sequence recorded in a valid header, `None` otherwise.
    fn read_header(&mut self) -> Result<Option<u64>> {
        let mut buffer = [0u8; WAL_HEADER_SIZE];
        self.file.seek(SeekFrom::Start(0))?;
        if self.file.read_exact(&mut buffer).is_err() {
            return Ok(None);
        }
        if &buffer[0..8] != WAL_MAGIC
            || read_u32(&buffer, 8) != WAL_VERSION
            || read_u32(&buffer, 12) != PAGE_SIZE as u32
            || calculate_header_checksum(&buffer[..28]) != read_u32(&buffer, 28)
        {
            warn!(path = %self.path.display(), "ignoring log with an invalid header");
            return Ok(None);
        }
        Ok(Some(read_u64(&buffer, 16)))
    }

    fn header_bytes(checkpoint_seq: u64) -> [u8; WAL_HEADER_SIZE] {
        let mut buffer = [0u8; WAL_HEADER_SIZE];
        buffer[0..8].copy_from_slice(WAL_MAGIC);
        buffer[8..12].copy_from_slice(&WAL_VERSION.to_le_bytes());
        buffer[12..16].copy_from_slice(&(PAGE_SIZE as u32).to_le_bytes());
        buffer[16..24].copy_from_slice(&checkpoint_seq.to_le_bytes());
        let checksum = calculate_header_checksum(&buffer[..28]);
        buffer[28..32].copy_from_slice(&checksum.to_le_bytes());
        buffer
    }

    /// Empty the log and start a new generation.
    fn reset(&mut self, checkpoint_seq: u64) -> Result<()> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&Self::header_bytes(checkpoint_seq))?;
        self.file.sync_all()?;

        self.checkpoint_seq = checkpoint_seq;
        self.next_sequence = 1;
        self.end_offset = WAL_HEADER_SIZE as u64;
        self.committed_offset = WAL_HEADER_SIZE as u64;
        self.committed_sequence = 0;
        self.pending_frames = 0;
        self.frames_since_checkpoint = 0;
        Ok(())
    }

    fn write_frame(
        &mut self,
        page_id: PageId,
        kind: FrameKind,
        payload: &[u8],
    ) -> Result<SequenceNumber> {
        let sequence = self.next_sequence;

        let mut header = [0u8; FRAME_HEADER_SIZE];
        header[FRAME_SEQUENCE_OFFSET..FRAME_SEQUENCE_OFFSET + 8]
            .copy_from_slice(&sequence.to_le_bytes());
        header[FRAME_PAGE_ID_OFFSET..FRAME_PAGE_ID_OFFSET + 8]
            .copy_from_slice(&page_id.to_le_bytes());
        header[FRAME_KIND_OFFSET] = kind as u8;
        header[FRAME_PAYLOAD_LEN_OFFSET..FRAME_PAYLOAD_LEN_OFFSET + 4]
            .copy_from_slice(&(payload.len() as u32).to_le_bytes());
        let checksum = calculate_frame_checksum(
            self.checkpoint_seq,
            &header[..FRAME_CHECKSUM_OFFSET],
            payload,
        );
        header[FRAME_CHECKSUM_OFFSET..FRAME_CHECKSUM_OFFSET + 4]
            .copy_from_slice(&checksum.to_le_bytes());

        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(payload);

        self.file.seek(SeekFrom::Start(self.end_offset))?;
        self.file.write_all(&frame)?;

        self.end_offset += frame.len() as u64;
        self.next_sequence += 1;
        Ok(sequence)
    }

    /// Log one page mutation. Not durable until [`Wal::commit`].
    pub fn append(&mut self, page_id: PageId, before: &Page, after: &Page) -> Result<SequenceNumber> {
        let mut payload = Vec::with_capacity(PAGE_FRAME_PAYLOAD);
        payload.extend_from_slice(before.as_bytes());
        payload.extend_from_slice(after.as_bytes());

        let sequence = self.write_frame(page_id, FrameKind::Page, &payload)?;
        self.pending_frames += 1;
        Ok(sequence)
    }

    /// Seal the frames appended since the last commit as one transaction.
    pub fn commit(&mut self, sync: bool) -> Result<SequenceNumber> {
        let sequence = self.write_frame(0, FrameKind::Commit, &[])?;
        if sync {
            self.file.sync_data()?;
        }

        debug!(sequence, frames = self.pending_frames, "committed transaction");
        self.committed_offset = self.end_offset;
        self.committed_sequence = sequence;
        self.frames_since_checkpoint += self.pending_frames;
        self.pending_frames = 0;
        Ok(sequence)
    }

    /// Drop frames appended since the last commit.
    pub fn discard_pending(&mut self) -> Result<()> {
        self.file.set_len(self.committed_offset)?;
        self.end_offset = self.committed_offset;
        self.next_sequence = self.committed_sequence + 1;
        self.pending_frames = 0;
        Ok(())
    }

    /// Scan the log and collect the page frames of fully committed
    /// transactions, in sequence order. Scanning stops at the first torn
    /// frame, checksum mismatch or sequence gap; nothing after that point
    /// is trusted.
    pub fn read_committed(&mut self) -> Result<WalScan> {
        let mut bytes = Vec::new();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_end(&mut bytes)?;

        let mut scan = WalScan {
            valid_end: WAL_HEADER_SIZE as u64,
            ..WalScan::default()
        };
        let mut pending = Vec::new();
        let mut offset = WAL_HEADER_SIZE;
        let mut expected_sequence: SequenceNumber = 1;

        while offset + FRAME_HEADER_SIZE <= bytes.len() {
            let header = &bytes[offset..offset + FRAME_HEADER_SIZE];
            let sequence = read_u64(header, FRAME_SEQUENCE_OFFSET);
            let page_id = read_u64(header, FRAME_PAGE_ID_OFFSET);
            let payload_len = read_u32(header, FRAME_PAYLOAD_LEN_OFFSET) as usize;
            let checksum = read_u32(header, FRAME_CHECKSUM_OFFSET);

            let payload_start = offset + FRAME_HEADER_SIZE;
            let Some(payload) = bytes.get(payload_start..payload_start + payload_len) else {
                break;
            };
            if !verify_frame_checksum(
                self.checkpoint_seq,
                &header[..FRAME_CHECKSUM_OFFSET],
                payload,
                checksum,
            ) {
                break;
            }
            if sequence != expected_sequence {
                break;
            }

            match FrameKind::from_u8(header[FRAME_KIND_OFFSET]) {
                Some(FrameKind::Page) if payload_len == PAGE_FRAME_PAYLOAD => {
                    pending.push(WalFrame {
                        sequence,
                        page_id,
                        before: Page::from_bytes(&payload[..PAGE_SIZE])?,
                        after: Page::from_bytes(&payload[PAGE_SIZE..])?,
                        checksum,
                    });
                }
                Some(FrameKind::Commit) if payload_len == 0 => {
                    scan.frames.append(&mut pending);
                    scan.valid_end = (payload_start + payload_len) as u64;
                    scan.last_sequence = sequence;
                }
                _ => break,
            }

            offset = payload_start + payload_len;
            expected_sequence += 1;
        }

        scan.uncommitted_frames = pending.len();
        scan.discarded_bytes = bytes.len() as u64 - scan.valid_end;
        Ok(scan)
    }

    /// Install the after-image of every committed frame, in sequence
    /// order. Running it twice leaves the store exactly as running it once.
    pub fn replay(&mut self, store: &mut PageStore) -> Result<usize> {
        let scan = self.read_committed()?;
        let replayed = scan.frames.len();
        for frame in scan.frames {
            store.apply(frame.page_id, frame.after)?;
        }
        Ok(replayed)
    }

    /// Replay the log into the database file, then truncate the log.
    pub fn checkpoint(&mut self, store: &mut PageStore) -> Result<usize> {
        if store.in_transaction() {
            return Err(DatabaseError::corruption(
                "checkpoint requested inside a transaction",
            ));
        }

        let replayed = self.replay(store)?;
        let next_seq = self.checkpoint_seq + 1;
        store.set_checkpoint_seq(next_seq);
        store.flush()?;
        self.reset(next_seq)?;

        info!(
            frames = replayed,
            checkpoint_seq = next_seq,
            "checkpoint complete"
        );
        Ok(replayed)
    }

    /// Bring the database file up to date at mount time. Damaged or
    /// uncommitted log tails are dropped, never reported as errors.
    pub fn recover(&mut self, store: &mut PageStore) -> Result<RecoveryReport> {
        let scan = self.read_committed()?;
        let report = RecoveryReport {
            frames_replayed: scan.frames.len(),
            frames_discarded: scan.uncommitted_frames,
            bytes_discarded: scan.discarded_bytes,
        };

        if report.bytes_discarded > 0 {
            warn!(
                frames = report.frames_discarded,
                bytes = report.bytes_discarded,
                "discarding incomplete log tail"
            );
        }

        if report.frames_replayed > 0 || report.bytes_discarded > 0 {
            self.checkpoint(store)?;
            info!(frames = report.frames_replayed, "recovered database from log");
        }

        Ok(report)
    }
}
