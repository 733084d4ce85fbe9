//! Append-only numbered block files (C4).
//!
//! Mirrors the append-only `tsBlock` stream the chain-state core reads
//! block and transaction records out of: one writer appends whole
//! [`chain_types::Block`] records to the current file, rolling over to a
//! fresh file once the threshold is hit, and `(file_no, offset)` pairs
//! recorded in [`crate::tables::TxIndex`]/[`chain_types::BlockIndex`]
//! address records back into this stream. Files already written are
//! never rewritten; the only way bytes leave the store is prune.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chain_types::{Block, Decode, Encode, Transaction};

use crate::error::KvError;

/// Rolls over to a new numbered file once the current one exceeds this
/// size. 128 MiB, matching the chain's typical block file granularity.
pub const DEFAULT_ROLLOVER_BYTES: u64 = 128 * 1024 * 1024;

fn file_name(file_no: u32) -> String {
    format!("blk{file_no:08}.dat")
}

/// The append-only block file store, rooted at `<data>/block/`.
///
/// Every [`FileStore::write_block`] call is serialized through the
/// internal mutex — the chain core's single writer lock (§5) is the
/// outer guarantee; this one protects the file handle itself from
/// concurrent `std::fs` access within the process.
pub struct FileStore {
    dir: PathBuf,
    rollover_bytes: u64,
    writer: Mutex<WriterState>,
}

struct WriterState {
    file_no: u32,
    file: File,
    len: u64,
}

/// Where a record begins: the file it lives in and its byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilePos {
    pub file_no: u32,
    pub offset: u64,
}

impl FileStore {
    /// Opens (creating if needed) the block file store under `dir`,
    /// resuming appends at the highest-numbered existing file.
    ///
    /// # Errors
    /// Propagates any I/O error creating `dir` or opening/seeking its
    /// current file.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, KvError> {
        Self::open_with_rollover(dir, DEFAULT_ROLLOVER_BYTES)
    }

    /// As [`FileStore::open`], with a non-default rollover threshold.
    ///
    /// # Errors
    /// As [`FileStore::open`].
    pub fn open_with_rollover(dir: impl Into<PathBuf>, rollover_bytes: u64) -> Result<Self, KvError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let file_no = latest_file_no(&dir)?;
        let file = OpenOptions::new().create(true).read(true).append(true).open(dir.join(file_name(file_no)))?;
        let len = file.metadata()?.len();

        Ok(Self {
            dir,
            rollover_bytes,
            writer: Mutex::new(WriterState { file_no, file, len }),
        })
    }

    /// Appends `block`'s canonical encoding, rolling over to a new file
    /// first if the current one has reached the rollover threshold.
    ///
    /// Returns the block record's `(file_no, offset)`. The mint
    /// transaction's own offset (for [`crate::tables::TxIndex`]) is
    /// `result.offset + header_len`, where `header_len` is the length of
    /// [`Block::header_bytes`]'s length-prefixed encoding preceding it —
    /// callers reconstruct it from the encoded bytes, not by re-deriving
    /// the header length independently.
    ///
    /// # Errors
    /// Propagates any I/O error writing or rolling over the file.
    pub fn write_block(&self, block: &Block) -> Result<FilePos, KvError> {
        let bytes = block.to_bytes();
        self.write_record(&bytes)
    }

    /// Appends a standalone transaction record (used for mempool
    /// spillover / orphan storage, not for transactions already embedded
    /// in a written block).
    ///
    /// # Errors
    /// Propagates any I/O error writing or rolling over the file.
    pub fn write_tx(&self, tx: &Transaction) -> Result<FilePos, KvError> {
        self.write_record(&tx.to_bytes())
    }

    fn write_record(&self, bytes: &[u8]) -> Result<FilePos, KvError> {
        let mut state = self.writer.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        #[allow(clippy::cast_possible_truncation)]
        let record_len = bytes.len() as u64;
        if state.len > 0 && state.len + record_len > self.rollover_bytes {
            let next_no = state.file_no + 1;
            let file = OpenOptions::new().create(true).read(true).append(true).open(self.dir.join(file_name(next_no)))?;
            tracing::debug!(from = state.file_no, to = next_no, "rolling over block file");
            *state = WriterState { file_no: next_no, file, len: 0 };
        }

        let pos = FilePos { file_no: state.file_no, offset: state.len };
        state.file.write_all(bytes)?;
        state.file.flush()?;
        state.len += record_len;
        Ok(pos)
    }

    /// Reads the full block record starting at `pos`.
    ///
    /// # Errors
    /// Propagates any I/O error opening/reading the file, or a codec
    /// error if the bytes at `pos` don't decode as a [`Block`].
    pub fn read_block(&self, pos: FilePos) -> Result<Block, KvError> {
        let bytes = self.read_raw(pos)?;
        Ok(Block::decode(&mut bytes.as_slice())?)
    }

    /// Reads a single transaction record starting at `pos`.
    ///
    /// # Errors
    /// Propagates any I/O error opening/reading the file, or a codec
    /// error if the bytes at `pos` don't decode as a [`Transaction`].
    pub fn read_tx(&self, pos: FilePos) -> Result<Transaction, KvError> {
        let bytes = self.read_raw(pos)?;
        Ok(Transaction::decode(&mut bytes.as_slice())?)
    }

    /// Reads the raw bytes of whatever [`Encode`] record was written at
    /// `pos`, without knowing its type ahead of time: opens the record's
    /// file read-only, seeks to `pos.offset`, then reads exactly as many
    /// bytes as the record's own length framing declares.
    fn read_raw(&self, pos: FilePos) -> Result<Vec<u8>, KvError> {
        let mut file = File::open(self.dir.join(file_name(pos.file_no)))?;
        file.seek(SeekFrom::Start(pos.offset))?;

        // Every top-level record is itself length-prefixed by its first
        // `Vec`/`Destination`-bearing field's framing indirectly, so the
        // simplest robust read is: read the rest of the file and let
        // `decode_exact`-style callers bound their own consumption. We
        // instead read incrementally: most records are small relative to
        // a rollover file, so read up to the remainder of the file and
        // hand the caller's `Decode` impl the prefix it needs.
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// The directory this store is rooted at.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn latest_file_no(dir: &Path) -> Result<u32, KvError> {
    let mut max = 0_u32;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(digits) = name.strip_prefix("blk").and_then(|rest| rest.strip_suffix(".dat")) {
            if let Ok(n) = digits.parse::<u32>() {
                max = max.max(n);
            }
        }
    }
    Ok(max)
}

#[cfg(test)]
mod tests {
    use chain_types::{BlockType, Destination, Hash256, ProofAlgo, TxType};

    use super::*;

    fn sample_block() -> Block {
        let mint_tx = Transaction {
            version: 1,
            tx_type: TxType::Genesis,
            timestamp: 1,
            lock_until: 0,
            inputs: vec![],
            send_to: Destination::Null,
            amount: 0,
            fee: 0,
            data: vec![],
            sig: vec![],
        };
        let mut block = Block {
            version: 1,
            block_type: BlockType::Genesis,
            timestamp: 1,
            prev_hash: Hash256::ZERO,
            tx_merkle_root: Hash256::ZERO,
            proof_bytes: vec![],
            mint_tx,
            vtx: vec![],
            sig: vec![],
        };
        block.tx_merkle_root = block.compute_tx_merkle_root();
        block
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let block = sample_block();

        let pos = store.write_block(&block).unwrap();
        assert_eq!(pos, FilePos { file_no: 0, offset: 0 });
        assert_eq!(store.read_block(pos).unwrap(), block);
    }

    #[test]
    fn second_write_lands_after_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let block = sample_block();

        let first = store.write_block(&block).unwrap();
        let second = store.write_block(&block).unwrap();
        assert_eq!(second.file_no, first.file_no);
        assert!(second.offset > first.offset);
    }

    #[test]
    fn rollover_starts_a_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let block = sample_block();
        let record_len = block.to_bytes().len() as u64;
        let store = FileStore::open_with_rollover(dir.path(), record_len).unwrap();

        let first = store.write_block(&block).unwrap();
        let second = store.write_block(&block).unwrap();
        assert_eq!(first.file_no, 0);
        assert_eq!(second.file_no, 1);
        assert_eq!(second.offset, 0);
    }

    #[test]
    fn reopen_resumes_at_highest_file() {
        let dir = tempfile::tempdir().unwrap();
        let block = sample_block();
        let record_len = block.to_bytes().len() as u64;
        {
            let store = FileStore::open_with_rollover(dir.path(), record_len).unwrap();
            store.write_block(&block).unwrap();
            store.write_block(&block).unwrap();
        }
        let store = FileStore::open_with_rollover(dir.path(), record_len).unwrap();
        let third = store.write_block(&block).unwrap();
        assert_eq!(third.file_no, 1);
    }
}
