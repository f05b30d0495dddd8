// crates/iolink-rs/src/ds/dataset.rs
//! Bounded containers backing a data storage transfer.

use crate::hal::IolinkError;
use crate::types::{DS_INDEX_LIST_MAX_ENTRIES, DS_MAX_SIZE};

/// Commands written to DS_Command (index 3, subindex 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DsCommand {
    #[default]
    Reserved = 0,
    UploadStart = 1,
    UploadEnd = 2,
    DownloadStart = 3,
    DownloadEnd = 4,
    Break = 5,
}

/// One `(index, subindex)` pair of the device's Index_List.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub index: u16,
    pub subindex: u8,
}

/// The device's Index_List together with the upload cursor.
#[derive(Debug, Clone, Default)]
pub struct IndexList {
    entries: heapless::Vec<IndexEntry, DS_INDEX_LIST_MAX_ENTRIES>,
    pos: usize,
}

impl IndexList {
    const ENTRY_LEN: usize = 3;

    /// Parses a raw Index_List: `index` (u16 BE) followed by `subindex` (u8),
    /// terminated by a zero index or the end of the data.
    pub fn parse(data: &[u8]) -> Result<Self, IolinkError> {
        let mut list = Self::default();
        let mut offset = 0;

        while offset + 2 <= data.len() {
            let index = u16::from_be_bytes([data[offset], data[offset + 1]]);
            if index == 0 {
                break;
            }
            let subindex = *data
                .get(offset + 2)
                .ok_or(IolinkError::MalformedRecord(offset))?;
            list.entries
                .push(IndexEntry { index, subindex })
                .map_err(|_| IolinkError::IndexListFull)?;
            offset += Self::ENTRY_LEN;
        }

        Ok(list)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Returns the next entry to upload and advances the cursor.
    pub fn next_entry(&mut self) -> Option<IndexEntry> {
        let entry = self.entries.get(self.pos).copied()?;
        self.pos += 1;
        Some(entry)
    }
}

/// A parameter record of a backup set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub index: u16,
    pub subindex: u8,
    pub data: &'a [u8],
}

/// Raw backup set: a sequence of `index (u16 BE), subindex, len, data[len]`
/// records, plus a read cursor used while downloading.
#[derive(Debug, Clone, Default)]
pub struct DataSetBuffer {
    data: heapless::Vec<u8, DS_MAX_SIZE>,
    pos: usize,
}

impl DataSetBuffer {
    const RECORD_HEADER_LEN: usize = 4;

    pub fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Replaces the content with an opaque backup set.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), IolinkError> {
        let data = heapless::Vec::from_slice(bytes).map_err(|_| IolinkError::DataStorageOverflow {
            needed: bytes.len(),
            capacity: DS_MAX_SIZE,
        })?;
        self.data = data;
        self.pos = 0;
        Ok(())
    }

    /// Appends one parameter record. The buffer is left untouched when the
    /// record does not fit.
    pub fn append_record(&mut self, index: u16, subindex: u8, value: &[u8]) -> Result<(), IolinkError> {
        let needed = self.data.len() + Self::RECORD_HEADER_LEN + value.len();
        if needed > DS_MAX_SIZE || value.len() > usize::from(u8::MAX) {
            return Err(IolinkError::DataStorageOverflow {
                needed,
                capacity: DS_MAX_SIZE,
            });
        }

        let [hi, lo] = index.to_be_bytes();
        // Capacity was checked above, none of these pushes can fail.
        let _ = self.data.extend_from_slice(&[hi, lo, subindex, value.len() as u8]);
        let _ = self.data.extend_from_slice(value);
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// True once every record has been read.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads the record under the cursor and advances past it.
    pub fn next_record(&mut self) -> Result<Option<Record<'_>>, IolinkError> {
        if self.is_exhausted() {
            return Ok(None);
        }
        let start = self.pos;
        let header = self
            .data
            .get(start..start + Self::RECORD_HEADER_LEN)
            .ok_or(IolinkError::MalformedRecord(start))?;
        let index = u16::from_be_bytes([header[0], header[1]]);
        let subindex = header[2];
        let len = usize::from(header[3]);

        let body = start + Self::RECORD_HEADER_LEN;
        if body + len > self.data.len() {
            return Err(IolinkError::MalformedRecord(start));
        }
        self.pos = body + len;

        Ok(Some(Record {
            index,
            subindex,
            data: &self.data[body..body + len],
        }))
    }
}

/// Data storage descriptor reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceDataSet {
    /// Parameter_Checksum (subindex 4).
    pub checksum: u32,
    /// Data_Storage_Size (subindex 3).
    pub size_max: u32,
    /// State_Property (subindex 2).
    pub state_property: u8,
}

/// The backup set kept by the master.
#[derive(Debug, Clone)]
pub struct MasterDataSet {
    pub checksum: u32,
    pub vendor_id: u16,
    pub device_id: u32,
    pub function_id: u16,
    /// Set once a complete backup has been stored.
    pub valid: bool,
    pub size_max: usize,
    pub data: DataSetBuffer,
}

impl Default for MasterDataSet {
    fn default() -> Self {
        Self {
            checksum: 0,
            vendor_id: 0,
            device_id: 0,
            function_id: 0,
            valid: false,
            size_max: DS_MAX_SIZE,
            data: DataSetBuffer::default(),
        }
    }
}

impl MasterDataSet {
    /// Number of bytes held by the backup set.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Forgets the backup.
    pub fn delete(&mut self) {
        self.vendor_id = 0;
        self.device_id = 0;
        self.checksum = 0;
        self.valid = false;
        self.data.clear();
    }
}

/// Identity a backup is stored under once an upload completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingIdentity {
    pub vendor_id: u16,
    pub device_id: u32,
}
