use crate::serde::{Deserializable, DeserializeError, Serializable, SerializeError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::{
    io::{Read, Write},
    sync::Arc,
};
use xxhash_rust::xxh64::Xxh64;

/// User defined key
pub type UserKey = Arc<[u8]>;

/// User defined data (blob of bytes)
pub type UserValue = Arc<[u8]>;

/// Magic tag at the start of every record on disk
const RECORD_MAGIC: u32 = 0x4CBD_ABDA;

/// Each record segment (header, key, value) is independently padded to a
/// multiple of this block size
pub const BLOCK_SIZE: usize = 512;

/// Meaningful header bytes; the checksum covers the first 16 of them
const HEADER_LEN: usize = 24;

const PADDING: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

/// Value type (regular value or tombstone)
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ValueType {
    /// Existing value
    Value,

    /// Deleted value
    Tombstone,
}

impl From<u32> for ValueType {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::Value,
            _ => Self::Tombstone,
        }
    }
}

impl From<ValueType> for u32 {
    fn from(value: ValueType) -> Self {
        match value {
            ValueType::Value => 0,
            ValueType::Tombstone => 1,
        }
    }
}

/// Rounds a field length up to whole blocks
///
/// A zero-length field still occupies one full block.
fn padded_len(len: usize) -> usize {
    if len == 0 {
        BLOCK_SIZE
    } else {
        len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
    }
}

fn write_padded<W: Write>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(bytes)?;
    writer.write_all(&PADDING[..padded_len(bytes.len()) - bytes.len()])
}

/// Fills `buf` completely, returning `false` if the stream was already at
/// its end before the first byte
fn read_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool, DeserializeError> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(DeserializeError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "stream ended inside a record",
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(true)
}

/// A single key-value binding or tombstone
///
/// `key` and `value` are arbitrary user-defined byte arrays.
///
/// # Disk representation
///
/// \[magic; 4 bytes] \[tombstone; 4 bytes] \[key length; 4 bytes]
/// \[value length; 4 bytes] \[checksum; 8 bytes] \[padding]
/// \[key; padded] \[value; padded]
///
/// All integers are little-endian. Header, key and value are each padded
/// to the next 512-byte boundary. The checksum is a xxHash64 digest over
/// the first 16 header bytes, the raw key and the raw value, so the
/// padding does not have to be deterministic and is ignored on read.
#[derive(Clone, PartialEq, Eq)]
pub struct Record {
    /// User-defined key - an arbitrary byte array
    ///
    /// Supports up to 2^32 bytes
    pub key: UserKey,

    /// User-defined value - an arbitrary byte array, empty for tombstones
    ///
    /// Supports up to 2^32 bytes
    pub value: UserValue,

    /// Tombstone marker - if this is [`ValueType::Tombstone`], the key has
    /// been deleted
    pub value_type: ValueType,
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}:{} => {:?}",
            self.key,
            match self.value_type {
                ValueType::Value => "V",
                ValueType::Tombstone => "T",
            },
            self.value
        )
    }
}

impl Record {
    /// Creates a new [`Record`].
    ///
    /// # Panics
    ///
    /// Panics if the key is empty, or either field exceeds 2^32 bytes.
    pub fn new<K: Into<UserKey>, V: Into<UserValue>>(
        key: K,
        value: V,
        value_type: ValueType,
    ) -> Self {
        let key = key.into();
        let value = value.into();

        assert!(!key.is_empty());
        assert!(u32::try_from(key.len()).is_ok());
        assert!(u32::try_from(value.len()).is_ok());

        Self {
            key,
            value,
            value_type,
        }
    }

    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.value_type == ValueType::Tombstone
    }

    /// Number of bytes the record occupies on disk, padding included
    #[must_use]
    pub fn disk_size(&self) -> u64 {
        (BLOCK_SIZE + padded_len(self.key.len()) + padded_len(self.value.len())) as u64
    }

    fn checksum(header: &[u8], key: &[u8], value: &[u8]) -> u64 {
        let mut hasher = Xxh64::new(0);
        hasher.update(&header[..16]);
        hasher.update(key);
        hasher.update(value);
        hasher.digest()
    }

    /// Reads one record, returning `Ok(None)` on clean end-of-stream
    ///
    /// End-of-stream is only clean at a record boundary; a stream that
    /// ends inside the header or payload blocks is an error, never a
    /// silent success.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>, DeserializeError> {
        let mut header = [0u8; BLOCK_SIZE];
        if !read_block(reader, &mut header)? {
            return Ok(None);
        }

        let mut cursor = &header[..HEADER_LEN];

        let magic = cursor.read_u32::<LittleEndian>()?;
        if magic != RECORD_MAGIC {
            return Err(DeserializeError::InvalidMagic(magic));
        }

        let value_type = ValueType::from(cursor.read_u32::<LittleEndian>()?);
        let key_len = cursor.read_u32::<LittleEndian>()? as usize;
        let value_len = cursor.read_u32::<LittleEndian>()? as usize;
        let expected = cursor.read_u64::<LittleEndian>()?;

        let mut key = vec![0; padded_len(key_len)];
        reader.read_exact(&mut key)?;

        let mut value = vec![0; padded_len(value_len)];
        reader.read_exact(&mut value)?;

        let got = Self::checksum(&header, &key[..key_len], &value[..value_len]);
        if got != expected {
            return Err(DeserializeError::ChecksumMismatch { expected, got });
        }

        key.truncate(key_len);
        value.truncate(value_len);

        Ok(Some(Self {
            key: key.into(),
            value: value.into(),
            value_type,
        }))
    }
}

impl Serializable for Record {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), SerializeError> {
        let mut header = [0u8; HEADER_LEN];

        {
            let mut cursor = &mut header[..];

            cursor.write_u32::<LittleEndian>(RECORD_MAGIC)?;
            cursor.write_u32::<LittleEndian>(u32::from(self.value_type))?;

            // NOTE: Truncation is okay, lengths are asserted in the constructor
            #[allow(clippy::cast_possible_truncation)]
            cursor.write_u32::<LittleEndian>(self.key.len() as u32)?;

            #[allow(clippy::cast_possible_truncation)]
            cursor.write_u32::<LittleEndian>(self.value.len() as u32)?;
        }

        let checksum = Self::checksum(&header, &self.key, &self.value);
        (&mut header[16..]).write_u64::<LittleEndian>(checksum)?;

        writer.write_all(&header)?;
        writer.write_all(&PADDING[..BLOCK_SIZE - HEADER_LEN])?;

        write_padded(writer, &self.key)?;
        write_padded(writer, &self.value)?;

        Ok(())
    }
}

impl Deserializable for Record {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self, DeserializeError> {
        Self::read_from(reader)?.ok_or_else(|| {
            DeserializeError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream held no record",
            ))
        })
    }
}

/// Iterates through the records of a byte stream until the first clean
/// end-of-stream or decoding failure
pub struct RecordReader<R> {
    reader: R,
    terminated: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            terminated: false,
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record, DeserializeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.terminated {
            return None;
        }

        match Record::read_from(&mut self.reader) {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.terminated = true;
                None
            }
            Err(e) => {
                self.terminated = true;
                Some(Err(e))
            }
        }
    }
}
