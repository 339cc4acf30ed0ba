//! Framing of the index file: the fixed header in front of the entries and
//! the SHA-1 trailer behind them.

use crate::artifacts::index::index_entry::{ENTRY_BLOCK, ENTRY_MIN_SIZE};
use crate::artifacts::index::{CHECKSUM_SIZE, HEADER_SIZE, SIGNATURE, VERSION};
use anyhow::{anyhow, bail};
use byteorder::{ByteOrder, NetworkEndian};
use bytes::Bytes;
use file_guard::FileGuard;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{Read, Write};
use std::ops::DerefMut;

/// Number of entries announced by the header. Only version 2 is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub entries: u32,
}

impl IndexHeader {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..4].copy_from_slice(SIGNATURE.as_bytes());
        NetworkEndian::write_u32(&mut bytes[4..8], VERSION);
        NetworkEndian::write_u32(&mut bytes[8..], self.entries);
        bytes
    }

    pub fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.len() != HEADER_SIZE {
            bail!("index header is {} bytes, expected {HEADER_SIZE}", bytes.len());
        }
        if &bytes[..4] != SIGNATURE.as_bytes() {
            bail!("Invalid index file signature");
        }

        let version = NetworkEndian::read_u32(&bytes[4..8]);
        if version != VERSION {
            bail!("Unsupported index file version: {version}");
        }

        Ok(IndexHeader {
            entries: NetworkEndian::read_u32(&bytes[8..]),
        })
    }
}

/// A locked index file with a running SHA-1 over every byte that passes
/// through, so the trailer can be checked after reading or appended after
/// writing.
pub struct HashedFile<'f> {
    file: FileGuard<&'f mut File>,
    digest: Sha1,
}

impl<'f> HashedFile<'f> {
    pub fn new(file: FileGuard<&'f mut File>) -> Self {
        HashedFile {
            file,
            digest: Sha1::new(),
        }
    }

    pub fn read_header(&mut self) -> anyhow::Result<IndexHeader> {
        let bytes = self.read(HEADER_SIZE)?;
        IndexHeader::decode(&bytes)
    }

    /// Raw bytes of one entry: the fixed part, then 8-byte blocks until the
    /// NUL-padded name ends.
    pub fn read_entry(&mut self) -> anyhow::Result<Bytes> {
        let mut bytes = self.read(ENTRY_MIN_SIZE)?.to_vec();
        while bytes.last() != Some(&0) {
            bytes.extend_from_slice(&self.read(ENTRY_BLOCK)?);
        }
        Ok(Bytes::from(bytes))
    }

    fn read(&mut self, size: usize) -> anyhow::Result<Bytes> {
        let mut buffer = vec![0; size];
        self.file
            .deref_mut()
            .read_exact(&mut buffer)
            .map_err(|_| anyhow!("Unexpected end-of-file while reading index"))?;

        self.digest.update(&buffer);
        Ok(Bytes::from(buffer))
    }

    pub fn write(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.file.deref_mut().write_all(data)?;
        self.digest.update(data);
        Ok(())
    }

    /// Append the trailer. Nothing may be written afterwards.
    pub fn finish(mut self) -> anyhow::Result<()> {
        let trailer = self.digest.finalize_reset();
        self.file.deref_mut().write_all(&trailer)?;
        Ok(())
    }

    /// Compare the stored trailer with the hash of everything read so far.
    pub fn verify(mut self) -> anyhow::Result<()> {
        let mut stored = [0u8; CHECKSUM_SIZE];
        self.file
            .deref_mut()
            .read_exact(&mut stored)
            .map_err(|_| anyhow!("Index file is missing its checksum"))?;

        if stored[..] != self.digest.finalize_reset()[..] {
            bail!("Checksum does not match value stored on disk");
        }
        Ok(())
    }
}
