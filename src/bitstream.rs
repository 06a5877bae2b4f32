// Copyright 2026 hubio developers
// Licensed under the Apache-2.0 and MIT licenses.

use std::{fs::File, path::Path, io::Read};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("sync word AA 99 55 66 not found in bitstream")]
    SyncNotFound,
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Marks the start of configuration data in a Xilinx bitstream.
pub const SYNC_WORD: [u8; 4] = [0xAA, 0x99, 0x55, 0x66];

/// Find the offset of the first sync word in `data`.
pub fn locate_sync(data: &[u8]) -> Result<usize> {
    data.windows(SYNC_WORD.len())
        .position(|w| w == SYNC_WORD)
        .ok_or(Error::SyncNotFound)
}

/// Reverse the bit order of `byte`.
///
/// Bitstream files are stored MSB first while the TAP shifts LSB first.
pub const fn reverse_bits(byte: u8) -> u8 {
    let b = ((byte & 0x55) << 1) | ((byte >> 1) & 0x55);
    let b = ((b & 0x33) << 2) | ((b >> 2) & 0x33);
    ((b & 0x0F) << 4) | (b >> 4)
}

/// Bitstream trimmed to its sync word and bit-reversed, ready to shift
/// into the configuration register.
pub struct Bitstream {
    data: Vec<u8>,
    offset: usize,
}

impl Bitstream {
    /// Open a bitstream from the provided path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        Self::from_file(&mut file)
    }

    /// Open a bitstream from the provided open `File`.
    pub fn from_file(file: &mut File) -> Result<Self> {
        let mut data = if let Ok(metadata) = file.metadata() {
            Vec::with_capacity(metadata.len() as usize)
        } else {
            Vec::new()
        };
        file.read_to_end(&mut data)?;
        Self::new(data)
    }

    /// Prepare raw file contents.
    ///
    /// Anything before the sync word (such as the `.bit` header) is dropped,
    /// and every remaining byte, the sync word included, is bit-reversed.
    pub fn new(mut data: Vec<u8>) -> Result<Self> {
        let offset = locate_sync(&data)?;
        log::debug!("Found sync word at offset {offset}, {} bytes follow", data.len() - offset);
        data.drain(..offset);
        for byte in data.iter_mut() {
            *byte = reverse_bits(*byte);
        }
        Ok(Self { data, offset })
    }

    /// Get the prepared configuration data.
    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }

    /// Offset of the sync word in the file as loaded.
    pub fn sync_offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
