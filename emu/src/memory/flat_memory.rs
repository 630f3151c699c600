use serde::{Deserialize, Serialize};

use super::{Memory, MemoryError, Width};

/// A contiguous block of RAM starting at `base`.
///
/// Accesses are little-endian and need not be aligned. Anything that falls
/// even partially outside `base..base + len` is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatMemory {
    base: u32,
    bytes: Vec<u8>,
}

impl FlatMemory {
    #[must_use]
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            bytes: vec![0; size],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copies `data` into memory starting at `address`.
    pub fn write_bytes(&mut self, address: u32, data: &[u8]) -> Result<(), MemoryError> {
        let len = u32::try_from(data.len()).map_err(|_| MemoryError::OutOfBounds {
            address,
            len: u32::MAX,
        })?;
        let range = self.range(address, len)?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Stores `words` one after the other starting at `address`.
    pub fn write_words(&mut self, address: u32, words: &[u32]) -> Result<(), MemoryError> {
        let data: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.write_bytes(address, &data)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn range(&self, address: u32, len: u32) -> Result<std::ops::Range<usize>, MemoryError> {
        let out_of_bounds = MemoryError::OutOfBounds { address, len };

        let offset = address.checked_sub(self.base).ok_or(out_of_bounds)? as usize;
        let end = offset.checked_add(len as usize).ok_or(out_of_bounds)?;
        if end > self.bytes.len() {
            return Err(out_of_bounds);
        }

        Ok(offset..end)
    }
}

impl Memory for FlatMemory {
    fn load(&self, address: u32, width: Width) -> Result<u32, MemoryError> {
        let range = self.range(address, width.bytes())?;
        let bytes = &self.bytes[range];

        Ok(match width {
            Width::Byte => u32::from(bytes[0]),
            Width::Word => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        })
    }

    fn store(&mut self, address: u32, width: Width, value: u32) -> Result<(), MemoryError> {
        let range = self.range(address, width.bytes())?;

        match width {
            Width::Byte => self.bytes[range.start] = value.to_le_bytes()[0],
            Width::Word => self.bytes[range].copy_from_slice(&value.to_le_bytes()),
        }

        Ok(())
    }
}
