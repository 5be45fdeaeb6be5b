//! Byte-level stream reader and writer for the record format.
//!
//! Alle Multi-Byte-Werte im Record-Stream sind little-endian. Der Writer
//! puffert in einem Vec und wird vom Encoder in die eigentliche Senke
//! geleert; Checkpoints erlauben das Zurueckrollen angefangener Records.

use std::io::Write;

use crate::{Error, Result};

/// Writes bytes into a growable buffer.
pub struct ByteWriter {
    buf: Vec<u8>,
    /// Anzahl aktiver Checkpoints (fuer drain_to()-Safety).
    active_checkpoints: usize,
}

impl ByteWriter {
    /// Creates a new empty `ByteWriter`.
    pub fn new() -> Self {
        Self { buf: Vec::new(), active_checkpoints: 0 }
    }

    #[inline(always)]
    pub fn write_u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    #[inline]
    pub fn write_u16_le(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn write_u32_le(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    #[inline]
    pub fn write_u64_le(&mut self, val: u64) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Setzt Bits in einem bereits geschriebenen Byte (Peephole fuer Text-Records
    /// mit implizitem EndElement). Positionen ausserhalb des Buffers werden ignoriert.
    pub fn or_byte_at(&mut self, pos: usize, mask: u8) {
        if let Some(b) = self.buf.get_mut(pos) {
            *b |= mask;
        }
    }

    /// Returns the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns a reference to the buffered bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Speichert die aktuelle Schreibposition fuer moeglichen Rollback.
    pub fn save_checkpoint(&mut self) -> ByteWriterCheckpoint {
        self.active_checkpoints += 1;
        ByteWriterCheckpoint { buf_len: self.buf.len() }
    }

    /// Stellt eine zuvor gespeicherte Position wieder her und verwirft alle
    /// danach geschriebenen Daten.
    pub fn restore_checkpoint(&mut self, checkpoint: ByteWriterCheckpoint) {
        debug_assert!(
            self.active_checkpoints > 0,
            "restore_checkpoint() ohne aktiven Checkpoint"
        );
        self.active_checkpoints = self.active_checkpoints.saturating_sub(1);
        self.buf.truncate(checkpoint.buf_len);
    }

    /// Loest einen Checkpoint auf ohne Rollback.
    pub fn discard_checkpoint(&mut self) {
        debug_assert!(
            self.active_checkpoints > 0,
            "discard_checkpoint() ohne aktiven Checkpoint"
        );
        self.active_checkpoints = self.active_checkpoints.saturating_sub(1);
    }

    /// Schreibt alle gepufferten Bytes in den Writer und leert den Buffer.
    ///
    /// Bei aktivem Checkpoint wird nichts geschrieben: ein Rollback muss die
    /// Bytes noch verwerfen koennen.
    pub fn drain_to(&mut self, writer: &mut impl Write) -> std::io::Result<()> {
        if self.active_checkpoints > 0 || self.buf.is_empty() {
            return Ok(());
        }
        writer.write_all(&self.buf)?;
        self.buf.clear();
        Ok(())
    }

    /// Consumes the writer and returns the buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Checkpoint fuer ByteWriter-Rollback.
pub struct ByteWriterCheckpoint {
    buf_len: usize,
}

/// Reads bytes from a slice, tracking the absolute offset for error reports.
#[derive(Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a new `ByteReader` over the given byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the slice.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Liest das naechste Byte ohne den Lesezeiger zu bewegen.
    #[inline]
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        let b = self
            .data
            .get(self.pos)
            .copied()
            .ok_or(Error::PrematureEndOfStream { offset: self.pos })?;
        self.pos += 1;
        Ok(b)
    }

    /// Gibt die naechsten `n` Bytes als Slice zurueck (zero-copy).
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::PrematureEndOfStream { offset: self.pos })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Liest genau `N` Bytes in ein Array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }
}
