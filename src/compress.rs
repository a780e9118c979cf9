//! Wire name unpacking (§4.2) and the on-write suffix compression table
//! (§4.3).
//!
//! These two pieces are the hard core the rest of the crate leans on: the
//! parser never walks a name without going through `unpack_name`, and the
//! builder never appends one without going through `CompressionTable`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::constants::{DNS_MAX_NAME_LEN, MAX_POINTER_INDIRECTIONS, MAX_POINTER_OFFSET};
use crate::error::{DnsError, Result};
use crate::name::{CompressHint, Name};

/// The result of unpacking a (possibly compressed) wire name out of an
/// untrusted message.
#[derive(Debug)]
pub struct UnpackedName {
    /// The fully decompressed wire encoding: length-prefixed labels,
    /// zero-terminated, with every pointer resolved.
    pub wire: Vec<u8>,
    /// Bytes consumed from `start` in the caller's message, i.e. how far
    /// to advance the cursor — short-circuited to 2 the moment the first
    /// pointer is hit, regardless of how far the pointer chases.
    pub consumed: usize,
    /// Whether any compression pointer was present.
    pub compressed: bool,
}

/// Unpacks a name starting at `start` inside `message` (§4.2).
///
/// Validates reserved label bits, label bounds, total raw length, and
/// caps pointer indirections at `MAX_POINTER_INDIRECTIONS`. Never reads
/// outside `message`.
pub fn unpack_name(message: &[u8], start: usize) -> Result<UnpackedName> {
    if start >= message.len() {
        return Err(DnsError::InvalidWireName("offset outside message"));
    }
    let mut wire = Vec::new();
    let mut offset = start;
    let mut raw_len = 0usize;
    let mut pointers = 0u16;
    let mut consumed: Option<usize> = None;
    loop {
        if offset >= message.len() {
            return Err(DnsError::InvalidWireName("name runs past message"));
        }
        let b = message[offset];
        match b & 0xc0 {
            0xc0 => {
                if offset + 1 >= message.len() {
                    return Err(DnsError::InvalidWireName("truncated compression pointer"));
                }
                pointers += 1;
                if pointers > MAX_POINTER_INDIRECTIONS {
                    return Err(DnsError::PointerLoop(MAX_POINTER_INDIRECTIONS));
                }
                if consumed.is_none() {
                    consumed = Some(offset + 2 - start);
                }
                let target = (((b & 0x3f) as usize) << 8) | message[offset + 1] as usize;
                offset = target;
                continue;
            }
            0x00 => {
                let len = b as usize;
                offset += 1;
                if len == 0 {
                    wire.push(0);
                    raw_len += 1;
                    if raw_len > DNS_MAX_NAME_LEN {
                        return Err(DnsError::InvalidWireName("name exceeds 255 bytes"));
                    }
                    break;
                }
                if offset + len > message.len() {
                    return Err(DnsError::InvalidWireName("label runs past message"));
                }
                wire.push(len as u8);
                wire.extend_from_slice(&message[offset..offset + len]);
                raw_len += 1 + len;
                if raw_len > DNS_MAX_NAME_LEN {
                    return Err(DnsError::InvalidWireName("name exceeds 255 bytes"));
                }
                offset += len;
            }
            _ => return Err(DnsError::InvalidWireName("reserved label length bits")),
        }
    }
    let compressed = consumed.is_some();
    let consumed = consumed.unwrap_or(raw_len);
    Ok(UnpackedName {
        wire,
        consumed,
        compressed,
    })
}

/// Reads one label from `message` at `offset` (not a pointer, not the
/// terminator — callers dispatch on those first).
fn read_label(message: &[u8], offset: usize) -> Result<(&[u8], usize)> {
    let len = message[offset] as usize;
    if offset + 1 + len > message.len() {
        return Err(DnsError::InvalidWireName("label runs past message"));
    }
    Ok((&message[offset + 1..offset + 1 + len], offset + 1 + len))
}

/// Compares the wire-encoded name suffix `suffix` (not yet written to
/// `buf`, e.g. the tail of a name being appended) against the name stored
/// at `stored_offset` inside the already-emitted bytes of `buf`,
/// byte-for-byte and case-sensitively (§4.3: "wire form is canonical as
/// emitted"). Chases pointers on the `buf` side, bounded the same way as
/// `unpack_name`.
fn suffix_matches_stored(buf: &[u8], mut stored_offset: usize, suffix: &[u8]) -> Result<bool> {
    let mut suffix_pos = 0usize;
    let mut pointers = 0u16;
    loop {
        if stored_offset >= buf.len() {
            return Err(DnsError::InvalidWireName("offset outside buffer"));
        }
        let stored_byte = buf[stored_offset];
        if stored_byte & 0xc0 == 0xc0 {
            if stored_offset + 1 >= buf.len() {
                return Err(DnsError::InvalidWireName("truncated compression pointer"));
            }
            pointers += 1;
            if pointers > MAX_POINTER_INDIRECTIONS {
                return Err(DnsError::PointerLoop(MAX_POINTER_INDIRECTIONS));
            }
            stored_offset =
                (((stored_byte & 0x3f) as usize) << 8) | buf[stored_offset + 1] as usize;
            continue;
        }
        if suffix_pos >= suffix.len() {
            return Ok(false);
        }
        let suffix_len = suffix[suffix_pos] as usize;
        let stored_len = stored_byte as usize;
        if suffix_len != stored_len {
            return Ok(false);
        }
        if suffix_len == 0 {
            return Ok(true);
        }
        let (stored_label, next_stored) = read_label(buf, stored_offset)?;
        let suffix_label = &suffix[suffix_pos + 1..suffix_pos + 1 + suffix_len];
        if stored_label != suffix_label {
            return Ok(false);
        }
        stored_offset = next_stored;
        suffix_pos += 1 + suffix_len;
    }
}

fn suffix_hash(seed: u64, suffix: &[u8]) -> u64 {
    let mut h = DefaultHasher::new();
    seed.hash(&mut h);
    suffix.hash(&mut h);
    h.finish()
}

const FINGERPRINT_BITS: u32 = 18;
const OFFSET_BITS: u32 = 14;
const INITIAL_CAPACITY: usize = 16;

#[inline]
fn pack_entry(fingerprint: u32, offset: u32) -> u32 {
    (fingerprint << OFFSET_BITS) | offset
}

#[inline]
fn unpack_entry(entry: u32) -> (u32, u32) {
    (entry >> OFFSET_BITS, entry & ((1 << OFFSET_BITS) - 1))
}

#[inline]
fn fingerprint_of(hash: u64) -> u32 {
    (hash >> (64 - FINGERPRINT_BITS)) as u32
}

/// The byte offsets, within `wire`, of every label boundary up to (but
/// not including) the terminator.
fn label_boundaries(wire: &[u8]) -> Vec<usize> {
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        let len = wire[pos] as usize;
        if len == 0 {
            break;
        }
        out.push(pos);
        pos += 1 + len;
    }
    out
}

/// An open-addressed, fingerprinted hash table mapping previously-emitted
/// name suffixes to their byte offset in the message under construction.
///
/// Lives for the lifetime of one `Builder`; `reset` clears it for reuse
/// without dropping the backing allocation.
pub struct CompressionTable {
    slots: Vec<u32>,
    len: usize,
    seed: u64,
    invalidate_after: Option<usize>,
    first_name_offset: Option<usize>,
    first_name_wire: Option<Vec<u8>>,
}

impl CompressionTable {
    pub fn new() -> Self {
        CompressionTable {
            slots: vec![0; INITIAL_CAPACITY],
            len: 0,
            seed: rand::random(),
            invalidate_after: None,
            first_name_offset: None,
            first_name_wire: None,
        }
    }

    /// Clears all entries for reuse, keeping the backing allocation and
    /// the random seed (matches `Builder::reset`, §4.4).
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = 0;
        }
        self.len = 0;
        self.invalidate_after = None;
        self.first_name_offset = None;
        self.first_name_wire = None;
    }

    /// Marks every entry at or after `offset` as invalid. Cheap: just
    /// records a low-water mark; the actual sweep happens lazily on the
    /// next insertion (§4.3 "Invalidation").
    pub fn invalidate_from(&mut self, offset: usize) {
        self.invalidate_after = Some(match self.invalidate_after {
            Some(existing) => existing.min(offset),
            None => offset,
        });
        if let Some(first_offset) = self.first_name_offset {
            if first_offset >= offset {
                self.first_name_offset = None;
                self.first_name_wire = None;
            }
        }
    }

    fn sweep_if_needed(&mut self) {
        let mark = match self.invalidate_after.take() {
            Some(m) => m,
            None => return,
        };
        for slot in &mut self.slots {
            if *slot == 0 {
                continue;
            }
            let (_, offset) = unpack_entry(*slot);
            if offset as usize >= mark {
                *slot = 0;
                self.len -= 1;
            }
        }
    }

    fn grow(&mut self, buf: &[u8]) -> Result<()> {
        let new_len = self.slots.len() * 2;
        let old = std::mem::replace(&mut self.slots, vec![0; new_len]);
        self.len = 0;
        for entry in old {
            if entry == 0 {
                continue;
            }
            let (_, offset) = unpack_entry(entry);
            let unpacked = unpack_name(buf, offset as usize)?;
            let hash = suffix_hash(self.seed, &unpacked.wire);
            self.raw_insert(hash, offset);
        }
        Ok(())
    }

    /// Inserts into the bucket `insert_index(hash)` would also compute,
    /// so a post-grow `find` probes the same sequence a fresh `insert`
    /// would have produced.
    fn raw_insert(&mut self, hash: u64, offset: u32) {
        let fingerprint = fingerprint_of(hash);
        let mask = self.slots.len() - 1;
        let mut idx = self.insert_index(hash);
        loop {
            if self.slots[idx] == 0 {
                self.slots[idx] = pack_entry(fingerprint, offset);
                self.len += 1;
                return;
            }
            idx = (idx + 1) & mask;
        }
    }

    fn insert_index(&self, hash: u64) -> usize {
        (hash as usize) & (self.slots.len() - 1)
    }

    /// Records that a suffix hashing to `hash` lives at `offset`, if the
    /// offset is addressable by a 14-bit pointer.
    fn insert(&mut self, buf: &[u8], hash: u64, offset: usize) -> Result<()> {
        if offset > MAX_POINTER_OFFSET {
            return Ok(());
        }
        self.sweep_if_needed();
        if self.len * 4 >= self.slots.len() * 3 {
            self.grow(buf)?;
        }
        let fingerprint = fingerprint_of(hash);
        let mask = self.slots.len() - 1;
        let mut idx = self.insert_index(hash);
        loop {
            if self.slots[idx] == 0 {
                self.slots[idx] = pack_entry(fingerprint, offset as u32);
                self.len += 1;
                return Ok(());
            }
            let (existing_fp, existing_off) = unpack_entry(self.slots[idx]);
            if existing_fp == fingerprint && existing_off as usize == offset {
                return Ok(()); // already recorded
            }
            idx = (idx + 1) & mask;
        }
    }

    /// Looks for a previously-emitted occurrence of `suffix` (an exact
    /// wire-encoded name tail, including its terminator) and returns its
    /// offset if a verified match exists.
    fn find(&mut self, buf: &[u8], hash: u64, suffix: &[u8]) -> Result<Option<usize>> {
        self.sweep_if_needed();
        if self.slots.is_empty() {
            return Ok(None);
        }
        let fingerprint = fingerprint_of(hash);
        let mask = self.slots.len() - 1;
        let mut idx = self.insert_index(hash);
        let mut probes = 0;
        while probes < self.slots.len() {
            let entry = self.slots[idx];
            if entry == 0 {
                return Ok(None);
            }
            let (entry_fp, entry_off) = unpack_entry(entry);
            if entry_fp == fingerprint && suffix_matches_stored(buf, entry_off as usize, suffix)? {
                return Ok(Some(entry_off as usize));
            }
            idx = (idx + 1) & mask;
            probes += 1;
        }
        Ok(None)
    }

    /// Tries the first-name fast path: the very first name ever appended
    /// sits at a known, fixed offset, so its label boundaries can be
    /// compared against directly, without hashing at all (§4.3
    /// "First-name optimization").
    fn first_name_match(&self, wire: &[u8]) -> Option<usize> {
        let first_offset = self.first_name_offset?;
        let first_wire = self.first_name_wire.as_ref()?;
        for &boundary in &label_boundaries(first_wire) {
            if first_wire[boundary..] == *wire {
                return Some(first_offset + boundary);
            }
        }
        if wire.len() == 1 && wire[0] == 0 && first_wire.last() == Some(&0) {
            return Some(first_offset + first_wire.len() - 1);
        }
        None
    }

    /// Appends `name`'s wire encoding to `buf` (whose current length is
    /// the absolute offset at which the name will start), using name
    /// compression when `hint.wants_compression()`. Inserts newly-seen
    /// label suffixes into the table for future lookups.
    pub fn append(&mut self, buf: &mut Vec<u8>, name: &Name, hint: CompressHint) -> Result<()> {
        let name_start = buf.len();
        let wire = name.as_wire();
        if !hint.wants_compression() || wire.len() == 1 {
            buf.extend_from_slice(wire);
            self.record_boundaries(buf, name_start, wire)?;
            return Ok(());
        }

        let boundaries = label_boundaries(wire);
        let mut match_at: Option<(usize, usize)> = None; // (boundary index, stored offset)
        for (bi, &boundary) in boundaries.iter().enumerate() {
            let suffix = &wire[boundary..];
            if let Some(offset) = self.first_name_match(suffix) {
                match_at = Some((bi, offset));
                break;
            }
            let hash = suffix_hash(self.seed, suffix);
            if let Some(offset) = self.find(buf, hash, suffix)? {
                match_at = Some((bi, offset));
                break;
            }
        }

        match match_at {
            Some((bi, offset)) => {
                buf.extend_from_slice(&wire[..boundaries[bi]]);
                let pointer = 0xc000u16 | offset as u16;
                buf.extend_from_slice(&pointer.to_be_bytes());
                for &boundary in &boundaries[..bi] {
                    let abs = name_start + boundary;
                    if abs <= MAX_POINTER_OFFSET {
                        let hash = suffix_hash(self.seed, &wire[boundary..]);
                        self.insert(buf, hash, abs)?;
                    }
                }
            }
            None => {
                buf.extend_from_slice(wire);
                self.record_boundaries(buf, name_start, wire)?;
            }
        }
        self.record_first_name(name_start, wire);
        Ok(())
    }

    fn record_boundaries(&mut self, buf: &[u8], name_start: usize, wire: &[u8]) -> Result<()> {
        for boundary in label_boundaries(wire) {
            let abs = name_start + boundary;
            if abs <= MAX_POINTER_OFFSET {
                let hash = suffix_hash(self.seed, &wire[boundary..]);
                self.insert(buf, hash, abs)?;
            }
        }
        self.record_first_name(name_start, wire);
        Ok(())
    }

    fn record_first_name(&mut self, name_start: usize, wire: &[u8]) {
        if self.first_name_offset.is_none() {
            self.first_name_offset = Some(name_start);
            self.first_name_wire = Some(wire.to_vec());
        }
    }
}

impl Default for CompressionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;

    #[test]
    fn unpack_plain_name() {
        let mut msg = vec![0u8; 12];
        msg.extend_from_slice(&[7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0]);
        let unpacked = unpack_name(&msg, 12).unwrap();
        assert!(!unpacked.compressed);
        assert_eq!(unpacked.consumed, 13);
        assert_eq!(unpacked.wire, &msg[12..]);
    }

    #[test]
    fn unpack_follows_pointer() {
        let mut msg = vec![0u8; 12];
        msg.extend_from_slice(&[3, b'c', b'o', b'm', 0]); // offset 12
        let ptr_offset = msg.len();
        msg.extend_from_slice(&[0xc0, 12]); // pointer back to offset 12
        let unpacked = unpack_name(&msg, ptr_offset).unwrap();
        assert!(unpacked.compressed);
        assert_eq!(unpacked.consumed, 2);
        assert_eq!(unpacked.wire, &[3, b'c', b'o', b'm', 0]);
    }

    #[test]
    fn unpack_detects_pointer_loop() {
        let mut msg = vec![0u8; 12];
        msg.extend_from_slice(&[0xc0, 12]); // points at itself
        let err = unpack_name(&msg, 12).unwrap_err();
        assert_eq!(err, DnsError::PointerLoop(MAX_POINTER_INDIRECTIONS));
    }

    #[test]
    fn unpack_rejects_reserved_bits() {
        let mut msg = vec![0u8; 12];
        msg.push(0x80);
        let err = unpack_name(&msg, 12).unwrap_err();
        assert!(matches!(err, DnsError::InvalidWireName(_)));
    }

    #[test]
    fn compresses_repeated_suffix() {
        let mut buf = vec![0u8; 12];
        let mut table = CompressionTable::new();
        let a = Name::from_text("example.com.").unwrap();
        let b = Name::from_text("www.example.com.").unwrap();
        table.append(&mut buf, &a, CompressHint::WhenPossible).unwrap();
        let before = buf.len();
        table.append(&mut buf, &b, CompressHint::WhenPossible).unwrap();
        // "www" (len byte + 3) + 2-byte pointer = 6, far less than the full encoding.
        assert_eq!(buf.len() - before, 6);
        let parsed = unpack_name(&buf, before).unwrap();
        assert!(parsed.compressed);
        assert_eq!(Name::from_wire_owned(parsed.wire).unwrap(), b);
    }

    #[test]
    fn never_hint_disables_compression() {
        let mut buf = vec![0u8; 12];
        let mut table = CompressionTable::new();
        let a = Name::from_text("example.com.").unwrap();
        let b = Name::from_text("www.example.com.").unwrap();
        table.append(&mut buf, &a, CompressHint::WhenPossible).unwrap();
        let before = buf.len();
        table.append(&mut buf, &b, CompressHint::Never).unwrap();
        assert_eq!(buf.len() - before, b.wire_len());
    }

    #[test]
    fn invalidate_from_drops_rolled_back_entries() {
        let mut buf = vec![0u8; 12];
        let mut table = CompressionTable::new();
        let a = Name::from_text("example.com.").unwrap();
        table.append(&mut buf, &a, CompressHint::WhenPossible).unwrap();
        let mark = buf.len();
        buf.truncate(mark); // simulate a rollback to right after `a`
        table.invalidate_from(mark);
        let before = buf.len();
        table.append(&mut buf, &a, CompressHint::WhenPossible).unwrap();
        let parsed = unpack_name(&buf, before).unwrap();
        assert_eq!(Name::from_wire_owned(parsed.wire).unwrap(), a);
    }

    #[test]
    fn compression_survives_table_growth() {
        let mut buf = vec![0u8; 12];
        let mut table = CompressionTable::new();
        let base = Name::from_text("example.com.").unwrap();
        table.append(&mut buf, &base, CompressHint::WhenPossible).unwrap();

        // Enough distinct names to force the table through two resizes
        // (INITIAL_CAPACITY=16 grows at len>=12, then again at len>=24).
        let mut hosts = Vec::new();
        for i in 0..40 {
            let n = Name::from_text(&format!("host{}.example.com.", i)).unwrap();
            table.append(&mut buf, &n, CompressHint::WhenPossible).unwrap();
            hosts.push(n);
        }

        // Re-appending an early, fully-qualified name must still find its
        // whole-name suffix entry (recorded long before the later resizes)
        // and compress down to a bare 2-byte pointer.
        let before = buf.len();
        table.append(&mut buf, &hosts[0], CompressHint::WhenPossible).unwrap();
        assert_eq!(buf.len() - before, 2);
        let parsed = unpack_name(&buf, before).unwrap();
        assert_eq!(Name::from_wire_owned(parsed.wire).unwrap(), hosts[0]);
    }

    #[test]
    fn three_name_chain_matches_expected_layout() {
        let mut buf = vec![0u8; 12];
        let mut table = CompressionTable::new();
        for text in ["com.", "example.com.", "www.example.com."] {
            let n = Name::from_text(text).unwrap();
            table.append(&mut buf, &n, CompressHint::WhenPossible).unwrap();
        }
        let body = &buf[12..];
        let expected = [
            3, b'c', b'o', b'm', 0, // com.
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0xc0, 12, // example.<ptr com.>
            3, b'w', b'w', b'w', 0xc0, 17, // www.<ptr example.com.>
        ];
        assert_eq!(body, &expected[..]);
    }
}
