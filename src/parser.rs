//! The incremental, cursor-based message parser (§4.7).
//!
//! A `Parser` walks an untrusted message section by section, mirroring the
//! order `Builder` writes in: one or more questions, then answers, then
//! authorities, then additionals. Every name is unpacked through
//! `compress::unpack_name`, so pointer loops and out-of-bounds offsets are
//! caught here rather than by callers.

use crate::compress::{self, UnpackedName};
use crate::constants::{
    Section, DNS_HEADER_SIZE, DNS_QUESTION_TAIL_SIZE, DNS_RR_HEADER_SIZE, MAX_RDLENGTH,
};
use crate::error::{DnsError, Result};
use crate::header::Header;
use crate::name::{CompressHint, Name};

/// A parsed question: name, type, class.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Question {
    pub name: Name,
    pub qtype: u16,
    pub qclass: u16,
}

/// The fixed-size header of a resource record, with `rdata_offset`
/// pointing at the first byte of its (still unparsed) rdata.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceHeader {
    pub name: Name,
    pub rtype: u16,
    pub rclass: u16,
    pub ttl: u32,
    pub rdlength: usize,
    pub rdata_offset: usize,
}

#[derive(Copy, Clone, Debug)]
struct Pending {
    start: usize,
    len: usize,
    section: Section,
}

/// Which fixed-count section the cursor is currently walking.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Cursor {
    Question(u16),
    Answer(u16),
    Authority(u16),
    Additional(u16),
    Done,
}

/// A cheaply-copyable cursor over an untrusted DNS message.
///
/// `Parser` never mutates the underlying bytes; advancing just moves
/// `offset` forward and decrements the remaining count for the current
/// section. Because every field is `Copy`, a `Parser` can be forked with
/// a plain `let saved = parser;` to allow speculative lookahead.
#[derive(Copy, Clone, Debug)]
pub struct Parser<'a> {
    message: &'a [u8],
    offset: usize,
    header: Header,
    cursor: Cursor,
    pending: Option<Pending>,
    /// Offset up to which every question/resource has been *fully*
    /// consumed (rdata included, not just its header). Used by
    /// `truncate::snapshot` to produce a faked-counts prefix of the
    /// message (§4.11); a record whose header was read but whose rdata
    /// was not yet consumed never moves this forward.
    committed_offset: usize,
    qd_done: u16,
    an_done: u16,
    ns_done: u16,
    ar_done: u16,
}

impl<'a> Parser<'a> {
    /// Reads the header and positions the cursor at the first question.
    pub fn new(message: &'a [u8]) -> Result<Parser<'a>> {
        let header = Header::unpack(message)
            .ok_or(DnsError::InvalidMessage("message shorter than the header"))?;
        Ok(Parser {
            message,
            offset: DNS_HEADER_SIZE,
            header,
            cursor: Cursor::Question(header.qdcount),
            pending: None,
            committed_offset: DNS_HEADER_SIZE,
            qd_done: 0,
            an_done: 0,
            ns_done: 0,
            ar_done: 0,
        })
    }

    /// Offset up to which the message has been fully, sequentially
    /// consumed — see `committed_offset` on the struct.
    #[inline]
    pub fn committed_offset(&self) -> usize {
        self.committed_offset
    }

    /// `(qdcount, ancount, nscount, arcount)` reflecting only fully
    /// consumed items, for `truncate::snapshot`.
    #[inline]
    pub fn committed_counts(&self) -> (u16, u16, u16, u16) {
        (self.qd_done, self.an_done, self.ns_done, self.ar_done)
    }

    #[inline]
    pub fn header(&self) -> Header {
        self.header
    }

    #[inline]
    pub fn message(&self) -> &'a [u8] {
        self.message
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn require_no_pending(&self, what: &'static str) {
        if self.pending.is_some() {
            panic!("{what} called while a resource's rdata has not been consumed or skipped");
        }
    }

    fn unpack(&mut self) -> Result<UnpackedName> {
        let unpacked = compress::unpack_name(self.message, self.offset)?;
        self.offset += unpacked.consumed;
        Ok(unpacked)
    }

    fn ensure_remaining(&self, len: usize) -> Result<()> {
        if self.message.len() - self.offset < len {
            return Err(DnsError::InvalidMessage("record runs past end of message"));
        }
        Ok(())
    }

    fn read_u16(&self, at: usize) -> u16 {
        crate::bytes::read_u16(&self.message[at..at + 2])
    }

    fn read_u32(&self, at: usize) -> u32 {
        crate::bytes::read_u32(&self.message[at..at + 4])
    }

    /// Returns the next question, or `None` once `qdcount` questions have
    /// been read. Advances the cursor into the answer section on
    /// exhaustion.
    pub fn question(&mut self) -> Result<Option<Question>> {
        self.require_no_pending("question()");
        let remaining = match self.cursor {
            Cursor::Question(n) => n,
            _ => panic!("question() called after the question section was left"),
        };
        if remaining == 0 {
            self.cursor = Cursor::Answer(self.header.ancount);
            return Ok(None);
        }
        let unpacked = self.unpack()?;
        self.ensure_remaining(DNS_QUESTION_TAIL_SIZE)?;
        let qtype = self.read_u16(self.offset);
        let qclass = self.read_u16(self.offset + 2);
        self.offset += DNS_QUESTION_TAIL_SIZE;
        self.cursor = Cursor::Question(remaining - 1);
        self.qd_done += 1;
        self.committed_offset = self.offset;
        let name = Name::from_wire_owned(unpacked.wire)?;
        Ok(Some(Question { name, qtype, qclass }))
    }

    fn section_remaining(&self) -> Option<(Section, u16)> {
        match self.cursor {
            Cursor::Question(_) => None,
            Cursor::Answer(n) => Some((Section::Answer, n)),
            Cursor::Authority(n) => Some((Section::Authority, n)),
            Cursor::Additional(n) => Some((Section::Additional, n)),
            Cursor::Done => None,
        }
    }

    fn advance_to_next_nonempty_section(&mut self) {
        loop {
            match self.cursor {
                Cursor::Question(_) => {
                    self.cursor = Cursor::Answer(self.header.ancount);
                }
                Cursor::Answer(0) => {
                    self.cursor = Cursor::Authority(self.header.nscount);
                }
                Cursor::Authority(0) => {
                    self.cursor = Cursor::Additional(self.header.arcount);
                }
                Cursor::Additional(0) => {
                    self.cursor = Cursor::Done;
                    break;
                }
                Cursor::Done => break,
                _ => break,
            }
        }
    }

    /// Returns the header of the next resource record across the answer,
    /// authority and additional sections (in that order), or `None` once
    /// all three are exhausted. The caller must consume the rdata — via
    /// `resource_data()`/`skip_resource_data()`/`rd_parser()` — before
    /// calling this again.
    pub fn resource_header(&mut self) -> Result<Option<(Section, ResourceHeader)>> {
        self.require_no_pending("resource_header()");
        if matches!(self.cursor, Cursor::Question(_)) {
            self.cursor = Cursor::Answer(self.header.ancount);
        }
        self.advance_to_next_nonempty_section();
        let (section, remaining) = match self.section_remaining() {
            Some(sr) => sr,
            None => return Ok(None),
        };
        let unpacked = self.unpack()?;
        self.ensure_remaining(DNS_RR_HEADER_SIZE)?;
        let rtype = self.read_u16(self.offset);
        let rclass = self.read_u16(self.offset + 2);
        let ttl = self.read_u32(self.offset + 4);
        let rdlength = self.read_u16(self.offset + 8) as usize;
        self.offset += DNS_RR_HEADER_SIZE;
        if rdlength > MAX_RDLENGTH {
            return Err(DnsError::ResourceTooLong);
        }
        self.ensure_remaining(rdlength)?;
        let rdata_offset = self.offset;
        self.pending = Some(Pending {
            start: rdata_offset,
            len: rdlength,
            section,
        });
        let remaining = remaining - 1;
        self.cursor = match section {
            Section::Answer => Cursor::Answer(remaining),
            Section::Authority => Cursor::Authority(remaining),
            Section::Additional => Cursor::Additional(remaining),
            Section::Question => unreachable!(),
        };
        let name = Name::from_wire_owned(unpacked.wire)?;
        Ok(Some((
            section,
            ResourceHeader {
                name,
                rtype,
                rclass,
                ttl,
                rdlength,
                rdata_offset,
            },
        )))
    }

    /// Returns the raw rdata bytes of the resource record just read by
    /// `resource_header()`, with any embedded names still compressed.
    /// Does not advance the cursor past the rdata — use
    /// `skip_resource_data()` for that, or let the next
    /// `resource_header()`/`question()` call do it implicitly.
    pub fn resource_data(&self) -> &'a [u8] {
        let pending = self
            .pending
            .expect("resource_data() called with no pending resource record");
        &self.message[pending.start..pending.start + pending.len]
    }

    /// Unpacks a name embedded inside the current rdata at `offset_in_rdata`
    /// (e.g. the target of an NS/CNAME/PTR, or either name of an SOA),
    /// chasing compression pointers against the whole message.
    pub fn unpack_embedded_name(&self, offset_in_rdata: usize) -> Result<(Name, usize)> {
        let pending = self
            .pending
            .expect("unpack_embedded_name() called with no pending resource record");
        let absolute = pending.start + offset_in_rdata;
        let unpacked = compress::unpack_name(self.message, absolute)?;
        let consumed = unpacked.consumed;
        Ok((Name::from_wire_owned(unpacked.wire)?, consumed))
    }

    /// Returns the compression hint a parsed name should carry if it is
    /// re-emitted as-is by a builder (§3: `WasCompressed`/`NotCompressed`).
    pub fn embedded_name_hint(&self, offset_in_rdata: usize) -> Result<CompressHint> {
        let pending = self
            .pending
            .expect("embedded_name_hint() called with no pending resource record");
        let absolute = pending.start + offset_in_rdata;
        let unpacked = compress::unpack_name(self.message, absolute)?;
        Ok(if unpacked.compressed {
            CompressHint::WasCompressed
        } else {
            CompressHint::NotCompressed
        })
    }

    /// Advances the cursor past the current resource's rdata without
    /// decoding it.
    pub fn skip_resource_data(&mut self) -> Result<()> {
        let pending = self
            .pending
            .take()
            .expect("skip_resource_data() called with no pending resource record");
        self.offset = pending.start + pending.len;
        match pending.section {
            Section::Answer => self.an_done += 1,
            Section::Authority => self.ns_done += 1,
            Section::Additional => self.ar_done += 1,
            Section::Question => unreachable!(),
        }
        self.committed_offset = self.offset;
        Ok(())
    }

    /// Hands the current resource's rdata off to a bounded sub-parser,
    /// consuming the pending state the same way `skip_resource_data()`
    /// does. The rdata is owned by the returned `RdParser` from this point
    /// on; nothing else on `Parser` can read it again.
    pub fn rd_parser(&mut self) -> Result<RdParser<'a>> {
        let pending = self
            .pending
            .expect("rd_parser() called with no pending resource record");
        let sub = RdParser {
            message: self.message,
            start: pending.start,
            len: pending.len,
            pos: 0,
        };
        self.skip_resource_data()?;
        Ok(sub)
    }

    /// True once every section's declared count has been consumed and no
    /// rdata is left pending.
    pub fn is_done(&self) -> bool {
        matches!(self.cursor, Cursor::Done) && self.pending.is_none()
    }

    /// Verifies the parser reached the end of all four sections with
    /// nothing left over, mirroring the distilled spec's `end()`
    /// operation.
    pub fn end(&mut self) -> Result<()> {
        if self.pending.is_some() {
            return Err(DnsError::InvalidOperation(
                "end() called with unconsumed rdata pending",
            ));
        }
        self.advance_to_next_nonempty_section();
        if !matches!(self.cursor, Cursor::Done) {
            return Err(DnsError::InvalidMessage(
                "sections do not account for every declared record",
            ));
        }
        if self.offset != self.message.len() {
            return Err(DnsError::InvalidMessage(
                "trailing bytes after the last record",
            ));
        }
        Ok(())
    }
}

/// A sub-parser bounded to a single resource record's rdata (§4.7),
/// returned by `Parser::rd_parser()`. Every read is checked against the
/// rdlength the parent already validated, so a malformed record fails here
/// rather than by reading into the next record.
#[derive(Copy, Clone, Debug)]
pub struct RdParser<'a> {
    message: &'a [u8],
    start: usize,
    len: usize,
    pos: usize,
}

impl<'a> RdParser<'a> {
    /// Total length of the rdata this sub-parser was bounded to.
    #[inline]
    pub fn length(&self) -> usize {
        self.len
    }

    fn remaining(&self) -> usize {
        self.len - self.pos
    }

    fn ensure_remaining(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(DnsError::InvalidMessage("rdata sub-parser read past rdlength"));
        }
        Ok(())
    }

    /// Unpacks a name at the current position, chasing compression pointers
    /// against the whole message, and advances past its packed form.
    pub fn name(&mut self) -> Result<Name> {
        let absolute = self.start + self.pos;
        let unpacked = compress::unpack_name(self.message, absolute)?;
        self.ensure_remaining(unpacked.consumed)?;
        self.pos += unpacked.consumed;
        Name::from_wire_owned(unpacked.wire)
    }

    /// Returns the next `n` raw bytes and advances past them.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure_remaining(n)?;
        let absolute = self.start + self.pos;
        self.pos += n;
        Ok(&self.message[absolute..absolute + n])
    }

    /// Returns every remaining byte and advances to the end of the rdata.
    pub fn all_bytes(&mut self) -> &'a [u8] {
        let remaining = self.remaining();
        self.bytes(remaining).expect("remaining() bytes are always available")
    }

    pub fn uint8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    pub fn uint16(&mut self) -> Result<u16> {
        Ok(crate::bytes::read_u16(self.bytes(2)?))
    }

    pub fn uint32(&mut self) -> Result<u32> {
        Ok(crate::bytes::read_u32(self.bytes(4)?))
    }

    pub fn uint64(&mut self) -> Result<u64> {
        Ok(crate::bytes::read_u64(self.bytes(8)?))
    }

    /// Verifies every byte of the rdata was consumed.
    pub fn end(&self) -> Result<()> {
        if self.pos != self.len {
            return Err(DnsError::InvalidMessage("rdata sub-parser left bytes unconsumed"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::constants::{Class, Type};
    use crate::resource::A;

    fn sample_message() -> Vec<u8> {
        let mut b = Builder::new(1, 0);
        b.add_question(&Name::from_text("example.com.").unwrap(), Type::A.into(), Class::IN.into())
            .unwrap();
        b.start_answers();
        b.add_answer(
            &Name::from_text("example.com.").unwrap(),
            Class::IN.into(),
            300,
            CompressHint::WhenPossible,
            &A { address: [93, 184, 216, 34] },
        )
        .unwrap();
        b.finish()
    }

    #[test]
    fn parses_question_and_answer() {
        let msg = sample_message();
        let mut p = Parser::new(&msg).unwrap();
        let q = p.question().unwrap().unwrap();
        assert_eq!(q.name.to_text(), "example.com.");
        assert!(p.question().unwrap().is_none());
        let (section, header) = p.resource_header().unwrap().unwrap();
        assert_eq!(section, Section::Answer);
        assert_eq!(header.rtype, u16::from(Type::A));
        assert_eq!(header.rdlength, 4);
        assert_eq!(p.resource_data(), &[93, 184, 216, 34]);
        p.skip_resource_data().unwrap();
        assert!(p.resource_header().unwrap().is_none());
        p.end().unwrap();
    }

    #[test]
    fn end_rejects_unconsumed_rdata() {
        let msg = sample_message();
        let mut p = Parser::new(&msg).unwrap();
        p.question().unwrap();
        p.resource_header().unwrap();
        assert!(p.end().is_err());
    }

    #[test]
    fn rejects_short_message() {
        assert!(Parser::new(&[0u8; 4]).is_err());
    }

    #[test]
    fn rd_parser_reads_the_bounded_rdata_and_clears_pending_state() {
        let msg = sample_message();
        let mut p = Parser::new(&msg).unwrap();
        p.question().unwrap();
        let (_, header) = p.resource_header().unwrap().unwrap();
        assert_eq!(header.rdlength, 4);
        let mut rd = p.rd_parser().unwrap();
        assert_eq!(rd.length(), 4);
        let addr = [rd.uint8().unwrap(), rd.uint8().unwrap(), rd.uint8().unwrap(), rd.uint8().unwrap()];
        assert_eq!(addr, [93, 184, 216, 34]);
        rd.end().unwrap();
        // The parent parser moved past the record; nothing is pending.
        assert!(p.resource_header().unwrap().is_none());
        p.end().unwrap();
    }

    #[test]
    fn rd_parser_rejects_reads_past_rdlength() {
        let msg = sample_message();
        let mut p = Parser::new(&msg).unwrap();
        p.question().unwrap();
        p.resource_header().unwrap();
        let mut rd = p.rd_parser().unwrap();
        assert!(rd.bytes(5).is_err());
    }

    #[test]
    fn rd_parser_end_rejects_unconsumed_bytes() {
        let msg = sample_message();
        let mut p = Parser::new(&msg).unwrap();
        p.question().unwrap();
        p.resource_header().unwrap();
        let rd = p.rd_parser().unwrap();
        assert!(rd.end().is_err());
    }

    #[test]
    fn fork_allows_speculative_lookahead() {
        let msg = sample_message();
        let mut p = Parser::new(&msg).unwrap();
        p.question().unwrap();
        let saved = p;
        p.resource_header().unwrap();
        let mut resumed = saved;
        let (_, header) = resumed.resource_header().unwrap().unwrap();
        assert_eq!(header.rtype, u16::from(Type::A));
    }
}
