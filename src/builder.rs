//! The incremental, append-only message builder (§4.4-§4.6).
//!
//! A `Builder` never revisits bytes it has already committed except to
//! patch a pending rdlength or roll back to an earlier high-water mark on
//! overflow. Sections are written in the fixed RFC 1035 order — questions,
//! then answers, then authorities, then additionals — enforced by a small
//! state machine that panics on out-of-order calls, the same "programmer
//! error" policy the parser uses.

use crate::bytes;
use crate::compress::CompressionTable;
use crate::constants::{DNS_HEADER_SIZE, MAX_RDLENGTH, MAX_SECTION_COUNT};
use crate::error::{DnsError, Result};
use crate::header::Header;
use crate::name::{CompressHint, Name};
use crate::resource::EncodeRdata;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum BuilderSection {
    Questions,
    Answers,
    Authorities,
    Additionals,
}

/// Builds a DNS message one record at a time.
///
/// `limit_message_size` installs a rollback contract: any append that
/// would push the buffer past the limit is undone in full (the compression
/// table is invalidated back to the pre-append offset too) and reported as
/// `DnsError::Truncated`, leaving the builder exactly as it was before the
/// call. Callers typically respond by setting the header's truncated bit
/// and finishing the message as-is.
pub struct Builder {
    buf: Vec<u8>,
    header: Header,
    section: BuilderSection,
    table: CompressionTable,
    max_size: Option<usize>,
    detached: bool,
}

impl Builder {
    pub fn new(id: u16, flags: u16) -> Builder {
        Builder {
            buf: vec![0u8; DNS_HEADER_SIZE],
            header: Header::new(id, flags),
            section: BuilderSection::Questions,
            table: CompressionTable::new(),
            max_size: None,
            detached: false,
        }
    }

    /// Caps the total message size; any append that would exceed it rolls
    /// back and returns `DnsError::Truncated` instead of growing past it.
    pub fn limit_message_size(&mut self, max: usize) {
        self.max_size = Some(max);
    }

    /// Clears the message back to an empty header with a new id/flags,
    /// reusing the compression table's backing allocation.
    pub fn reset(&mut self, id: u16, flags: u16) {
        self.buf.clear();
        self.buf.resize(DNS_HEADER_SIZE, 0);
        self.header = Header::new(id, flags);
        self.section = BuilderSection::Questions;
        self.table.reset();
        self.detached = false;
    }

    #[inline]
    pub fn header(&self) -> Header {
        self.header
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.buf.len()
    }

    /// The message built so far, with an up-to-date header.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the builder and returns the finished message.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn repack_header(&mut self) {
        let header = self.header;
        header.pack(&mut self.buf[0..DNS_HEADER_SIZE]);
    }

    fn rollback(&mut self, start: usize) {
        self.buf.truncate(start);
        self.table.invalidate_from(start);
    }

    fn require_section(&self, want: BuilderSection, what: &'static str) {
        if self.detached {
            panic!("{what} called while a sub-builder is detached");
        }
        if self.section != want {
            panic!("{what} called out of section order");
        }
    }

    fn check_limit(&mut self, start: usize) -> Result<()> {
        if let Some(max) = self.max_size {
            if self.buf.len() > max {
                self.rollback(start);
                return Err(DnsError::Truncated);
            }
        }
        Ok(())
    }

    /// Moves from the question section to the answer section. Always
    /// legal to call even with zero questions written.
    pub fn start_answers(&mut self) {
        self.require_section(BuilderSection::Questions, "start_answers()");
        self.section = BuilderSection::Answers;
    }

    pub fn start_authorities(&mut self) {
        self.require_section(BuilderSection::Answers, "start_authorities()");
        self.section = BuilderSection::Authorities;
    }

    pub fn start_additionals(&mut self) {
        self.require_section(BuilderSection::Authorities, "start_additionals()");
        self.section = BuilderSection::Additionals;
    }

    /// Appends a question. The question's name is always eligible for
    /// compression — it is frequently the very first name in the message,
    /// which every later name typically points back into.
    pub fn add_question(&mut self, name: &Name, qtype: u16, qclass: u16) -> Result<()> {
        self.require_section(BuilderSection::Questions, "add_question()");
        if u32::from(self.header.qdcount) == MAX_SECTION_COUNT {
            return Err(DnsError::CountLimitReached);
        }
        let start = self.buf.len();
        self.table.append(&mut self.buf, name, CompressHint::WhenPossible)?;
        bytes::push_u16(&mut self.buf, qtype);
        bytes::push_u16(&mut self.buf, qclass);
        self.check_limit(start)?;
        self.header.qdcount += 1;
        self.repack_header();
        Ok(())
    }

    fn section_count(&self, section: BuilderSection) -> u16 {
        match section {
            BuilderSection::Questions => self.header.qdcount,
            BuilderSection::Answers => self.header.ancount,
            BuilderSection::Authorities => self.header.nscount,
            BuilderSection::Additionals => self.header.arcount,
        }
    }

    fn increment_section_count(&mut self, section: BuilderSection) {
        match section {
            BuilderSection::Questions => self.header.qdcount += 1,
            BuilderSection::Answers => self.header.ancount += 1,
            BuilderSection::Authorities => self.header.nscount += 1,
            BuilderSection::Additionals => self.header.arcount += 1,
        }
        self.repack_header();
    }

    fn add_resource<R: EncodeRdata>(
        &mut self,
        section: BuilderSection,
        what: &'static str,
        name: &Name,
        class: u16,
        ttl: u32,
        hint: CompressHint,
        rdata: &R,
    ) -> Result<()> {
        self.require_section(section, what);
        if u32::from(self.section_count(section)) == MAX_SECTION_COUNT {
            return Err(DnsError::CountLimitReached);
        }
        let start = self.buf.len();
        self.table.append(&mut self.buf, name, hint)?;
        bytes::push_u16(&mut self.buf, R::RTYPE.into());
        bytes::push_u16(&mut self.buf, class);
        bytes::push_u32(&mut self.buf, ttl);
        let rdlen_offset = self.buf.len();
        bytes::push_u16(&mut self.buf, 0);
        let rdata_start = self.buf.len();
        rdata.encode_rdata(&mut self.buf, &mut self.table, hint)?;
        let rdlen = self.buf.len() - rdata_start;
        if rdlen > MAX_RDLENGTH {
            self.rollback(start);
            return Err(DnsError::ResourceTooLong);
        }
        bytes::write_u16(&mut self.buf[rdlen_offset..rdlen_offset + 2], rdlen as u16);
        self.check_limit(start)?;
        self.increment_section_count(section);
        Ok(())
    }

    pub fn add_answer<R: EncodeRdata>(
        &mut self,
        name: &Name,
        class: u16,
        ttl: u32,
        hint: CompressHint,
        rdata: &R,
    ) -> Result<()> {
        self.add_resource(BuilderSection::Answers, "add_answer()", name, class, ttl, hint, rdata)
    }

    pub fn add_authority<R: EncodeRdata>(
        &mut self,
        name: &Name,
        class: u16,
        ttl: u32,
        hint: CompressHint,
        rdata: &R,
    ) -> Result<()> {
        self.add_resource(
            BuilderSection::Authorities,
            "add_authority()",
            name,
            class,
            ttl,
            hint,
            rdata,
        )
    }

    pub fn add_additional<R: EncodeRdata>(
        &mut self,
        name: &Name,
        class: u16,
        ttl: u32,
        hint: CompressHint,
        rdata: &R,
    ) -> Result<()> {
        self.add_resource(
            BuilderSection::Additionals,
            "add_additional()",
            name,
            class,
            ttl,
            hint,
            rdata,
        )
    }

    fn add_raw_resource(
        &mut self,
        section: BuilderSection,
        what: &'static str,
        name: &Name,
        rtype: u16,
        class: u16,
        ttl: u32,
        hint: CompressHint,
        rdata: &[u8],
    ) -> Result<()> {
        self.require_section(section, what);
        if rdata.len() > MAX_RDLENGTH {
            return Err(DnsError::ResourceTooLong);
        }
        if u32::from(self.section_count(section)) == MAX_SECTION_COUNT {
            return Err(DnsError::CountLimitReached);
        }
        let start = self.buf.len();
        self.table.append(&mut self.buf, name, hint)?;
        bytes::push_u16(&mut self.buf, rtype);
        bytes::push_u16(&mut self.buf, class);
        bytes::push_u32(&mut self.buf, ttl);
        bytes::push_u16(&mut self.buf, rdata.len() as u16);
        self.buf.extend_from_slice(rdata);
        self.check_limit(start)?;
        self.increment_section_count(section);
        Ok(())
    }

    /// Appends a resource record of a type this crate doesn't model,
    /// with already-encoded rdata passed through verbatim (no
    /// compression applied inside `rdata`, per §4.8's opaque path).
    pub fn add_raw_additional(&mut self, name: &Name, rtype: u16, class: u16, ttl: u32, rdata: &[u8]) -> Result<()> {
        self.add_raw_resource(
            BuilderSection::Additionals,
            "add_raw_additional()",
            name,
            rtype,
            class,
            ttl,
            CompressHint::WhenPossible,
            rdata,
        )
    }

    fn start_raw_resource(
        &mut self,
        section: BuilderSection,
        what: &'static str,
        name: &Name,
        rtype: u16,
        class: u16,
        ttl: u32,
    ) -> Result<RdBuilder<'_>> {
        self.require_section(section, what);
        let rr_start = self.buf.len();
        self.table.append(&mut self.buf, name, CompressHint::WhenPossible)?;
        bytes::push_u16(&mut self.buf, rtype);
        bytes::push_u16(&mut self.buf, class);
        bytes::push_u32(&mut self.buf, ttl);
        let rdlen_offset = self.buf.len();
        bytes::push_u16(&mut self.buf, 0);
        self.detached = true;
        Ok(RdBuilder {
            builder: self,
            rr_start,
            rdlen_offset,
            section,
            finished: false,
        })
    }

    /// Starts a detached sub-builder for an answer-section record whose
    /// rdata must be assembled incrementally (mixing raw bytes and
    /// compressible names). While detached, no other `Builder` method may
    /// be called; dropping the `RdBuilder` without calling `end()` rolls
    /// the whole record back automatically.
    pub fn start_raw_answer(&mut self, name: &Name, rtype: u16, class: u16, ttl: u32) -> Result<RdBuilder<'_>> {
        self.start_raw_resource(BuilderSection::Answers, "start_raw_answer()", name, rtype, class, ttl)
    }

    /// Same as `start_raw_answer`, for the authority section.
    pub fn start_raw_authority(&mut self, name: &Name, rtype: u16, class: u16, ttl: u32) -> Result<RdBuilder<'_>> {
        self.start_raw_resource(
            BuilderSection::Authorities,
            "start_raw_authority()",
            name,
            rtype,
            class,
            ttl,
        )
    }

    /// Same as `start_raw_answer`, for the additional section.
    pub fn start_raw_additional(&mut self, name: &Name, rtype: u16, class: u16, ttl: u32) -> Result<RdBuilder<'_>> {
        self.start_raw_resource(
            BuilderSection::Additionals,
            "start_raw_additional()",
            name,
            rtype,
            class,
            ttl,
        )
    }

    /// Starts a detached OPT pseudo-record in the additional section
    /// (§4.9): root name, type OPT, UDP payload size in the class field,
    /// the extended-rcode/version/flags packed into the TTL field.
    pub fn start_opt(&mut self, udp_payload_size: u16, ext_rcode_high8: u8, version: u8, flags: u16) -> Result<OptBuilder<'_>> {
        self.require_section(BuilderSection::Additionals, "start_opt()");
        let rr_start = self.buf.len();
        self.table.append(&mut self.buf, &Name::root(), CompressHint::Never)?;
        bytes::push_u16(&mut self.buf, crate::constants::Type::OPT.into());
        bytes::push_u16(&mut self.buf, udp_payload_size);
        let ttl = ((ext_rcode_high8 as u32) << 24) | ((version as u32) << 16) | flags as u32;
        bytes::push_u32(&mut self.buf, ttl);
        let rdlen_offset = self.buf.len();
        bytes::push_u16(&mut self.buf, 0);
        self.detached = true;
        Ok(OptBuilder {
            rd: RdBuilder {
                builder: self,
                rr_start,
                rdlen_offset,
                section: BuilderSection::Additionals,
                finished: false,
            },
        })
    }
}

/// A detached handle for incrementally assembling one resource record's
/// rdata. Dropping it without `end()` rolls the record back, clearing the
/// parent `Builder`'s detached state.
pub struct RdBuilder<'a> {
    builder: &'a mut Builder,
    rr_start: usize,
    rdlen_offset: usize,
    section: BuilderSection,
    finished: bool,
}

impl<'a> RdBuilder<'a> {
    pub fn append_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.builder.buf.extend_from_slice(data);
        self.check_limit()
    }

    pub fn append_name(&mut self, name: &Name, hint: CompressHint) -> Result<()> {
        self.builder.table.append(&mut self.builder.buf, name, hint)?;
        self.check_limit()
    }

    fn check_limit(&mut self) -> Result<()> {
        let rdlen_so_far = self.builder.buf.len() - (self.rdlen_offset + 2);
        if rdlen_so_far > MAX_RDLENGTH {
            self.builder.rollback(self.rr_start);
            return Err(DnsError::ResourceTooLong);
        }
        if let Some(max) = self.builder.max_size {
            if self.builder.buf.len() > max {
                self.builder.rollback(self.rr_start);
                return Err(DnsError::Truncated);
            }
        }
        Ok(())
    }

    /// Finalizes the record: patches the rdlength field and increments
    /// the additional-section count.
    pub fn end(mut self) -> Result<()> {
        let rdlen = self.builder.buf.len() - (self.rdlen_offset + 2);
        if rdlen > MAX_RDLENGTH {
            return Err(DnsError::ResourceTooLong);
        }
        bytes::write_u16(&mut self.builder.buf[self.rdlen_offset..self.rdlen_offset + 2], rdlen as u16);
        self.builder.increment_section_count(self.section);
        self.finished = true;
        Ok(())
    }

    /// Explicitly discards the record in progress. Equivalent to letting
    /// the `RdBuilder` drop unfinished.
    pub fn remove(self) {}
}

impl<'a> Drop for RdBuilder<'a> {
    fn drop(&mut self) {
        if !self.finished {
            self.builder.rollback(self.rr_start);
        }
        self.builder.detached = false;
    }
}

/// A detached handle for building an OPT pseudo-record's TLV options.
pub struct OptBuilder<'a> {
    rd: RdBuilder<'a>,
}

impl<'a> OptBuilder<'a> {
    /// Appends one fixed-payload option in a single call.
    pub fn add_option(&mut self, code: u16, data: &[u8]) -> Result<()> {
        if data.len() > MAX_RDLENGTH {
            return Err(DnsError::ResourceTooLong);
        }
        self.rd.append_bytes(&code.to_be_bytes())?;
        self.rd.append_bytes(&(data.len() as u16).to_be_bytes())?;
        self.rd.append_bytes(data)
    }

    /// Starts a single option whose payload is written incrementally.
    pub fn start_option(&mut self, code: u16) -> Result<OptionBuilder<'_, 'a>> {
        self.rd.append_bytes(&code.to_be_bytes())?;
        let option_start = self.rd.builder.buf.len() - 2;
        self.rd.append_bytes(&[0, 0])?;
        Ok(OptionBuilder {
            opt: self,
            option_start,
            finished: false,
        })
    }

    pub fn end(self) -> Result<()> {
        self.rd.end()
    }

    pub fn remove(self) {}
}

/// A detached handle for one EDNS(0) option's payload, nested inside an
/// `OptBuilder`.
pub struct OptionBuilder<'b, 'a> {
    opt: &'b mut OptBuilder<'a>,
    option_start: usize,
    finished: bool,
}

impl<'b, 'a> OptionBuilder<'b, 'a> {
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        self.opt.rd.append_bytes(data)
    }

    pub fn end(mut self) -> Result<()> {
        let len = self.opt.rd.builder.buf.len() - (self.option_start + 4);
        if len > MAX_RDLENGTH {
            return Err(DnsError::ResourceTooLong);
        }
        bytes::write_u16(
            &mut self.opt.rd.builder.buf[self.option_start + 2..self.option_start + 4],
            len as u16,
        );
        self.finished = true;
        Ok(())
    }

    pub fn remove(self) {}
}

impl<'b, 'a> Drop for OptionBuilder<'b, 'a> {
    fn drop(&mut self) {
        if !self.finished {
            self.opt.rd.builder.rollback(self.option_start - 2);
        }
    }
}
