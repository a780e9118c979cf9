//! Typed RDATA for the record types this crate knows how to encode and
//! decode directly (§3, §4.8). Everything else travels as opaque bytes
//! through the builder's `add_raw_answer`-style paths.

use crate::bytes;
use crate::compress::{self, CompressionTable};
use crate::constants::Type;
use crate::error::{DnsError, Result};
use crate::name::{CompressHint, Name};

/// Implemented by every typed RDATA this crate knows how to append to a
/// builder. Lets `Builder::add_answer` (and friends) stay generic over
/// record type instead of growing one method per RR.
pub trait EncodeRdata {
    const RTYPE: Type;

    fn encode_rdata(&self, buf: &mut Vec<u8>, table: &mut CompressionTable, hint: CompressHint) -> Result<()>;
}

impl EncodeRdata for A {
    const RTYPE: Type = Type::A;
    fn encode_rdata(&self, buf: &mut Vec<u8>, _table: &mut CompressionTable, _hint: CompressHint) -> Result<()> {
        self.encode(buf);
        Ok(())
    }
}

impl EncodeRdata for Aaaa {
    const RTYPE: Type = Type::AAAA;
    fn encode_rdata(&self, buf: &mut Vec<u8>, _table: &mut CompressionTable, _hint: CompressHint) -> Result<()> {
        self.encode(buf);
        Ok(())
    }
}

impl EncodeRdata for Ns {
    const RTYPE: Type = Type::NS;
    fn encode_rdata(&self, buf: &mut Vec<u8>, table: &mut CompressionTable, hint: CompressHint) -> Result<()> {
        self.encode(buf, table, hint)
    }
}

impl EncodeRdata for Cname {
    const RTYPE: Type = Type::CNAME;
    fn encode_rdata(&self, buf: &mut Vec<u8>, table: &mut CompressionTable, hint: CompressHint) -> Result<()> {
        self.encode(buf, table, hint)
    }
}

impl EncodeRdata for Ptr {
    const RTYPE: Type = Type::PTR;
    fn encode_rdata(&self, buf: &mut Vec<u8>, table: &mut CompressionTable, hint: CompressHint) -> Result<()> {
        self.encode(buf, table, hint)
    }
}

impl EncodeRdata for Mx {
    const RTYPE: Type = Type::MX;
    fn encode_rdata(&self, buf: &mut Vec<u8>, table: &mut CompressionTable, hint: CompressHint) -> Result<()> {
        self.encode(buf, table, hint)
    }
}

impl EncodeRdata for Soa {
    const RTYPE: Type = Type::SOA;
    fn encode_rdata(&self, buf: &mut Vec<u8>, table: &mut CompressionTable, hint: CompressHint) -> Result<()> {
        self.encode(buf, table, hint)
    }
}

impl EncodeRdata for Txt {
    const RTYPE: Type = Type::TXT;
    fn encode_rdata(&self, buf: &mut Vec<u8>, _table: &mut CompressionTable, _hint: CompressHint) -> Result<()> {
        self.encode(buf);
        Ok(())
    }
}

/// A 32-bit IPv4 address record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct A {
    pub address: [u8; 4],
}

impl A {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.address);
    }

    pub fn decode(rdata: &[u8]) -> Result<A> {
        if rdata.len() != 4 {
            return Err(DnsError::InvalidMessage("A rdata must be 4 bytes"));
        }
        let mut address = [0u8; 4];
        address.copy_from_slice(rdata);
        Ok(A { address })
    }
}

/// A 128-bit IPv6 address record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Aaaa {
    pub address: [u8; 16],
}

impl Aaaa {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.address);
    }

    pub fn decode(rdata: &[u8]) -> Result<Aaaa> {
        if rdata.len() != 16 {
            return Err(DnsError::InvalidMessage("AAAA rdata must be 16 bytes"));
        }
        let mut address = [0u8; 16];
        address.copy_from_slice(rdata);
        Ok(Aaaa { address })
    }
}

/// Shared shape of NS/CNAME/PTR: a single target name, the only rdata.
fn encode_single_name(
    buf: &mut Vec<u8>,
    table: &mut CompressionTable,
    name: &Name,
    hint: CompressHint,
) -> Result<()> {
    table.append(buf, name, hint)
}

/// Unpacks the single name making up an NS/CNAME/PTR rdata and checks that
/// it consumed exactly `rdlength` bytes (§4.8: bytes consumed must equal
/// rdlength), catching an rdlength that lies about where the name ends.
fn decode_single_name(message: &[u8], rdata_offset: usize, rdlength: usize) -> Result<Name> {
    let unpacked = compress::unpack_name(message, rdata_offset)?;
    if unpacked.consumed != rdlength {
        return Err(DnsError::InvalidMessage("rdata length does not match the encoded name"));
    }
    Name::from_wire_owned(unpacked.wire)
}

/// An authoritative name server record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ns {
    pub name: Name,
}

impl Ns {
    pub fn encode(&self, buf: &mut Vec<u8>, table: &mut CompressionTable, hint: CompressHint) -> Result<()> {
        encode_single_name(buf, table, &self.name, hint)
    }

    pub fn decode(message: &[u8], rdata_offset: usize, rdlength: usize) -> Result<Ns> {
        Ok(Ns { name: decode_single_name(message, rdata_offset, rdlength)? })
    }
}

/// A canonical name (alias) record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cname {
    pub name: Name,
}

impl Cname {
    pub fn encode(&self, buf: &mut Vec<u8>, table: &mut CompressionTable, hint: CompressHint) -> Result<()> {
        encode_single_name(buf, table, &self.name, hint)
    }

    pub fn decode(message: &[u8], rdata_offset: usize, rdlength: usize) -> Result<Cname> {
        Ok(Cname { name: decode_single_name(message, rdata_offset, rdlength)? })
    }
}

/// A pointer (reverse-lookup) record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ptr {
    pub name: Name,
}

impl Ptr {
    pub fn encode(&self, buf: &mut Vec<u8>, table: &mut CompressionTable, hint: CompressHint) -> Result<()> {
        encode_single_name(buf, table, &self.name, hint)
    }

    pub fn decode(message: &[u8], rdata_offset: usize, rdlength: usize) -> Result<Ptr> {
        Ok(Ptr { name: decode_single_name(message, rdata_offset, rdlength)? })
    }
}

/// A mail exchanger record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mx {
    pub preference: u16,
    pub exchange: Name,
}

impl Mx {
    pub fn encode(&self, buf: &mut Vec<u8>, table: &mut CompressionTable, hint: CompressHint) -> Result<()> {
        bytes::push_u16(buf, self.preference);
        table.append(buf, &self.exchange, hint)
    }

    pub fn decode(message: &[u8], rdata_offset: usize, rdlength: usize) -> Result<Mx> {
        if rdata_offset + 2 > message.len() {
            return Err(DnsError::InvalidMessage("MX rdata truncated before preference"));
        }
        let rdlength_after_preference = rdlength
            .checked_sub(2)
            .ok_or(DnsError::InvalidMessage("MX rdata shorter than its preference field"))?;
        let preference = bytes::read_u16(&message[rdata_offset..rdata_offset + 2]);
        let exchange = decode_single_name(message, rdata_offset + 2, rdlength_after_preference)?;
        Ok(Mx { preference, exchange })
    }
}

/// A zone's start-of-authority record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Soa {
    pub mname: Name,
    pub rname: Name,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl Soa {
    pub fn encode(&self, buf: &mut Vec<u8>, table: &mut CompressionTable, hint: CompressHint) -> Result<()> {
        table.append(buf, &self.mname, hint)?;
        table.append(buf, &self.rname, hint)?;
        bytes::push_u32(buf, self.serial);
        bytes::push_u32(buf, self.refresh);
        bytes::push_u32(buf, self.retry);
        bytes::push_u32(buf, self.expire);
        bytes::push_u32(buf, self.minimum);
        Ok(())
    }

    pub fn decode(message: &[u8], rdata_offset: usize, rdlength: usize) -> Result<Soa> {
        let mname_unpacked = compress::unpack_name(message, rdata_offset)?;
        let after_mname = rdata_offset + mname_unpacked.consumed;
        let rname_unpacked = compress::unpack_name(message, after_mname)?;
        let tail = after_mname + rname_unpacked.consumed;
        if tail + 20 > message.len() {
            return Err(DnsError::InvalidMessage("SOA rdata truncated before fixed fields"));
        }
        let consumed = mname_unpacked.consumed + rname_unpacked.consumed + 20;
        if consumed != rdlength {
            return Err(DnsError::InvalidMessage("SOA rdata length does not match its fields"));
        }
        Ok(Soa {
            mname: Name::from_wire_owned(mname_unpacked.wire)?,
            rname: Name::from_wire_owned(rname_unpacked.wire)?,
            serial: bytes::read_u32(&message[tail..tail + 4]),
            refresh: bytes::read_u32(&message[tail + 4..tail + 8]),
            retry: bytes::read_u32(&message[tail + 8..tail + 12]),
            expire: bytes::read_u32(&message[tail + 12..tail + 16]),
            minimum: bytes::read_u32(&message[tail + 16..tail + 20]),
        })
    }
}

/// A TXT record: one or more length-prefixed character-strings.
///
/// Stored as the decoded strings rather than raw framed bytes so callers
/// never have to re-walk the length prefixes themselves, but `decode`
/// re-validates that framing on every parse instead of trusting rdlength
/// alone (an rdlength that lies about where the strings end must not
/// silently become a truncated or overrun read).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Txt {
    pub strings: Vec<Vec<u8>>,
}

impl Txt {
    pub fn new(strings: Vec<Vec<u8>>) -> Result<Txt> {
        if strings.is_empty() {
            return Err(DnsError::EmptyTxt);
        }
        for s in &strings {
            if s.len() > 255 {
                return Err(DnsError::TooLongTxtString);
            }
        }
        Ok(Txt { strings })
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        for s in &self.strings {
            buf.push(s.len() as u8);
            buf.extend_from_slice(s);
        }
    }

    pub fn decode(rdata: &[u8]) -> Result<Txt> {
        let mut strings = Vec::new();
        let mut i = 0;
        while i < rdata.len() {
            let len = rdata[i] as usize;
            if i + 1 + len > rdata.len() {
                return Err(DnsError::InvalidMessage("TXT string runs past rdata"));
            }
            strings.push(rdata[i + 1..i + 1 + len].to_vec());
            i += 1 + len;
        }
        Txt::new(strings)
    }

    /// Concatenates every character-string into one buffer, re-scanning
    /// the internal length framing rather than trusting it was already
    /// validated by `decode` (guards direct callers that built a `Txt`
    /// by hand).
    pub fn validate_and_concat(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for s in &self.strings {
            if s.len() > 255 {
                return Err(DnsError::TooLongTxtString);
            }
            out.extend_from_slice(s);
        }
        Ok(out)
    }
}
