#![allow(dead_code)]
//! Wire layout offsets and the small set of enums this crate actually
//! encodes or decodes.
//!
//! The full IANA type/option registries run into the hundreds of entries;
//! this crate only gives typed treatment to the RR types and EDNS options
//! the spec names (§3) and leaves everything else to the raw/opaque paths
//! in `resource.rs` and `edns.rs`.

/// Size of the fixed 12-byte DNS message header.
pub const DNS_HEADER_SIZE: usize = 12;

/// Maximum length of an encoded name, on the wire, including the terminator.
pub const DNS_MAX_NAME_LEN: usize = 255;

/// Maximum length of a single decoded label.
pub const DNS_MAX_LABEL_LEN: usize = 63;

/// Maximum number of pointer indirections followed while unpacking a name.
/// `(255 - 1) / 2`: the longest possible chain of 2-byte pointers that could
/// still fit inside the maximum name length.
pub const MAX_POINTER_INDIRECTIONS: u16 = 127;

/// Size of a resource record header (name excluded): type, class, ttl, rdlength.
pub const DNS_RR_HEADER_SIZE: usize = 10;

/// Size of a question's tail (name excluded): type, class.
pub const DNS_QUESTION_TAIL_SIZE: usize = 4;

/// Size of the header of a single EDNS(0) option TLV: code, length.
pub const DNS_OPT_HEADER_SIZE: usize = 4;

/// Maximum number of records permitted in any one section.
pub const MAX_SECTION_COUNT: u32 = 0xffff;

/// Maximum size of a single resource's rdata.
pub const MAX_RDLENGTH: usize = 0xffff;

/// Two high bits that mark a compression pointer.
pub const POINTER_MASK: u8 = 0xc0;

/// Offset added by `0xc000 | offset` pointer encoding.
pub const POINTER_FLAG: u16 = 0xc000;

/// Largest absolute offset a compression pointer can address (14 bits).
pub const MAX_POINTER_OFFSET: usize = 0x3fff;

/// DNS record class.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum Class {
    IN = 1,
    CH = 3,
    HS = 4,
    NONE = 254,
    ANY = 255,
}

impl From<Class> for u16 {
    fn from(v: Class) -> u16 {
        v as u16
    }
}

/// Record types this crate gives typed builder/parser support to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum Type {
    A = 1,
    NS = 2,
    CNAME = 5,
    SOA = 6,
    PTR = 12,
    MX = 15,
    TXT = 16,
    AAAA = 28,
    OPT = 41,
}

impl From<Type> for u16 {
    fn from(v: Type) -> u16 {
        v as u16
    }
}

impl Type {
    /// Returns the typed variant for a raw wire value, if known.
    pub fn from_u16(v: u16) -> Option<Type> {
        match v {
            1 => Some(Type::A),
            2 => Some(Type::NS),
            5 => Some(Type::CNAME),
            6 => Some(Type::SOA),
            12 => Some(Type::PTR),
            15 => Some(Type::MX),
            16 => Some(Type::TXT),
            28 => Some(Type::AAAA),
            41 => Some(Type::OPT),
            _ => None,
        }
    }
}

/// DNS return code (the base 4-bit field; EDNS(0) extends it, see `edns.rs`).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Rcode {
    NoError = 0,
    FormErr = 1,
    ServFail = 2,
    NxDomain = 3,
    NotImp = 4,
    Refused = 5,
    YxDomain = 6,
    YxRrSet = 7,
    NxRrSet = 8,
    NotAuth = 9,
    NotZone = 10,
}

impl From<Rcode> for u8 {
    fn from(v: Rcode) -> u8 {
        v as u8
    }
}

/// DNS opcode (4-bit field in the header flags).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Query = 0,
    IQuery = 1,
    Status = 2,
    Notify = 4,
    Update = 5,
}

impl From<Opcode> for u8 {
    fn from(v: Opcode) -> u8 {
        v as u8
    }
}

/// EDNS(0) option codes this crate gives typed support to (§3).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum EdnsOptionCode {
    ClientSubnet = 8,
    Cookie = 10,
    ExtendedDnsError = 15,
}

impl From<EdnsOptionCode> for u16 {
    fn from(v: EdnsOptionCode) -> u16 {
        v as u16
    }
}

impl EdnsOptionCode {
    pub fn from_u16(v: u16) -> Option<EdnsOptionCode> {
        match v {
            8 => Some(EdnsOptionCode::ClientSubnet),
            10 => Some(EdnsOptionCode::Cookie),
            15 => Some(EdnsOptionCode::ExtendedDnsError),
            _ => None,
        }
    }
}

/// A message section, used to key the builder/parser state machines and
/// the compression table's invalidation bookkeeping.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Section {
    Question,
    Answer,
    Authority,
    Additional,
}
