//! Incremental builder and parser for RFC 1035 / EDNS(0) DNS messages,
//! with on-write name compression.

pub mod builder;
pub mod bytes;
pub mod compress;
pub mod constants;
pub mod edns;
pub mod error;
pub mod header;
pub mod name;
pub mod parser;
pub mod resource;
pub mod search;
pub mod truncate;

pub use builder::{Builder, OptBuilder, OptionBuilder, RdBuilder};
pub use compress::{unpack_name, CompressionTable, UnpackedName};
pub use constants::{Class, EdnsOptionCode, Opcode, Rcode, Section, Type};
pub use edns::{ClientSubnet, Cookie, ExtendedDnsError, ExtendedRcode, Opt};
pub use error::{DnsError, Result};
pub use header::Header;
pub use name::{CompressHint, Name};
pub use parser::{Parser, Question, RdParser, ResourceHeader};
pub use resource::{EncodeRdata, Aaaa, Cname, Mx, Ns, Ptr, Soa, Txt, A};
pub use search::SearchIterator;
pub use truncate::snapshot;
