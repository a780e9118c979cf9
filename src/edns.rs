//! EDNS(0) (RFC 6891): the OPT pseudo-RR, its packed TTL fields, and the
//! three option types this crate decodes/encodes by hand — Client Subnet
//! (RFC 7871), Cookie (RFC 7873) and Extended DNS Error (RFC 8914). Any
//! other option code passes through as `(code, Vec<u8>)` (§4.9).

use crate::bytes;
use crate::constants::EdnsOptionCode;
use crate::error::{DnsError, Result};
use crate::parser::{Parser, ResourceHeader};

const FLAG_DO: u16 = 1 << 15;

/// The OPT pseudo-RR, decoded from a resource record the parser already
/// identified as `Type::OPT`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Opt {
    pub udp_payload_size: u16,
    /// The high 8 bits of the 12-bit extended RCode (TTL bits 24-31).
    pub ext_rcode_high8: u8,
    pub version: u8,
    pub flags: u16,
    pub options: Vec<(u16, Vec<u8>)>,
}

impl Opt {
    /// Decodes the OPT record whose header was just returned by
    /// `Parser::resource_header`.
    pub fn parse(parser: &Parser, header: &ResourceHeader) -> Result<Opt> {
        if !header.name.is_root() {
            return Err(DnsError::InvalidMessage("OPT record's name must be the root"));
        }
        let ttl = header.ttl;
        let ext_rcode_high8 = (ttl >> 24) as u8;
        let version = (ttl >> 16) as u8;
        let flags = ttl as u16;
        let data = parser.resource_data();
        let options = parse_options(data)?;
        Ok(Opt {
            udp_payload_size: header.rclass,
            ext_rcode_high8,
            version,
            flags,
            options,
        })
    }

    #[inline]
    pub fn dnssec_ok(&self) -> bool {
        self.flags & FLAG_DO != 0
    }

    /// Combines this record's extended bits with the message header's base
    /// 4-bit RCode into the full 12-bit extended RCode.
    pub fn extended_rcode(&self, base_rcode: u8) -> u16 {
        ExtendedRcode::combine(base_rcode, self.ext_rcode_high8).0
    }

    pub fn find_option(&self, code: u16) -> Option<&[u8]> {
        self.options.iter().find(|(c, _)| *c == code).map(|(_, d)| d.as_slice())
    }

    pub fn client_subnet(&self) -> Option<Result<ClientSubnet>> {
        self.find_option(EdnsOptionCode::ClientSubnet.into()).map(ClientSubnet::decode)
    }

    pub fn cookie(&self) -> Option<Result<Cookie>> {
        self.find_option(EdnsOptionCode::Cookie.into()).map(Cookie::decode)
    }

    pub fn extended_dns_error(&self) -> Option<Result<ExtendedDnsError>> {
        self.find_option(EdnsOptionCode::ExtendedDnsError.into()).map(ExtendedDnsError::decode)
    }
}

fn parse_options(data: &[u8]) -> Result<Vec<(u16, Vec<u8>)>> {
    let mut options = Vec::new();
    let mut i = 0;
    while i < data.len() {
        if i + 4 > data.len() {
            return Err(DnsError::InvalidMessage("OPT option header runs past rdata"));
        }
        let code = bytes::read_u16(&data[i..i + 2]);
        let len = bytes::read_u16(&data[i + 2..i + 4]) as usize;
        if i + 4 + len > data.len() {
            return Err(DnsError::InvalidMessage("OPT option data runs past rdata"));
        }
        options.push((code, data[i + 4..i + 4 + len].to_vec()));
        i += 4 + len;
    }
    Ok(options)
}

/// The 12-bit extended RCode formed from the header's base 4-bit RCode and
/// an OPT record's high 8 bits.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExtendedRcode(pub u16);

impl ExtendedRcode {
    pub fn combine(base_rcode: u8, high8: u8) -> ExtendedRcode {
        ExtendedRcode(((high8 as u16) << 4) | (base_rcode as u16 & 0x0f))
    }

    /// Splits back into `(base_rcode, high8)` for writing a header/OPT pair.
    pub fn split(self) -> (u8, u8) {
        ((self.0 & 0x0f) as u8, (self.0 >> 4) as u8)
    }
}

/// RFC 7871 EDNS Client Subnet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientSubnet {
    /// 1 = IPv4, 2 = IPv6.
    pub family: u8,
    pub source_prefix: u8,
    pub scope_prefix: u8,
    pub address: Vec<u8>,
}

impl ClientSubnet {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + self.address.len());
        out.push(self.family);
        out.push(self.source_prefix);
        out.push(self.scope_prefix);
        out.extend_from_slice(&self.address);
        out
    }

    pub fn decode(data: &[u8]) -> Result<ClientSubnet> {
        if data.len() < 3 {
            return Err(DnsError::InvalidMessage("Client Subnet option shorter than its header"));
        }
        Ok(ClientSubnet {
            family: data[0],
            source_prefix: data[1],
            scope_prefix: data[2],
            address: data[3..].to_vec(),
        })
    }
}

/// RFC 7873 Cookie.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cookie {
    pub client: [u8; 8],
    pub server: Vec<u8>,
}

impl Cookie {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.server.len());
        out.extend_from_slice(&self.client);
        out.extend_from_slice(&self.server);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Cookie> {
        if data.len() < 8 {
            return Err(DnsError::InvalidMessage("Cookie option shorter than the client cookie"));
        }
        let server = &data[8..];
        if !server.is_empty() && (server.len() < 8 || server.len() > 32) {
            return Err(DnsError::InvalidMessage("server cookie must be 8-32 bytes"));
        }
        let mut client = [0u8; 8];
        client.copy_from_slice(&data[0..8]);
        Ok(Cookie { client, server: server.to_vec() })
    }
}

/// RFC 8914 Extended DNS Error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtendedDnsError {
    pub info_code: u16,
    pub extra_text: Vec<u8>,
}

impl ExtendedDnsError {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.extra_text.len());
        bytes::push_u16(&mut out, self.info_code);
        out.extend_from_slice(&self.extra_text);
        out
    }

    pub fn decode(data: &[u8]) -> Result<ExtendedDnsError> {
        if data.len() < 2 {
            return Err(DnsError::InvalidMessage("Extended DNS Error option shorter than its info code"));
        }
        Ok(ExtendedDnsError {
            info_code: bytes::read_u16(&data[0..2]),
            extra_text: data[2..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    #[test]
    fn extended_rcode_round_trips() {
        let combined = ExtendedRcode::combine(3, 0x12);
        let (base, high8) = combined.split();
        assert_eq!(base, 3);
        assert_eq!(high8, 0x12);
    }

    #[test]
    fn client_subnet_round_trips() {
        let cs = ClientSubnet { family: 1, source_prefix: 24, scope_prefix: 0, address: vec![192, 0, 2, 0] };
        let encoded = cs.encode();
        assert_eq!(ClientSubnet::decode(&encoded).unwrap(), cs);
    }

    #[test]
    fn client_subnet_decodes_three_byte_minimum_tlv() {
        // family, source_prefix, scope_prefix, no address bytes at all.
        let data = [1u8, 32, 0];
        let cs = ClientSubnet::decode(&data).unwrap();
        assert_eq!(cs, ClientSubnet { family: 1, source_prefix: 32, scope_prefix: 0, address: Vec::new() });
    }

    #[test]
    fn client_subnet_rejects_shorter_than_three_bytes() {
        assert!(ClientSubnet::decode(&[1u8, 32]).is_err());
    }

    #[test]
    fn cookie_round_trips_client_only() {
        let cookie = Cookie { client: [1, 2, 3, 4, 5, 6, 7, 8], server: Vec::new() };
        let encoded = cookie.encode();
        assert_eq!(Cookie::decode(&encoded).unwrap(), cookie);
    }

    #[test]
    fn cookie_rejects_short_server_part() {
        let mut data = vec![0u8; 8];
        data.extend_from_slice(&[1, 2, 3]); // server cookie too short
        assert!(Cookie::decode(&data).is_err());
    }

    #[test]
    fn extended_dns_error_round_trips() {
        let ede = ExtendedDnsError { info_code: 22, extra_text: b"filtered".to_vec() };
        let encoded = ede.encode();
        assert_eq!(ExtendedDnsError::decode(&encoded).unwrap(), ede);
    }

    #[test]
    fn opt_parses_from_builder_output() {
        let mut b = Builder::new(1, 0);
        b.start_answers();
        b.start_authorities();
        b.start_additionals();
        let cs = ClientSubnet { family: 1, source_prefix: 24, scope_prefix: 0, address: vec![192, 0, 2, 0] };
        {
            let mut opt = b.start_opt(4096, 0, 0, FLAG_DO).unwrap();
            opt.add_option(EdnsOptionCode::ClientSubnet.into(), &cs.encode()).unwrap();
            opt.end().unwrap();
        }
        let msg = b.finish();
        let mut parser = Parser::new(&msg).unwrap();
        let (_section, header) = loop {
            match parser.resource_header().unwrap() {
                Some((section, header)) if header.rtype == u16::from(crate::constants::Type::OPT) => {
                    break (section, header)
                }
                Some(_) => {
                    parser.skip_resource_data().unwrap();
                }
                None => panic!("OPT record not found"),
            }
        };
        let opt = Opt::parse(&parser, &header).unwrap();
        assert_eq!(opt.udp_payload_size, 4096);
        assert!(opt.dnssec_ok());
        let decoded_cs = opt.client_subnet().unwrap().unwrap();
        assert_eq!(decoded_cs, cs);
        assert!(opt.cookie().is_none());
    }
}
