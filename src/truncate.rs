//! Faked-counts message snapshots (§4.11), grounded in the teacher's
//! `ParsedPacket::copy_header`/`copy_raw_edns_section` — both copy raw
//! byte ranges straight out of the already-received buffer rather than
//! re-encoding anything.
//!
//! A TSIG-style signer needs to MAC "the message as observed so far"
//! mid-traversal, before it has decided whether the rest is trustworthy.
//! `snapshot` gives it a standalone, self-consistent prefix: a header
//! whose counts match only what the parser has fully consumed, followed
//! by the original bytes up to the end of the last completed item. A
//! record whose header was read but whose rdata hasn't been consumed yet
//! contributes nothing — not even its header — to either the counts or
//! the byte range.

use crate::constants::DNS_HEADER_SIZE;
use crate::parser::Parser;

/// Builds the faked-counts prefix of `parser`'s underlying message.
pub fn snapshot(parser: &Parser) -> Vec<u8> {
    let (qdcount, ancount, nscount, arcount) = parser.committed_counts();
    let mut header = parser.header();
    header.qdcount = qdcount;
    header.ancount = ancount;
    header.nscount = nscount;
    header.arcount = arcount;

    let boundary = parser.committed_offset();
    let mut out = vec![0u8; DNS_HEADER_SIZE];
    header.pack(&mut out);
    out.extend_from_slice(&parser.message()[DNS_HEADER_SIZE..boundary]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::constants::{Class, Type};
    use crate::name::{CompressHint, Name};
    use crate::resource::A;

    fn two_answer_message() -> Vec<u8> {
        let mut b = Builder::new(7, 0);
        b.add_question(&Name::from_text("example.com.").unwrap(), Type::A.into(), Class::IN.into())
            .unwrap();
        b.start_answers();
        b.add_answer(
            &Name::from_text("example.com.").unwrap(),
            Class::IN.into(),
            300,
            CompressHint::WhenPossible,
            &A { address: [1, 2, 3, 4] },
        )
        .unwrap();
        b.add_answer(
            &Name::from_text("example.com.").unwrap(),
            Class::IN.into(),
            300,
            CompressHint::WhenPossible,
            &A { address: [5, 6, 7, 8] },
        )
        .unwrap();
        b.start_authorities();
        b.start_additionals();
        b.finish()
    }

    #[test]
    fn fully_consumed_snapshot_matches_whole_message() {
        let msg = two_answer_message();
        let mut p = Parser::new(&msg).unwrap();
        p.question().unwrap();
        for _ in 0..2 {
            p.resource_header().unwrap();
            p.skip_resource_data().unwrap();
        }
        assert!(p.resource_header().unwrap().is_none());
        assert_eq!(snapshot(&p), msg);
    }

    #[test]
    fn unconsumed_rdata_is_excluded_from_counts_and_bytes() {
        let msg = two_answer_message();
        let mut p = Parser::new(&msg).unwrap();
        p.question().unwrap();
        p.resource_header().unwrap(); // first answer's header read, rdata not consumed
        let snap = snapshot(&p);

        let snap_header = crate::header::Header::unpack(&snap).unwrap();
        assert_eq!(snap_header.qdcount, 1);
        assert_eq!(snap_header.ancount, 0);
        assert_eq!(snap.len(), p.committed_offset());
        // re-parsing the snapshot sees exactly the committed question, nothing else
        let mut reparsed = Parser::new(&snap).unwrap();
        let q = reparsed.question().unwrap().unwrap();
        assert_eq!(q.name.to_text(), "example.com.");
        reparsed.end().unwrap();
    }

    #[test]
    fn one_of_two_answers_committed() {
        let msg = two_answer_message();
        let mut p = Parser::new(&msg).unwrap();
        p.question().unwrap();
        p.resource_header().unwrap();
        p.skip_resource_data().unwrap(); // first answer fully consumed
        p.resource_header().unwrap(); // second answer's header read only
        let snap = snapshot(&p);
        let snap_header = crate::header::Header::unpack(&snap).unwrap();
        assert_eq!(snap_header.qdcount, 1);
        assert_eq!(snap_header.ancount, 1);
    }
}
