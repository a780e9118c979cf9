//! Literal end-to-end wire-format scenarios (§8): each test pins down an
//! exact byte layout rather than just asserting a round trip, mirroring how
//! a hand-crafted capture would be checked against this crate's output.

use dnsmsg::{
    Builder, Class, ClientSubnet, CompressHint, CompressionTable, Cookie, DnsError, EdnsOptionCode,
    ExtendedDnsError, Name, Opt, Parser, Type, A,
};

#[test]
fn single_question_message_matches_expected_bytes() {
    let mut b = Builder::new(0, 0);
    b.add_question(&Name::from_text("example.com.").unwrap(), Type::A.into(), Class::IN.into())
        .unwrap();
    let msg = b.finish();

    let expected_tail: &[u8] = &[
        0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00, // example.com.
        0x00, 0x01, // qtype A
        0x00, 0x01, // qclass IN
    ];
    assert_eq!(&msg[12..], expected_tail);

    let mut p = Parser::new(&msg).unwrap();
    assert_eq!(p.header().qdcount, 1);
    let q = p.question().unwrap().unwrap();
    assert_eq!(q.name.to_text(), "example.com.");
    assert_eq!(q.qtype, u16::from(Type::A));
    assert_eq!(q.qclass, u16::from(Class::IN));
    assert!(p.question().unwrap().is_none());
    assert!(p.resource_header().unwrap().is_none());
}

#[test]
fn answer_name_compresses_to_a_pointer_at_the_question_offset() {
    let mut b = Builder::new(1, 0);
    b.add_question(&Name::from_text("example.com.").unwrap(), Type::A.into(), Class::IN.into())
        .unwrap();
    b.start_answers();
    b.add_answer(
        &Name::from_text("example.com.").unwrap(),
        Class::IN.into(),
        3600,
        CompressHint::WhenPossible,
        &A { address: [192, 0, 2, 1] },
    )
    .unwrap();
    let msg = b.finish();

    // 12 (header) + 17 (question) + 2 (pointer) + 10 (type/class/ttl/rdlen) + 4 (rdata)
    assert_eq!(msg.len(), 45);
    let answer_name_start = 12 + 17;
    assert_eq!(&msg[answer_name_start..answer_name_start + 2], &[0xc0, 0x0c]);
}

#[test]
fn three_appended_names_share_suffixes_via_pointers() {
    let mut buf = vec![0u8; 12];
    let mut table = CompressionTable::new();
    for text in ["com.", "example.com.", "www.example.com."] {
        table
            .append(&mut buf, &Name::from_text(text).unwrap(), CompressHint::WhenPossible)
            .unwrap();
    }
    let expected: &[u8] = &[
        0x03, b'c', b'o', b'm', 0x00, // com.
        0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0xc0, 0x0c, // example.<ptr com.>
        0x03, b'w', b'w', b'w', 0xc0, 0x11, // www.<ptr example.com.>
    ];
    assert_eq!(&buf[12..], expected);
}

#[test]
fn opt_record_with_three_options_round_trips_exactly() {
    let mut b = Builder::new(1, 0);
    b.start_answers();
    b.start_authorities();
    b.start_additionals();

    let client_subnet = ClientSubnet {
        family: 1,
        source_prefix: 8,
        scope_prefix: 7,
        address: vec![192, 0, 2, 1],
    };
    let cookie = Cookie {
        client: [0x01, 0x02, 0x22, 0x1f, 0xb8, 0x7a, 0xde, 0x6f],
        server: vec![0x6f, 0x22, 0xde, 0xc2, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
    };
    let ede = ExtendedDnsError { info_code: 1, extra_text: b"error text".to_vec() };

    {
        let mut opt = b.start_opt(1232, 0, 0, 0).unwrap();
        opt.add_option(EdnsOptionCode::ClientSubnet.into(), &client_subnet.encode()).unwrap();
        opt.add_option(EdnsOptionCode::Cookie.into(), &cookie.encode()).unwrap();
        opt.add_option(EdnsOptionCode::ExtendedDnsError.into(), &ede.encode()).unwrap();
        opt.end().unwrap();
    }
    let msg = b.finish();

    let mut p = Parser::new(&msg).unwrap();
    let (_, header) = p.resource_header().unwrap().unwrap();
    assert_eq!(header.rtype, u16::from(Type::OPT));
    assert_eq!(header.rclass, 1232);
    let opt = Opt::parse(&p, &header).unwrap();
    assert_eq!(opt.client_subnet().unwrap().unwrap(), client_subnet);
    assert_eq!(opt.cookie().unwrap().unwrap(), cookie);
    assert_eq!(opt.extended_dns_error().unwrap().unwrap(), ede);
}

#[test]
fn size_limit_of_thirty_admits_one_question_and_truncates_the_second() {
    let mut b = Builder::new(1, 0);
    b.limit_message_size(30);
    b.add_question(&Name::from_text("example.com.").unwrap(), Type::A.into(), Class::IN.into())
        .unwrap();
    assert_eq!(b.length(), 29); // 12 + 13 (name) + 4 (type/class)

    let before = b.length();
    let err = b
        .add_question(&Name::from_text("example.com.").unwrap(), Type::A.into(), Class::IN.into())
        .unwrap_err();
    assert_eq!(err, DnsError::Truncated);
    assert_eq!(b.length(), before);
    assert_eq!(b.header().qdcount, 1);
}

#[test]
fn a_two_cycle_pointer_chain_trips_the_loop_guard() {
    // Offset 0 is a pointer to offset 2; offset 2 is a pointer back to
    // offset 0 — an unconditional two-step cycle.
    let buf: [u8; 4] = [0xc0, 0x02, 0xc0, 0x00];
    let err = dnsmsg::unpack_name(&buf, 2).unwrap_err();
    assert_eq!(err, DnsError::PointerLoop(127));
}
