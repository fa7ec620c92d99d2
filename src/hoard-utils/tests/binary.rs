use std::io::{self, Cursor};

use hoard_utils::binary;

#[test]
fn cookie_mismatch() {
    let mut buf = Vec::new();
    binary::write_cookie(&mut buf, 0xdead_beef).unwrap();

    let err = binary::cookie(&mut Cursor::new(&buf), 0xcafe).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);

    assert!(binary::cookie(&mut Cursor::new(&buf), 0xdead_beef).is_ok());
}

#[test]
fn prefixed_strings() {
    let mut buf = Vec::new();
    binary::write_string(&mut buf, "ref:player").unwrap();
    assert_eq!(buf.len(), 8 + 10);

    let s = binary::string(&mut Cursor::new(&buf)).unwrap();
    assert_eq!(s, "ref:player");
}

#[test]
fn truncated_string() {
    let mut buf = Vec::new();
    binary::write_string(&mut buf, "truncated").unwrap();
    buf.truncate(buf.len() - 3);

    let err = binary::string(&mut Cursor::new(&buf)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[test]
fn sequences() {
    let mut buf = Vec::new();
    binary::write_seq(&mut buf, &[1i32, -2, 3], |w, v| binary::write_int32(w, *v)).unwrap();

    let v = binary::seq(&mut Cursor::new(&buf), binary::int32).unwrap();
    assert_eq!(v, vec![1, -2, 3]);
}
