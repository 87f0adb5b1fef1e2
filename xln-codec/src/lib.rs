#![allow(dead_code)]

// Canonical deterministic byte encoding (and its decode inverse) of any
// core structure that participates in a hash: `EntityFrame`,
// `AccountFrame`, `EntityState`, a jurisdiction's commit set. Two
// implementations that agree on this module produce byte-identical
// stateHashes for the same logical value, and `decode(encode(x)) == x`
// for every value — that's the whole contract.
//
// Rules:
//   - integers: big-endian two's-complement, explicit length
//   - booleans: 0x00 / 0x01
//   - sequences: length-prefixed
//   - mappings: sorted by key bytes ascending
//   - strings: UTF-8, length-prefixed
//   - optionals: presence byte prefix
//   - structs: concatenation of field encodings in declaration order
//
// Decoding mirrors the rules field-for-field; a short buffer, an invalid
// tag byte, non-UTF-8 string bytes, or trailing bytes after a value all
// raise `CanonicalEncodingMismatch` rather than panicking.

use std::collections::BTreeMap;

use xln_base::{sha256, Amount, ChannelKey, EntityId, TokenId, XlnError};
use xln_delta::Delta;

pub trait CanonicalEncode {
    fn canonical_encode(&self, out: &mut Vec<u8>);
}

/// The decode half of the codec: the inverse of `CanonicalEncode`,
/// consuming a value's bytes off the front of `input` and returning
/// whatever is left for the next field. A struct's decode impl chains
/// its fields' `canonical_decode` calls in the same declaration order
/// its `canonical_encode` impl writes them in.
pub trait CanonicalDecode: Sized {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError>;
}

pub fn encode<T: CanonicalEncode + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    value.canonical_encode(&mut out);
    out
}

/// Decodes a whole buffer as exactly one `T`, with nothing left over.
/// `CanonicalEncodingMismatch` if the buffer is short, malformed, or has
/// trailing bytes the value's own decode didn't consume.
pub fn decode<T: CanonicalDecode>(bytes: &[u8]) -> Result<T, XlnError> {
    let (value, rest) = T::canonical_decode(bytes)?;
    if !rest.is_empty() {
        return Err(XlnError::CanonicalEncodingMismatch { reason: "trailing bytes after decode" });
    }
    Ok(value)
}

/// `hash(x) = SHA-256(encode(x))` — the codec's only external entry point
/// besides `encode`/`decode`.
pub fn hash<T: CanonicalEncode + ?Sized>(value: &T) -> [u8; 32] {
    sha256(&encode(value))
}

fn write_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u64).to_be_bytes());
}

/// Reads the 8-byte big-endian length prefix every sequence/mapping/
/// length-prefixed-bytes encoding starts with.
fn read_len(input: &[u8]) -> Result<(usize, &[u8]), XlnError> {
    if input.len() < 8 {
        return Err(XlnError::CanonicalEncodingMismatch { reason: "buffer too short for length prefix" });
    }
    let (head, rest) = input.split_at(8);
    let len = u64::from_be_bytes(head.try_into().expect("split_at(8) guarantees 8 bytes")) as usize;
    Ok((len, rest))
}

/// Reads exactly `len` bytes, failing if fewer remain.
fn read_exact(input: &[u8], len: usize) -> Result<(&[u8], &[u8]), XlnError> {
    if input.len() < len {
        return Err(XlnError::CanonicalEncodingMismatch { reason: "buffer too short for declared length" });
    }
    Ok(input.split_at(len))
}

/// Length-prefixed raw bytes, the inverse of `encode_bytes`.
fn decode_bytes(input: &[u8]) -> Result<(Vec<u8>, &[u8]), XlnError> {
    let (len, rest) = read_len(input)?;
    let (body, rest) = read_exact(rest, len)?;
    Ok((body.to_vec(), rest))
}

impl CanonicalEncode for bool {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        out.push(if *self { 0x01 } else { 0x00 });
    }
}

impl CanonicalDecode for bool {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (byte, rest) = read_exact(input, 1)?;
        match byte[0] {
            0x00 => Ok((false, rest)),
            0x01 => Ok((true, rest)),
            _ => Err(XlnError::CanonicalEncodingMismatch { reason: "bool byte was neither 0x00 nor 0x01" }),
        }
    }
}

impl CanonicalEncode for u64 {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl CanonicalDecode for u64 {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (body, rest) = read_exact(input, 8)?;
        Ok((u64::from_be_bytes(body.try_into().expect("read_exact(8) guarantees 8 bytes")), rest))
    }
}

impl CanonicalEncode for i64 {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl CanonicalDecode for i64 {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (body, rest) = read_exact(input, 8)?;
        Ok((i64::from_be_bytes(body.try_into().expect("read_exact(8) guarantees 8 bytes")), rest))
    }
}

impl CanonicalEncode for u32 {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl CanonicalDecode for u32 {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (body, rest) = read_exact(input, 4)?;
        Ok((u32::from_be_bytes(body.try_into().expect("read_exact(4) guarantees 4 bytes")), rest))
    }
}

impl CanonicalEncode for u8 {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl CanonicalDecode for u8 {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (body, rest) = read_exact(input, 1)?;
        Ok((body[0], rest))
    }
}

impl CanonicalEncode for [u8; 32] {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }
}

impl CanonicalDecode for [u8; 32] {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (body, rest) = read_exact(input, 32)?;
        Ok((body.try_into().expect("read_exact(32) guarantees 32 bytes"), rest))
    }
}

/// Length-prefixed raw bytes — the building block for strings, byte
/// vectors, and bigints alike.
pub fn encode_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_len(out, bytes.len());
    out.extend_from_slice(bytes);
}

impl CanonicalEncode for str {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        encode_bytes(out, self.as_bytes());
    }
}

impl CanonicalEncode for String {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        encode_bytes(out, self.as_bytes());
    }
}

impl CanonicalDecode for String {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (body, rest) = decode_bytes(input)?;
        let s = String::from_utf8(body)
            .map_err(|_| XlnError::CanonicalEncodingMismatch { reason: "string bytes were not valid UTF-8" })?;
        Ok((s, rest))
    }
}

impl CanonicalEncode for Amount {
    /// Arbitrary-precision signed integer: big-endian two's-complement,
    /// length-prefixed — no fixed-width ceiling.
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        encode_bytes(out, &self.0.to_signed_bytes_be());
    }
}

impl CanonicalDecode for Amount {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (body, rest) = decode_bytes(input)?;
        Ok((Amount(num_bigint::BigInt::from_signed_bytes_be(&body)), rest))
    }
}

impl CanonicalEncode for EntityId {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

impl CanonicalDecode for EntityId {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (bytes, rest) = <[u8; 32]>::canonical_decode(input)?;
        Ok((EntityId(bytes), rest))
    }
}

impl CanonicalEncode for TokenId {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        self.0.canonical_encode(out);
    }
}

impl CanonicalDecode for TokenId {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (value, rest) = u64::canonical_decode(input)?;
        Ok((TokenId(value), rest))
    }
}

/// `leftEntityId ∥ rightEntityId`, already left-ordered by construction
/// (`ChannelKey::new`) — the jurisdiction's collateral-map key.
impl CanonicalEncode for ChannelKey {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        self.left.canonical_encode(out);
        self.right.canonical_encode(out);
    }
}

impl CanonicalDecode for ChannelKey {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (left, rest) = EntityId::canonical_decode(input)?;
        let (right, rest) = EntityId::canonical_decode(rest)?;
        Ok((ChannelKey { left, right }, rest))
    }
}

/// A bilateral delta's canonical form is its five fields in declaration
/// order — the same layout `xln-account` hashes an `AccountFrame`'s
/// resulting state against.
impl CanonicalEncode for Delta {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        self.offdelta.canonical_encode(out);
        self.collateral.canonical_encode(out);
        self.ondelta.canonical_encode(out);
        self.left_credit_limit.canonical_encode(out);
        self.right_credit_limit.canonical_encode(out);
    }
}

impl CanonicalDecode for Delta {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (offdelta, rest) = Amount::canonical_decode(input)?;
        let (collateral, rest) = Amount::canonical_decode(rest)?;
        let (ondelta, rest) = Amount::canonical_decode(rest)?;
        let (left_credit_limit, rest) = Amount::canonical_decode(rest)?;
        let (right_credit_limit, rest) = Amount::canonical_decode(rest)?;
        Ok((Delta { offdelta, collateral, ondelta, left_credit_limit, right_credit_limit }, rest))
    }
}

impl<T: CanonicalEncode> CanonicalEncode for Option<T> {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        match self {
            None => out.push(0x00),
            Some(v) => {
                out.push(0x01);
                v.canonical_encode(out);
            }
        }
    }
}

impl<T: CanonicalDecode> CanonicalDecode for Option<T> {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (tag, rest) = read_exact(input, 1)?;
        match tag[0] {
            0x00 => Ok((None, rest)),
            0x01 => {
                let (value, rest) = T::canonical_decode(rest)?;
                Ok((Some(value), rest))
            }
            _ => Err(XlnError::CanonicalEncodingMismatch { reason: "option tag byte was neither 0x00 nor 0x01" }),
        }
    }
}

impl<T: CanonicalEncode> CanonicalEncode for Vec<T> {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        write_len(out, self.len());
        for item in self {
            item.canonical_encode(out);
        }
    }
}

impl<T: CanonicalDecode> CanonicalDecode for Vec<T> {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (len, mut rest) = read_len(input)?;
        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            let (item, next) = T::canonical_decode(rest)?;
            items.push(item);
            rest = next;
        }
        Ok((items, rest))
    }
}

impl<T: CanonicalEncode> CanonicalEncode for [T] {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        write_len(out, self.len());
        for item in self {
            item.canonical_encode(out);
        }
    }
}

/// A key usable in a canonical mapping must produce the same byte string
/// used to order it: `BTreeMap::iter()` already yields entries in `K::Ord`
/// order, so as long as a key's `Ord` impl agrees with its canonical byte
/// encoding (true for every id type in `xln-base` — see its module docs),
/// iterating the map in-order and encoding each key/value pair satisfies
/// "sorted by key bytes ascending" with no extra sort pass.
impl<K: CanonicalEncode + Ord, V: CanonicalEncode> CanonicalEncode for BTreeMap<K, V> {
    fn canonical_encode(&self, out: &mut Vec<u8>) {
        write_len(out, self.len());
        for (k, v) in self.iter() {
            k.canonical_encode(out);
            v.canonical_encode(out);
        }
    }
}

/// Entries arrive already key-sorted (the encode side relies on the same
/// fact), so rebuilding the map by plain insertion reproduces it exactly
/// without a post-hoc sort.
impl<K: CanonicalDecode + Ord, V: CanonicalDecode> CanonicalDecode for BTreeMap<K, V> {
    fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
        let (len, mut rest) = read_len(input)?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let (key, next) = K::canonical_decode(rest)?;
            let (value, next) = V::canonical_decode(next)?;
            map.insert(key, value);
            rest = next;
        }
        Ok((map, rest))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(PartialEq, Debug)]
    struct Pair(u64, bool);
    impl CanonicalEncode for Pair {
        fn canonical_encode(&self, out: &mut Vec<u8>) {
            self.0.canonical_encode(out);
            self.1.canonical_encode(out);
        }
    }
    impl CanonicalDecode for Pair {
        fn canonical_decode(input: &[u8]) -> Result<(Self, &[u8]), XlnError> {
            let (a, rest) = u64::canonical_decode(input)?;
            let (b, rest) = bool::canonical_decode(rest)?;
            Ok((Pair(a, b), rest))
        }
    }

    #[test]
    fn struct_encoding_is_field_concatenation() {
        let p = Pair(7, true);
        let bytes = encode(&p);
        assert_eq!(bytes.len(), 9);
        assert_eq!(&bytes[..8], &7u64.to_be_bytes());
        assert_eq!(bytes[8], 0x01);
    }

    #[test]
    fn struct_decode_is_the_inverse_of_encode() {
        let p = Pair(7, true);
        let bytes = encode(&p);
        let back: Pair = decode(&bytes).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn hash_is_deterministic_and_sensitive_to_content() {
        let a = Pair(1, false);
        let b = Pair(1, false);
        let c = Pair(2, false);
        assert_eq!(hash(&a), hash(&b));
        assert_ne!(hash(&a), hash(&c));
    }

    #[test]
    fn maps_encode_in_key_order_regardless_of_insertion_order() {
        let mut m1 = BTreeMap::new();
        m1.insert(2u64, "b".to_string());
        m1.insert(1u64, "a".to_string());
        let mut m2 = BTreeMap::new();
        m2.insert(1u64, "a".to_string());
        m2.insert(2u64, "b".to_string());
        assert_eq!(encode(&m1), encode(&m2));
    }

    #[test]
    fn amount_encoding_round_trips_via_signed_bytes() {
        let a = Amount::from(-42i64);
        let bytes = encode(&a);
        // 8-byte length prefix + the minimal two's-complement body.
        let len = u64::from_be_bytes(bytes[..8].try_into().unwrap()) as usize;
        let body = &bytes[8..8 + len];
        let back = num_bigint::BigInt::from_signed_bytes_be(body);
        assert_eq!(back, num_bigint::BigInt::from(-42));
    }

    #[test]
    fn channel_key_encodes_left_then_right() {
        let a = xln_base::EntityId::numbered(1);
        let b = xln_base::EntityId::numbered(2);
        let key = ChannelKey::new(a, b);
        let bytes = encode(&key);
        assert_eq!(&bytes[..32], key.left.as_bytes());
        assert_eq!(&bytes[32..], key.right.as_bytes());
    }

    #[test]
    fn option_none_and_some_are_distinguishable() {
        let none: Option<u64> = None;
        let some: Option<u64> = Some(0);
        assert_ne!(encode(&none), encode(&some));
    }

    #[test]
    fn amount_round_trips_including_negative_and_zero() {
        for value in [Amount::from(-42i64), Amount::from(0i64), Amount::from(i64::MAX)] {
            let bytes = encode(&value);
            let back: Amount = decode(&bytes).unwrap();
            assert_eq!(value, back);
        }
    }

    #[test]
    fn string_round_trips() {
        let s = "xln".to_string();
        let bytes = encode(&s);
        let back: String = decode(&bytes).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn entity_id_and_channel_key_round_trip() {
        let a = xln_base::EntityId::numbered(1);
        let b = xln_base::EntityId::numbered(2);
        let key = ChannelKey::new(a, b);
        let bytes = encode(&key);
        let back: ChannelKey = decode(&bytes).unwrap();
        assert_eq!(key, back);
    }

    #[test]
    fn delta_round_trips() {
        let delta = Delta {
            offdelta: Amount::from(5i64),
            collateral: Amount::from(100i64),
            ondelta: Amount::from(-3i64),
            left_credit_limit: Amount::from(10i64),
            right_credit_limit: Amount::from(20i64),
        };
        let bytes = encode(&delta);
        let back: Delta = decode(&bytes).unwrap();
        assert_eq!(delta, back);
    }

    #[test]
    fn option_and_vec_and_map_round_trip() {
        let none: Option<u64> = None;
        assert_eq!(none, decode(&encode(&none)).unwrap());
        let some: Option<u64> = Some(7);
        assert_eq!(some, decode(&encode(&some)).unwrap());

        let v: Vec<u64> = vec![1, 2, 3];
        assert_eq!(v, decode::<Vec<u64>>(&encode(&v)).unwrap());

        let mut m: BTreeMap<u64, String> = BTreeMap::new();
        m.insert(2, "b".to_string());
        m.insert(1, "a".to_string());
        assert_eq!(m, decode::<BTreeMap<u64, String>>(&encode(&m)).unwrap());
    }

    #[test]
    fn decode_rejects_truncated_buffer() {
        let bytes = encode(&42u64);
        let err = decode::<u64>(&bytes[..4]).unwrap_err();
        assert!(matches!(err, XlnError::CanonicalEncodingMismatch { .. }));
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = encode(&42u64);
        bytes.push(0xff);
        let err = decode::<u64>(&bytes).unwrap_err();
        assert!(matches!(err, XlnError::CanonicalEncodingMismatch { .. }));
    }

    #[test]
    fn decode_rejects_invalid_bool_byte() {
        let err = decode::<bool>(&[0x02]).unwrap_err();
        assert!(matches!(err, XlnError::CanonicalEncodingMismatch { .. }));
    }
}
