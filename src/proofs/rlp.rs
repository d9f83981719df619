use thiserror::Error;

/// Errors produced while decoding RLP data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RlpError {
    /// The input violates canonical RLP form (truncated prefix, padded
    /// length, non-minimal encoding, or trailing bytes).
    #[error("malformed RLP encoding: {0}")]
    MalformedEncoding(&'static str),
}

/// A recursive RLP value: either a byte string or an ordered list of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Bytes(Vec<u8>),
    List(Vec<Item>),
}

impl Item {
    /// Borrow the byte-string payload, or fail for lists.
    pub fn as_bytes(&self) -> Result<&[u8], RlpError> {
        match self {
            Item::Bytes(b) => Ok(b),
            Item::List(_) => Err(RlpError::MalformedEncoding("expected byte string, got list")),
        }
    }

    /// Borrow the list elements, or fail for byte strings.
    pub fn as_list(&self) -> Result<&[Item], RlpError> {
        match self {
            Item::List(items) => Ok(items),
            Item::Bytes(_) => Err(RlpError::MalformedEncoding("expected list, got byte string")),
        }
    }
}

/// Encode a value into its canonical RLP byte representation.
pub fn encode(item: &Item) -> Vec<u8> {
    match item {
        Item::Bytes(bytes) => {
            if bytes.len() == 1 && bytes[0] < 0x80 {
                bytes.clone()
            } else {
                let mut out = length_prefix(bytes.len(), 0x80);
                out.extend_from_slice(bytes);
                out
            }
        }
        Item::List(items) => {
            let mut payload = Vec::new();
            for it in items {
                payload.extend_from_slice(&encode(it));
            }
            let mut out = length_prefix(payload.len(), 0xc0);
            out.extend_from_slice(&payload);
            out
        }
    }
}

/// Encode an unsigned integer as a minimal big-endian RLP byte string.
/// Zero encodes as the empty string (`0x80`), matching how transaction
/// indices key the receipts trie.
pub fn encode_u64(value: u64) -> Vec<u8> {
    encode(&Item::Bytes(u64_to_minimal_be(value)))
}

/// Minimal big-endian representation of an integer (empty for zero).
pub fn u64_to_minimal_be(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

/// Decode a canonical RLP encoding into a value.
///
/// This is the exact left inverse of [`encode`]: any deviation from
/// canonical form (padded lengths, a single byte < 0x80 wrapped in a
/// prefix, bytes past the declared end) is rejected rather than
/// normalized.
pub fn decode(input: &[u8]) -> Result<Item, RlpError> {
    let (item, consumed) = decode_at(input)?;
    if consumed != input.len() {
        return Err(RlpError::MalformedEncoding("trailing bytes after item"));
    }
    Ok(item)
}

/// Decode the item starting at the beginning of `input`, returning it and
/// the number of bytes consumed.
pub fn decode_at(input: &[u8]) -> Result<(Item, usize), RlpError> {
    let first = *input
        .first()
        .ok_or(RlpError::MalformedEncoding("empty input"))?;

    match first {
        0x00..=0x7f => Ok((Item::Bytes(vec![first]), 1)),
        0x80..=0xb7 => {
            let len = (first - 0x80) as usize;
            let payload = slice_payload(input, 1, len)?;
            if len == 1 && payload[0] < 0x80 {
                return Err(RlpError::MalformedEncoding("non-minimal single byte"));
            }
            Ok((Item::Bytes(payload.to_vec()), 1 + len))
        }
        0xb8..=0xbf => {
            let len_of_len = (first - 0xb7) as usize;
            let len = decode_length(input, len_of_len)?;
            let payload = slice_payload(input, 1 + len_of_len, len)?;
            Ok((Item::Bytes(payload.to_vec()), 1 + len_of_len + len))
        }
        0xc0..=0xf7 => {
            let len = (first - 0xc0) as usize;
            let payload = slice_payload(input, 1, len)?;
            Ok((Item::List(decode_list_payload(payload)?), 1 + len))
        }
        0xf8..=0xff => {
            let len_of_len = (first - 0xf7) as usize;
            let len = decode_length(input, len_of_len)?;
            let payload = slice_payload(input, 1 + len_of_len, len)?;
            Ok((
                Item::List(decode_list_payload(payload)?),
                1 + len_of_len + len,
            ))
        }
    }
}

// --- Helper Functions ---

fn length_prefix(len: usize, base: u8) -> Vec<u8> {
    if len <= 55 {
        vec![base + len as u8]
    } else {
        let len_bytes = u64_to_minimal_be(len as u64);
        let mut out = vec![base + 55 + len_bytes.len() as u8];
        out.extend_from_slice(&len_bytes);
        out
    }
}

fn decode_length(input: &[u8], len_of_len: usize) -> Result<usize, RlpError> {
    let bytes = input
        .get(1..1 + len_of_len)
        .ok_or(RlpError::MalformedEncoding("truncated length field"))?;
    if bytes[0] == 0 {
        return Err(RlpError::MalformedEncoding("length has leading zero"));
    }
    if len_of_len > std::mem::size_of::<usize>() {
        return Err(RlpError::MalformedEncoding("length field too wide"));
    }
    let mut len = 0usize;
    for b in bytes {
        len = (len << 8) | *b as usize;
    }
    // Long form is only canonical for payloads that do not fit the short form.
    if len <= 55 {
        return Err(RlpError::MalformedEncoding("non-minimal length form"));
    }
    Ok(len)
}

fn slice_payload(input: &[u8], start: usize, len: usize) -> Result<&[u8], RlpError> {
    input
        .get(start..start + len)
        .ok_or(RlpError::MalformedEncoding("truncated payload"))
}

fn decode_list_payload(payload: &[u8]) -> Result<Vec<Item>, RlpError> {
    let mut items = Vec::new();
    let mut pos = 0;
    while pos < payload.len() {
        let (item, consumed) = decode_at(&payload[pos..])?;
        items.push(item);
        pos += consumed;
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(b: &[u8]) -> Item {
        Item::Bytes(b.to_vec())
    }

    #[test]
    fn encodes_known_vectors() {
        assert_eq!(encode(&bytes(b"")), vec![0x80]);
        assert_eq!(encode(&bytes(&[0x05])), vec![0x05]);
        assert_eq!(encode(&bytes(b"dog")), vec![0x83, b'd', b'o', b'g']);
        assert_eq!(encode(&Item::List(vec![])), vec![0xc0]);
        assert_eq!(
            encode(&Item::List(vec![bytes(b"cat"), bytes(b"dog")])),
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
        // 56-byte string takes the long form.
        let long = vec![0xaa; 56];
        let enc = encode(&bytes(&long));
        assert_eq!(enc[0], 0xb8);
        assert_eq!(enc[1], 56);
        assert_eq!(&enc[2..], long.as_slice());
    }

    #[test]
    fn round_trips_nested_values() {
        let value = Item::List(vec![
            bytes(&[0x01]),
            Item::List(vec![bytes(b""), bytes(&[0x80, 0x81])]),
            bytes(&vec![0x7f; 60]),
        ]);
        let enc = encode(&value);
        assert_eq!(decode(&enc).unwrap(), value);
    }

    #[test]
    fn reencoding_decoded_input_is_identity() {
        let inputs: Vec<Vec<u8>> = vec![
            vec![0x80],
            vec![0x05],
            vec![0x83, b'd', b'o', b'g'],
            encode(&Item::List(vec![bytes(&[0x01]), bytes(&vec![0x22; 70])])),
        ];
        for input in inputs {
            let decoded = decode(&input).unwrap();
            assert_eq!(encode(&decoded), input);
        }
    }

    #[test]
    fn rejects_non_minimal_single_byte() {
        // 0x05 must encode as itself, not as 0x81 0x05.
        assert_eq!(
            decode(&[0x81, 0x05]),
            Err(RlpError::MalformedEncoding("non-minimal single byte"))
        );
        // 0x80 is the boundary: 0x81 0x80 is canonical.
        assert_eq!(decode(&[0x81, 0x80]).unwrap(), bytes(&[0x80]));
    }

    #[test]
    fn rejects_padded_and_short_long_form_lengths() {
        // Leading zero in the length field.
        let mut enc = vec![0xb9, 0x00, 0x38];
        enc.extend_from_slice(&[0x00; 56]);
        assert_eq!(
            decode(&enc),
            Err(RlpError::MalformedEncoding("length has leading zero"))
        );
        // Long form used for a length that fits the short form.
        let mut enc = vec![0xb8, 0x03];
        enc.extend_from_slice(b"dog");
        assert_eq!(
            decode(&enc),
            Err(RlpError::MalformedEncoding("non-minimal length form"))
        );
    }

    #[test]
    fn rejects_truncation_and_trailing_bytes() {
        assert!(decode(&[0x83, b'd', b'o']).is_err());
        assert!(decode(&[0xb8]).is_err());
        assert_eq!(
            decode(&[0x05, 0x06]),
            Err(RlpError::MalformedEncoding("trailing bytes after item"))
        );
    }

    #[test]
    fn integer_keys_are_minimal() {
        assert_eq!(encode_u64(0), vec![0x80]);
        assert_eq!(encode_u64(1), vec![0x01]);
        assert_eq!(encode_u64(127), vec![0x7f]);
        assert_eq!(encode_u64(128), vec![0x81, 0x80]);
        assert_eq!(encode_u64(256), vec![0x82, 0x01, 0x00]);
    }
}
