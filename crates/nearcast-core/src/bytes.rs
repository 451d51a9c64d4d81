//! Fixed-width byte-array helpers used for identifier and key comparisons.

use crate::error::CoreError;

/// Result of comparing two equal-width byte arrays as big-endian integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrdering {
    Equal,
    AGreater,
    BGreater,
}

/// Compares two byte arrays most-significant byte first.
///
/// Returns at the first differing byte. Arrays of different widths are not
/// comparable.
pub fn compare(a: &[u8], b: &[u8]) -> Result<KeyOrdering, CoreError> {
    if a.len() != b.len() {
        return Err(CoreError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    for (x, y) in a.iter().zip(b) {
        if x == y {
            continue;
        }
        return Ok(if x > y {
            KeyOrdering::AGreater
        } else {
            KeyOrdering::BGreater
        });
    }
    Ok(KeyOrdering::Equal)
}

/// Infallible [`compare`] for arrays whose width is fixed by the type.
pub fn compare_arrays<const N: usize>(a: &[u8; N], b: &[u8; N]) -> KeyOrdering {
    match a.iter().zip(b).find(|(x, y)| x != y) {
        None => KeyOrdering::Equal,
        Some((x, y)) if x > y => KeyOrdering::AGreater,
        Some(_) => KeyOrdering::BGreater,
    }
}

/// Byte-wise XOR of two equal-width arrays.
pub fn xor(a: &[u8], b: &[u8]) -> Result<Vec<u8>, CoreError> {
    if a.len() != b.len() {
        return Err(CoreError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| x ^ y).collect())
}

/// Infallible [`xor`] for arrays whose width is fixed by the type.
pub fn xor_arrays<const N: usize>(a: &[u8; N], b: &[u8; N]) -> [u8; N] {
    let mut out = [0_u8; N];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b)) {
        *o = x ^ y;
    }
    out
}

/// Renders bytes as `0x`-prefixed lowercase hex.
pub fn to_hex_string(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Renders bytes as a string of `0`/`1`, eight characters per byte, MSB first.
pub fn to_binary_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 8);
    for b in bytes {
        out.push_str(&format!("{b:08b}"));
    }
    out
}

/// Like [`to_binary_string`] with a space between every 4-bit group.
pub fn to_grouped_binary_string(bytes: &[u8]) -> String {
    let bits = to_binary_string(bytes);
    let mut out = String::with_capacity(bits.len() + bits.len() / 4);
    for (i, c) in bits.chars().enumerate() {
        if i != 0 && i % 4 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    use super::{
        compare, compare_arrays, to_binary_string, to_grouped_binary_string, to_hex_string, xor,
        xor_arrays, KeyOrdering,
    };
    use crate::error::CoreError;

    #[test]
    fn compare_reports_first_difference_big_endian() {
        let a = [0x01, 0x00, 0xFF];
        let b = [0x00, 0xFF, 0xFF];
        assert_eq!(compare(&a, &b), Ok(KeyOrdering::AGreater));
        assert_eq!(compare(&b, &a), Ok(KeyOrdering::BGreater));
        assert_eq!(compare(&a, &a), Ok(KeyOrdering::Equal));
    }

    #[test]
    fn compare_rejects_unequal_widths() {
        assert_eq!(
            compare(&[1, 2], &[1, 2, 3]),
            Err(CoreError::LengthMismatch { left: 2, right: 3 })
        );
    }

    #[test]
    fn compare_is_reflexive_and_antisymmetric_on_random_arrays() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        for _ in 0..256 {
            let mut a = [0_u8; 12];
            let mut b = [0_u8; 12];
            rng.fill_bytes(&mut a);
            rng.fill_bytes(&mut b);
            assert_eq!(compare_arrays(&a, &a), KeyOrdering::Equal);
            let ab = compare_arrays(&a, &b);
            let ba = compare_arrays(&b, &a);
            match ab {
                KeyOrdering::AGreater => assert_eq!(ba, KeyOrdering::BGreater),
                KeyOrdering::BGreater => assert_eq!(ba, KeyOrdering::AGreater),
                KeyOrdering::Equal => assert_eq!(ba, KeyOrdering::Equal),
            }
            assert_eq!(compare(&a, &b), Ok(ab));
        }
    }

    #[test]
    fn single_byte_difference_matches_integer_ordering() {
        for (x, y) in [(0x00_u8, 0x01_u8), (0x7F, 0x80), (0xFE, 0xFF), (0x10, 0x10)] {
            let mut a = [0x42_u8; 20];
            let mut b = [0x42_u8; 20];
            a[7] = x;
            b[7] = y;
            let expected = match x.cmp(&y) {
                std::cmp::Ordering::Equal => KeyOrdering::Equal,
                std::cmp::Ordering::Greater => KeyOrdering::AGreater,
                std::cmp::Ordering::Less => KeyOrdering::BGreater,
            };
            assert_eq!(compare_arrays(&a, &b), expected);
        }
    }

    #[test]
    fn xor_is_self_inverse() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..64 {
            let mut a = [0_u8; 20];
            let mut b = [0_u8; 20];
            rng.fill_bytes(&mut a);
            rng.fill_bytes(&mut b);
            let once = xor(&a, &b).expect("equal widths");
            let twice = xor(&once, &b).expect("equal widths");
            assert_eq!(twice, a.to_vec());
            assert_eq!(xor_arrays(&xor_arrays(&a, &b), &b), a);
        }
    }

    #[test]
    fn xor_rejects_unequal_widths() {
        assert_eq!(
            xor(&[1], &[1, 2]),
            Err(CoreError::LengthMismatch { left: 1, right: 2 })
        );
    }

    #[test]
    fn formatting_helpers_render_expected_text() {
        assert_eq!(to_hex_string(&[0x0A, 0xFF]), "0x0aff");
        assert_eq!(to_binary_string(&[0xA5]), "10100101");
        assert_eq!(to_grouped_binary_string(&[0xA5, 0x0F]), "1010 0101 0000 1111");
        assert_eq!(to_grouped_binary_string(&[]), "");
    }
}
