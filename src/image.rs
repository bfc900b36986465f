//! On-disk program images: `[entry, word0, word1, ...]` as little-endian u32s.

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("image length {0} is not a multiple of 4 bytes")]
pub struct ImageError(pub usize);

pub fn to_bytes(program: &[u32]) -> Vec<u8> {
    program.iter().flat_map(|w| w.to_le_bytes()).collect()
}

pub fn from_bytes(bytes: &[u8]) -> Result<Vec<u32>, ImageError> {
    if bytes.len() % 4 != 0 {
        return Err(ImageError(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_little_endian() {
        assert_eq!(to_bytes(&[0x0102_0304]), vec![4, 3, 2, 1]);
        assert_eq!(from_bytes(&[4, 3, 2, 1, 0, 0, 0, 0x0C]).unwrap(), vec![0x0102_0304, 0x0C00_0000]);
    }

    #[test]
    fn truncated_image_is_rejected() {
        assert_eq!(from_bytes(&[1, 2, 3]), Err(ImageError(3)));
    }
}
