//! Embedding BLOB conversion.
//!
//! Embeddings are persisted as raw little-endian `f32` bytes. The dimension is not
//! fixed here; the store enforces it.

use super::Error;

pub type Result<T> = std::result::Result<T, Error>;

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Convert a vector of f32 embedding values to a BLOB (little-endian bytes).
///
/// # Errors
///
/// - Returns `Error::EmptyVector` if the vector is empty.
/// - Returns `Error::InvalidEmbedding` if any value is NaN or infinite.
pub fn vec_to_blob(vec: &[f32]) -> Result<Vec<u8>> {
    if vec.is_empty() {
        return Err(Error::EmptyVector);
    }
    if vec.iter().any(|x| !x.is_finite()) {
        return Err(Error::InvalidEmbedding(
            "Vector contains NaN or infinite values".to_string(),
        ));
    }
    Ok(vec.iter().flat_map(|&x| x.to_le_bytes()).collect())
}

/// Convert a BLOB (little-endian bytes) to a vector of f32 embedding values.
///
/// # Errors
///
/// - Returns `Error::InvalidBlobSize` if the blob is empty or not a whole number of f32s.
/// - Returns `Error::InvalidEmbedding` if any decoded value is NaN or infinite.
pub fn blob_to_vec(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.is_empty() || blob.len() % F32_BYTES != 0 {
        return Err(Error::InvalidBlobSize { actual: blob.len() });
    }
    let vec: Vec<f32> = blob
        .chunks_exact(F32_BYTES)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    if vec.iter().any(|x| !x.is_finite()) {
        return Err(Error::InvalidEmbedding(
            "BLOB decodes to NaN or infinite values".to_string(),
        ));
    }
    Ok(vec)
}
