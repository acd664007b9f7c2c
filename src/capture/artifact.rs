//! The finalized audio payload produced by a capture session.

/// Immutable audio blob with its declared media type.
///
/// The encoding is opaque to everything downstream; the only property ever
/// inspected is non-emptiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    bytes: Vec<u8>,
    media_type: String,
}

impl AudioArtifact {
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }

    /// Assemble an artifact by concatenating the chunk sequence a capture
    /// stream produced, in order.
    pub fn from_chunks(chunks: Vec<Vec<u8>>, media_type: impl Into<String>) -> Self {
        let mut bytes = Vec::with_capacity(chunks.iter().map(Vec::len).sum());
        for chunk in chunks {
            bytes.extend_from_slice(&chunk);
        }
        Self::new(bytes, media_type)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_chunks_concatenates_in_order() {
        let artifact = AudioArtifact::from_chunks(
            vec![vec![1, 2], vec![], vec![3, 4, 5]],
            "audio/wav",
        );
        assert_eq!(artifact.bytes(), &[1, 2, 3, 4, 5]);
        assert_eq!(artifact.media_type(), "audio/wav");
        assert_eq!(artifact.len(), 5);
    }

    #[test]
    fn test_empty_chunks_yield_empty_artifact() {
        let artifact = AudioArtifact::from_chunks(vec![], "audio/wav");
        assert!(artifact.is_empty());

        let artifact = AudioArtifact::from_chunks(vec![vec![], vec![]], "audio/wav");
        assert!(artifact.is_empty());
    }
}
