use std::sync::Arc;

/// Fixed-length face descriptor; Euclidean distance approximates
/// dissimilarity between the faces two embeddings were computed from.
///
/// Immutable once produced. Cloning shares the underlying buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceEmbedding {
    values: Arc<[f32]>,
}

impl FaceEmbedding {
    /// Returns `None` for an empty vector; a zero-length embedding cannot
    /// be compared against anything.
    pub fn new(values: Vec<f32>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            values: values.into(),
        })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The single embedding a session grants access to.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorizedIdentity {
    embedding: FaceEmbedding,
}

impl AuthorizedIdentity {
    pub fn new(embedding: FaceEmbedding) -> Self {
        Self { embedding }
    }

    pub fn embedding(&self) -> &FaceEmbedding {
        &self.embedding
    }

    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_vector_rejected() {
        assert!(FaceEmbedding::new(Vec::new()).is_none());
    }

    #[test]
    fn test_values_preserved_in_order() {
        let e = FaceEmbedding::new(vec![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(e.as_slice(), &[0.1, 0.2, 0.3]);
        assert_eq!(e.len(), 3);
        assert!(!e.is_empty());
    }

    #[test]
    fn test_clone_shares_buffer() {
        let e = FaceEmbedding::new(vec![1.0; 128]).unwrap();
        let cloned = e.clone();
        assert!(Arc::ptr_eq(&e.values, &cloned.values));
    }

    #[test]
    fn test_identity_dimension() {
        let identity = AuthorizedIdentity::new(FaceEmbedding::new(vec![0.0; 512]).unwrap());
        assert_eq!(identity.dimension(), 512);
    }
}
