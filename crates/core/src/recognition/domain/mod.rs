pub mod embedding_matcher;
pub mod face_embedding;
pub mod face_encoder;
