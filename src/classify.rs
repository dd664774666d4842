//! Sentiment classification of output embeddings.
//!
//! An embedding is compared by cosine similarity against a positive and a
//! negative reference embedding; the closer one wins and a tie is neutral.

use std::fmt;

use crate::error::ClassifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => f.write_str("Positive"),
            Sentiment::Negative => f.write_str("Negative"),
            Sentiment::Neutral => f.write_str("Neutral"),
        }
    }
}

/// Verdict plus the similarities it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub positive: f64,
    pub negative: f64,
}

/// Cosine similarity of two equal-width vectors. Zero if either has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, ClassifyError> {
    if a.len() != b.len() {
        return Err(ClassifyError::DimensionMismatch {
            expected: b.len(),
            actual: a.len(),
        });
    }
    let (mut dot, mut a_mag, mut b_mag) = (0f64, 0f64, 0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        a_mag += x * x;
        b_mag += y * y;
    }
    if a_mag == 0.0 || b_mag == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (a_mag.sqrt() * b_mag.sqrt()))
}

/// Decode little-endian f32 output bytes.
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, ClassifyError> {
    if bytes.len() % 4 != 0 {
        return Err(ClassifyError::UnalignedEmbedding { len: bytes.len() });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[derive(Debug, Clone)]
pub struct SentimentClassifier {
    positive: Vec<f32>,
    negative: Vec<f32>,
}

impl SentimentClassifier {
    pub fn new(positive: Vec<f32>, negative: Vec<f32>) -> Result<Self, ClassifyError> {
        if positive.is_empty() || positive.len() != negative.len() {
            return Err(ClassifyError::InvalidReferences);
        }
        Ok(Self { positive, negative })
    }

    /// Width every classified embedding must have.
    pub fn dimensions(&self) -> usize {
        self.positive.len()
    }

    pub fn classify(&self, embedding: &[f32]) -> Result<Classification, ClassifyError> {
        let positive = cosine_similarity(embedding, &self.positive)?;
        let negative = cosine_similarity(embedding, &self.negative)?;
        let sentiment = if positive > negative {
            Sentiment::Positive
        } else if negative > positive {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        };
        Ok(Classification {
            sentiment,
            positive,
            negative,
        })
    }

    /// Classify raw inference output.
    pub fn classify_bytes(&self, output: &[u8]) -> Result<Classification, ClassifyError> {
        self.classify(&decode_embedding(output)?)
    }
}
