#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Case type classification pipeline.
//!
//! Predicts a case's `tipo_do_caso` from victim age, ethnicity, and
//! location. The pipeline one-hot encodes the categorical columns, passes
//! age through unscaled, and feeds a random forest of CART trees. A
//! [`ModelBundle`] packages the fitted pipeline with the [`LabelCodec`] it
//! was trained against so that class codes can never desynchronize from the
//! classifier's output indices.

pub mod artifact;
pub mod codec;
pub mod encoder;
pub mod forest;
pub mod pipeline;
pub mod training;

pub use artifact::ModelBundle;
pub use codec::{CodecError, LabelCodec};
pub use forest::ForestConfig;
pub use pipeline::Pipeline;
pub use training::{MIN_TRAINING_ROWS, train};

use thiserror::Error;

/// Errors produced by the classification pipeline.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// A label or code is not part of the fitted vocabulary.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Too few rows to fit a meaningful model.
    #[error("Insufficient data: {rows} row(s), at least {required} required")]
    InsufficientData {
        /// Rows available.
        rows: usize,
        /// Minimum rows required.
        required: usize,
    },

    /// Every training row has the same label, so there is nothing to separate.
    #[error("Insufficient data: every row is labelled '{class}', at least 2 classes required")]
    SingleClass {
        /// The only label present.
        class: String,
    },

    /// Reading or writing the artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the artifact failed.
    #[error("Artifact encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Deserializing the artifact failed.
    #[error("Artifact decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// The artifact decoded but is internally inconsistent.
    #[error("Corrupt model artifact: {message}")]
    Corrupt {
        /// Description of the inconsistency.
        message: String,
    },
}
