//! External service clients

pub mod classifier;

pub use classifier::{
    ClassifierError, ContentClassifier, HttpClassifier, StaticClassifier, UnavailableClassifier,
};
