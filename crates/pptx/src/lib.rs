//! PPTX (Office Open XML) backend for clickable mind-map decks.
//!
//! Writes single-slide .pptx packages and reads their shapes back.

pub mod package;
pub mod reader;
pub mod writer;

pub use reader::{DeckReader, ShapeKind, ShapeSummary, SlideShapes};
pub use writer::DeckBuilder;
