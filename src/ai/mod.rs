mod summarizer;

pub use summarizer::{Summarizer, MAX_INPUT_CHARS, MAX_SUMMARY_LENGTH, MIN_SUMMARY_LENGTH};
