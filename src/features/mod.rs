mod mel;
mod mfcc;
pub(crate) mod stft;

pub use mfcc::{effective_window, extract_mfcc, MfccParams, MIN_WINDOW_LENGTH};
