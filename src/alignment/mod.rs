pub mod dtw;
pub mod report;
pub mod scoring;
pub mod segmentation;
pub mod stretch;
