pub mod filters;
pub mod stats;
pub mod wavelet;
