//! # Signal processing collaborator
//!
//! Buffer-level numerics used around the synthesis engine: statistics and index mapping
//! ([`buffer`]), Fourier transforms backed by `rustfft` ([`fourier`]), frequency-domain
//! filters applied to node streams ([`filters`]) and kernel convolution of models
//! ([`convolution`]).
//!
//! Every function works on plain slices plus a shape, first axis varying fastest, so that
//! the same code serves 1-D station recordings and 2-D UV-plane images.

pub mod buffer;
pub mod convolution;
pub mod filters;
pub mod fourier;
