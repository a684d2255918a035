pub mod baselines;
pub mod collection;
pub mod constants;
pub mod context;
pub mod conversion;
pub mod coordinates;
pub mod dsp;
pub mod file_format;
pub mod models;
pub mod nodes;
pub mod openvlbi;
pub mod stream;
pub mod synthesis;
pub mod time;
pub mod vlbi_errors;
