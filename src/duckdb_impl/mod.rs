//! Glue between the pipeline and DuckDB's C API: string decoding, scalar
//! invoke helpers and named-parameter access.

pub(crate) mod bind_info_ffi;
pub(crate) mod params;
pub(crate) mod scalar;
pub(crate) mod string;
