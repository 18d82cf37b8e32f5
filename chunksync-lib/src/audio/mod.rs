//! Audio buffers, the output-backend contract, and concrete backends.

pub mod buffer;
pub mod decode;
pub mod offline;
pub mod output;
pub mod rodio_output;
