//! End-to-end tests for the vraw crates.
//!
//! These exercise writer, reader, container, codec and PSNR together
//! through real files.
