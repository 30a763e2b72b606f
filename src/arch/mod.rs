//! Architecture support
//!
//! Only x86-64 is supported. The register-level logic is target
//! independent so it can be exercised on any host; the instructions that
//! touch real hardware are compiled for x86-64 only.

pub mod x86_64;
