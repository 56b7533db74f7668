//! Crate-level behaviour tests and their shared support module.

pub(crate) mod support;
