//! Integration test crate for CertSeal. All content lives in `tests/`.
