//! Integration tests for the AR core live in `tests/`.
