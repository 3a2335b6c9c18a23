//! Workspace root crate; all functionality lives in `crates/*`.
