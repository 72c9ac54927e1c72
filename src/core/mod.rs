//! Libraries, archives and the operations that move games between them.
//!
//! Nothing here touches the OS directly for anything platform-specific; that
//! goes through the facades in [`crate::host`].

pub mod archive;
pub mod discovery;
pub mod library;
pub mod manifest;
pub mod transfer;
