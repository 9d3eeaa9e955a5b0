pub mod cat;
pub mod exchange_key;
pub mod init;
pub mod ls;
pub mod mkdir;
pub mod recover;
pub mod rm;
pub mod share;
pub mod version;
pub mod write;

pub use cat::Cat;
pub use exchange_key::ExchangeKey;
pub use init::Init;
pub use ls::Ls;
pub use mkdir::Mkdir;
pub use recover::Recover;
pub use rm::Rm;
pub use share::Share;
pub use version::Version;
pub use write::Write;

/// Split a `/`-separated vault path into segments, ignoring empty ones
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
