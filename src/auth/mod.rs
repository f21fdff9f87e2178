pub(crate) mod extractors;
pub mod jwt;
pub mod password;
pub mod reset;
