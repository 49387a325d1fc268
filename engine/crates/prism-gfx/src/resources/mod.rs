pub mod desc;
pub mod handles;
