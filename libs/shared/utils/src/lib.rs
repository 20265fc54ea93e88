pub mod extractor;
pub mod jwt;
pub mod permissions;
pub mod test_utils;
