pub mod dict;
pub mod ziplist;
