#![forbid(unsafe_code)]

pub mod error;
pub mod lzf;
pub mod pcd;

pub use error::PcdError;
pub use pcd::{read_pcd, read_pcd_from, write_pcd, write_pcd_binary, write_pcd_to, DataEncoding};
