pub mod adapter;
pub mod frame;
pub mod rest;

pub use adapter::HuobiAdapter;
