//! Response envelopes shared by the JSON endpoints

pub mod response;

pub use response::ApiResponse;
