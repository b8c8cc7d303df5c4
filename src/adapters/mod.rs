// Adapters: concrete implementations of the domain ports (AWS services, local files).

pub mod aws;
pub mod storage;
