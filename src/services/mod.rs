pub mod key_service;
pub mod storage_service;
