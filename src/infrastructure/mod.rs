pub mod bluetooth;
pub mod export;
pub mod location;
pub mod logging;
pub mod storage;
