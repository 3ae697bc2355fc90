pub mod dispatcher;
pub mod storage;
