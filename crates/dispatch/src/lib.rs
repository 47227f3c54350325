pub mod gateway;
pub mod processor;
pub mod worker;
