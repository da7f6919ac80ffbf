pub mod agent;
pub mod booking;
pub mod money;
pub mod otp;
pub mod package;
pub mod payment;
pub mod ports;
pub mod pricing;
pub mod wallet;
