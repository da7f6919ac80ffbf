pub mod checkout;
pub mod otp;
pub mod settlement;
pub mod wallet;
