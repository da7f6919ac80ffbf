pub mod capture;
pub mod webhook;
