pub mod checkout;
pub mod draft;
pub mod health;
pub mod location;
pub mod voucher;
