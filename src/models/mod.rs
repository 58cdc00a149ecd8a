pub mod bookings;
pub mod draft;
pub mod location;
pub mod money;
pub mod voucher;
