pub mod booking_flow;
pub mod checkout_service;
pub mod currency_service;
pub mod distance_service;
pub mod handoff_service;
pub mod payment;
pub mod pricing_service;
pub mod rate_service;
pub mod stripe;
pub mod voucher_service;
