mod checkout;
mod client;
mod ip_allowlist;
mod itn;

pub use checkout::{CheckoutForm, CheckoutItem, CheckoutRequest, PayFastCheckout};
pub use client::PayFastClient;
pub use ip_allowlist::{client_ip, parse_network, IpAllowList};
pub use itn::ItnReconciler;
