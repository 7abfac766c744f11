//! RAOP service advertisement.
//!
//! A receiver doesn't browse for other `AirPlay` devices; it only
//! advertises itself over mDNS so senders can find it.

pub mod advertiser;
pub mod raop;

#[cfg(test)]
mod advertiser_tests;

pub use advertiser::{
    AdvertiserConfig, AdvertiserError, AsyncRaopAdvertiser, RaopCapabilities, get_device_mac,
};
pub use raop::{RAOP_SERVICE_TYPE, format_mac_address, parse_raop_service_name};
