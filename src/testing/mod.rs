//! Test doubles for exercising the receiver without real hardware or a real
//! `AirPlay` sender.

pub mod mock_sender;
pub mod network_sim;

pub use mock_sender::{MockCodec, MockSender, MockSenderConfig};
pub use network_sim::NetworkSimulator;
