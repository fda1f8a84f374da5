pub mod address_parser;
pub mod domain;
pub mod logging;

pub use address_parser::{AddressError, AddressWarning, Mailbox, ParsedAddress, parse_address};
pub use domain::Domain;
pub use tracing;
