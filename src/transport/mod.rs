/// Local filesystem primitives: atomic writes, quarantine copies, listings.
pub mod fs;
