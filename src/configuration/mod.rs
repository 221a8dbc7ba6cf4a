mod configuration;

pub use self::configuration::*;
