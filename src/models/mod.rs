mod idp_config;

pub use idp_config::*;
