mod idp_configs;

pub use idp_configs::{IdpConfigError, IdpConfigService, LoginLink, MappingPreview};
