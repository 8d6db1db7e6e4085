pub mod meta;
pub mod og_url;

pub use meta::{PageMeta, og_head_tags};
pub use og_url::{DeploymentEnvironment, resolve_og_url};
