pub mod descriptor;
pub mod metadata;

pub use descriptor::VersionDescriptor;
pub use metadata::{ModLoaderMetadata, VersionMetadata};
