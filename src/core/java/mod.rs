pub mod probe;
pub mod provision;

pub use probe::{
    is_java_compatible_major, probe_java, required_java_for_minecraft_version, JavaInstallation,
    JavaValidation, JavaValidator, ProbeJavaValidator,
};
pub use provision::{JavaProvisioner, JavaProvisioning};
