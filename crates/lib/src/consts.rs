/// Config file evaluated when none is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "roundsman.lua";

/// The only distribution the dependency installers know how to drive.
pub const SUPPORTED_DISTRIBUTION: &str = "Ubuntu";

/// Remote command whose output names the distribution.
pub const DISTRIBUTION_COMMAND: &str = "cat /etc/issue";

/// Key that is never evaluated nor written to the attributes file.
pub const PASSWORD_KEY: &str = "password";
