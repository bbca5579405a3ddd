pub mod command_enablement;
pub mod prefix;
