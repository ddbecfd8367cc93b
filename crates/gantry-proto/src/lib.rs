//! Wire contract for the gantry RPC bridge.
//!
//! This crate defines the two shapes that cross the wire — [`Request`] in,
//! [`Envelope`] out — along with the reserved administrative command names,
//! the `_Module` disambiguation key, and the well-known ports host programs
//! listen on. It is shared by the server and any client implementation and
//! deliberately depends on nothing beyond serde and chrono.

mod envelope;
mod request;

pub use envelope::Envelope;
pub use request::Request;

/// Reserved parameter key carrying a module disambiguation hint.
///
/// Clients place this inside `parameters` rather than as a top-level field;
/// the dispatcher strips it before argument validation so it is never passed
/// to the command itself.
pub const MODULE_KEY: &str = "_Module";

/// Administrative commands handled by the server itself.
///
/// These names are reserved: a loaded module can register a command with one
/// of these names, but it will never be reachable because the dispatcher
/// checks this set before consulting the registry.
pub mod admin {
    pub const SHUTDOWN: &str = "shutdown";
    pub const LIST_COMMANDS: &str = "list-commands";
    pub const RELOAD_MODULES: &str = "reload-modules";
    pub const HOTLOAD_MODULE: &str = "hotload-module";
    pub const UNLOAD_MODULE: &str = "unload-module";
    pub const DESCRIBE_COMMAND: &str = "describe-command";

    /// All reserved names, for introspection and shadowing checks.
    pub const ALL: [&str; 6] = [
        SHUTDOWN,
        LIST_COMMANDS,
        RELOAD_MODULES,
        HOTLOAD_MODULE,
        UNLOAD_MODULE,
        DESCRIBE_COMMAND,
    ];

    /// Whether `name` is a reserved administrative command.
    pub fn is_reserved(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// Well-known ports the bridge listens on inside each host program.
pub mod ports {
    pub const UNDEFINED: u16 = 65500;
    pub const MAYA: u16 = 65501;
    pub const HOUDINI: u16 = 65502;
    pub const BLENDER: u16 = 65504;
    pub const SUBSTANCE_PAINTER: u16 = 65505;
    pub const UNREAL: u16 = 30010;

    /// Look up the port for a host program by name, falling back to
    /// [`UNDEFINED`] for programs without a reserved port.
    pub fn for_host_program(name: &str) -> u16 {
        match name {
            "maya" => MAYA,
            "houdini" => HOUDINI,
            "blender" => BLENDER,
            "substance_painter" => SUBSTANCE_PAINTER,
            "unreal" => UNREAL,
            _ => UNDEFINED,
        }
    }
}
