//! Host daemon internals: profile loading, request dispatch and the IPC
//! accept loop. The binary in `main.rs` wires these together; integration
//! tests drive them in-process.

pub mod dispatcher;
pub mod ipc;
pub mod profile;

pub use dispatcher::{dispatch, handle_line, HostContext, RouteError};
pub use ipc::{bind_and_serve, RequestHandler};
pub use profile::{load_host_profile, HostProfile, IpcBackendKind, ProfileError};
