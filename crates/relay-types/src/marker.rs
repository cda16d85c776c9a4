//! Names of the marker directory a running relay leaves for clients to find.

/// Directory created in the server's working directory.
pub const RELAY_DIR: &str = ".colony-relay";
/// Decimal port the server is listening on.
pub const PORT_FILE: &str = "port";
/// Decimal process id of the server.
pub const PID_FILE: &str = "pid";
/// Default store file name.
pub const DB_FILE: &str = "relay.db";
/// Suffix of per-recipient watermark files kept by polling clients.
pub const LAST_ID_SUFFIX: &str = ".lastid";
