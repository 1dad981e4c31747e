/// JSON-RPC 2.0 error codes used by the daemon server.
///
/// Every one of these is delivered inside a 200 response; the transport
/// status line never carries a protocol error.
pub mod codes {
    /// Request body was not valid JSON
    pub const PARSE_ERROR: i64 = -32700;
    /// `jsonrpc` member missing or not `"2.0"`
    pub const INVALID_REQUEST: i64 = -32600;
    /// Unknown RPC method or unknown tool name
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    /// Upstream document could not be fetched
    pub const INTERNAL_ERROR: i64 = -32603;
}
