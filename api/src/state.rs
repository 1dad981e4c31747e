use daemon_mcp_runtime::DocumentSource;

#[derive(Clone)]
pub struct AppState {
    pub source: DocumentSource,
}
