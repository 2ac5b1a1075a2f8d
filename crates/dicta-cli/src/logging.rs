//! Subscriber setup for `dicttool`.

use std::path::Path;

use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub const TRACE_FILE_NAME: &str = "dicttool-trace.jsonl";

const ENGINE_DEBUG: &str = "dicta_core=debug,dicta_cli=debug";

/// Human-readable events on stderr. `RUST_LOG` overrides the level.
pub fn stderr_layer(verbose: bool) -> BoxedLayer {
    let default = if verbose { ENGINE_DEBUG } else { "warn" };
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .boxed()
}

/// Engine events at debug level as JSON lines in `dir/dicttool-trace.jsonl`.
/// The writer is blocking: the process exits right after its command.
pub fn trace_layer(dir: &Path) -> BoxedLayer {
    fmt::layer()
        .json()
        .with_writer(tracing_appender::rolling::never(dir, TRACE_FILE_NAME))
        .with_target(true)
        .with_filter(EnvFilter::new(ENGINE_DEBUG))
        .boxed()
}
