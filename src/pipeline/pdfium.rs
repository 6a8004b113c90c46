//! Locate and bind the pdfium shared library, and run work against it.
//!
//! Library resolution order:
//! 1. `PDFIUM_LIB_PATH`: the library file itself or the directory holding it
//! 2. the platform library name in the current directory
//! 3. the system library search path
//!
//! pdfium keeps global state and is not re-entrant, and dropping a bound
//! instance tears the library down for every other instance in the process.
//! All pdfium work therefore runs on one dedicated thread that owns the only
//! [`Pdfium`] for the lifetime of the process; async code hands it closures
//! through [`run`].

use crate::error::Scan2PdfError;
use pdfium_render::prelude::*;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::OnceLock;
use tracing::{debug, error};

type Job = Box<dyn FnOnce(&Pdfium) + Send>;

static WORKER: OnceLock<Result<mpsc::Sender<Job>, String>> = OnceLock::new();

/// Where the library was found.
#[derive(Debug, Clone, PartialEq)]
enum Location {
    File(PathBuf),
    System,
}

/// Run `f` on the pdfium thread and wait for its result.
///
/// The first call binds the library; a binding failure is remembered and
/// returned by every later call.
pub async fn run<T, F>(f: F) -> Result<T, Scan2PdfError>
where
    F: FnOnce(&Pdfium) -> T + Send + 'static,
    T: Send + 'static,
{
    let sender = worker()?;
    let (tx, rx) = tokio::sync::oneshot::channel();
    sender
        .send(Box::new(move |pdfium: &Pdfium| {
            let _ = tx.send(f(pdfium));
        }))
        .map_err(|_| Scan2PdfError::Internal("pdfium worker has stopped".into()))?;
    rx.await
        .map_err(|_| Scan2PdfError::Internal("pdfium job panicked".into()))
}

/// Bind the library now, off the async runtime, to fail fast before any
/// work starts.
pub async fn ensure_available() -> Result<(), Scan2PdfError> {
    tokio::task::spawn_blocking(|| worker().map(drop))
        .await
        .map_err(|e| Scan2PdfError::Internal(format!("pdfium bind task panicked: {}", e)))?
}

/// Test helper: run `f` on the pdfium thread, or return `None` when the
/// library cannot be bound on this machine.
#[cfg(test)]
pub(crate) async fn try_run<T, F>(f: F) -> Option<T>
where
    F: FnOnce(&Pdfium) -> T + Send + 'static,
    T: Send + 'static,
{
    if let Err(e) = ensure_available().await {
        eprintln!("pdfium not available, skipping: {}", e);
        return None;
    }
    Some(run(f).await.expect("pdfium job failed"))
}

fn worker() -> Result<&'static mpsc::Sender<Job>, Scan2PdfError> {
    WORKER
        .get_or_init(spawn_worker)
        .as_ref()
        .map_err(|e| Scan2PdfError::PdfiumBindingFailed(e.clone()))
}

fn spawn_worker() -> Result<mpsc::Sender<Job>, String> {
    let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
    let (job_tx, job_rx) = mpsc::channel::<Job>();

    std::thread::Builder::new()
        .name("pdfium".into())
        .spawn(move || {
            let pdfium = match bind() {
                Ok(p) => p,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            for job in job_rx {
                // A panicking job must not take the worker down with it;
                // its caller sees the dropped reply channel instead.
                if std::panic::catch_unwind(AssertUnwindSafe(|| job(&pdfium))).is_err() {
                    error!("pdfium job panicked");
                }
            }
        })
        .map_err(|e| format!("failed to start pdfium thread: {}", e))?;

    ready_rx
        .recv()
        .map_err(|_| "pdfium thread exited during startup".to_string())??;
    Ok(job_tx)
}

fn bind() -> Result<Pdfium, String> {
    let mut attempts = Vec::new();
    for location in candidates() {
        match bind_at(&location) {
            Ok(pdfium) => {
                debug!("Bound pdfium: {:?}", location);
                return Ok(pdfium);
            }
            Err(e) => attempts.push(format!("{:?}: {}", location, e)),
        }
    }
    Err(attempts.join("; "))
}

fn candidates() -> Vec<Location> {
    let mut out = Vec::with_capacity(3);
    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        out.push(Location::File(library_file(Path::new(&env_path))));
    }
    out.push(Location::File(Pdfium::pdfium_platform_library_name_at_path("./")));
    out.push(Location::System);
    out
}

/// A directory means "the platform library name inside it".
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

fn bind_at(location: &Location) -> Result<Pdfium, String> {
    let bindings = match location {
        Location::File(path) => Pdfium::bind_to_library(path),
        Location::System => Pdfium::bind_to_system_library(),
    };
    bindings.map(Pdfium::new).map_err(|e| e.to_string())
}
