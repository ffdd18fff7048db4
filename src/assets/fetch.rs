use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{
    assets::decode::{decode_image, load_image},
    assets::surface::RasterSurface,
    foundation::error::{CaptchaError, CaptchaResult},
};

/// Where the source image comes from.
#[derive(Clone, Debug)]
pub enum ImageSource {
    /// Already decoded.
    Raster(RasterSurface),
    /// Encoded bytes (PNG, JPEG, ...).
    Bytes(Vec<u8>),
    /// Resource on disk.
    Path(PathBuf),
    /// Remote URI, resolved through an [`ImageFetcher`].
    Remote(String),
}

impl ImageSource {
    /// Resolve the source on the current thread. `Remote` needs a fetcher.
    pub fn load_blocking(self, fetcher: Option<&dyn ImageFetcher>) -> CaptchaResult<RasterSurface> {
        match self {
            Self::Raster(surface) => Ok(surface),
            Self::Bytes(bytes) => decode_image(&bytes),
            Self::Path(path) => load_image(&path),
            Self::Remote(uri) => {
                let fetcher = fetcher.ok_or_else(|| {
                    CaptchaError::acquisition_failed(format!("no fetcher configured for '{uri}'"))
                })?;
                let bytes = fetcher.fetch(&uri)?;
                decode_image(&bytes)
            }
        }
    }
}

/// Blocking transport for remote images. Runs on a worker thread.
pub trait ImageFetcher: Send + Sync + 'static {
    fn fetch(&self, uri: &str) -> CaptchaResult<Vec<u8>>;
}

/// HTTP(S) fetcher backed by `reqwest`'s blocking client.
#[cfg(feature = "http")]
#[derive(Clone, Copy, Debug)]
pub struct HttpFetcher {
    pub connect_timeout: std::time::Duration,
    pub timeout: std::time::Duration,
}

#[cfg(feature = "http")]
impl Default for HttpFetcher {
    fn default() -> Self {
        Self {
            connect_timeout: std::time::Duration::from_secs(5),
            timeout: std::time::Duration::from_secs(30),
        }
    }
}

#[cfg(feature = "http")]
impl ImageFetcher for HttpFetcher {
    fn fetch(&self, uri: &str) -> CaptchaResult<Vec<u8>> {
        // the blocking client must be built and dropped off the async runtime
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .build()
            .map_err(|e| CaptchaError::acquisition_failed(format!("build http client: {e}")))?;
        let response = client
            .get(uri)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| CaptchaError::acquisition_failed(format!("fetch '{uri}': {e}")))?;
        let bytes = response
            .bytes()
            .map_err(|e| CaptchaError::acquisition_failed(format!("read body of '{uri}': {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Handle to an in-flight image acquisition.
///
/// The fetch and decode run on tokio's blocking pool. Cancelling, or
/// dropping the handle, abandons the work: its result is discarded and
/// `CancelledAcquisition` is delivered instead. Either way the outcome is
/// produced exactly once.
#[derive(Debug)]
pub struct Acquisition<T = CaptchaResult<RasterSurface>> {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<T>,
}

impl Acquisition {
    /// Start acquiring `source`. Must be called from within a tokio runtime.
    pub fn spawn(source: ImageSource, fetcher: Option<Arc<dyn ImageFetcher>>) -> Self {
        let (cancel, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(run(source, fetcher, cancel_rx));
        Self {
            cancel: Some(cancel),
            task,
        }
    }

    /// Wait for the decoded surface (or the error / cancellation).
    pub async fn wait(self) -> CaptchaResult<RasterSurface> {
        let Self { cancel, task } = self;
        let out = join_output(task.await);
        drop(cancel);
        out
    }
}

impl Acquisition<()> {
    /// Start acquiring `source` and hand the outcome to `on_done`.
    pub fn spawn_with_callback<F>(
        source: ImageSource,
        fetcher: Option<Arc<dyn ImageFetcher>>,
        on_done: F,
    ) -> Self
    where
        F: FnOnce(CaptchaResult<RasterSurface>) + Send + 'static,
    {
        let (cancel, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            on_done(run(source, fetcher, cancel_rx).await);
        });
        Self {
            cancel: Some(cancel),
            task,
        }
    }

    /// Wait until the callback has run.
    pub async fn join(self) {
        let Self { cancel, task } = self;
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "acquisition callback task failed");
        }
        drop(cancel);
    }
}

impl<T> Acquisition<T> {
    /// Abandon the acquisition. No-op once finished or already cancelled.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(
    source: ImageSource,
    fetcher: Option<Arc<dyn ImageFetcher>>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> CaptchaResult<RasterSurface> {
    let work = tokio::task::spawn_blocking(move || source.load_blocking(fetcher.as_deref()));
    let out = tokio::select! {
        biased;
        _ = &mut cancel_rx => Err(CaptchaError::cancelled("image acquisition abandoned")),
        joined = work => join_output(joined),
    };
    if let Err(e) = &out {
        tracing::warn!(error = %e, "image acquisition did not produce a surface");
    }
    out
}

fn join_output(
    joined: Result<CaptchaResult<RasterSurface>, tokio::task::JoinError>,
) -> CaptchaResult<RasterSurface> {
    match joined {
        Ok(res) => res,
        Err(e) if e.is_cancelled() => Err(CaptchaError::cancelled("acquisition task aborted")),
        Err(e) => Err(CaptchaError::acquisition_failed(format!(
            "acquisition worker panicked: {e}"
        ))),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fetch.rs"]
mod tests;
