//! The dispatch engine.
//!
//! [`Engine`] ties the pieces together: the input streamer feeds the work
//! channel, a [`WorkerPool`] drains it through the selected command's
//! handler, and every outcome goes to the shared [`Output`].

use crate::batch::BatchBuffer;
use crate::client::{HttpTransport, Transport};
use crate::commands::{invoke, DispatchMode, Handler};
use crate::error::TrailsError;
use crate::input::{stream_lines, StreamStats};
use crate::pool::{work_channel, Worker, WorkerPool};
use crate::render::Output;
use crate::types::{TrailsConfig, WorkItem};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncRead;

/// What happened during one run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Items read from the input
    pub items_read: usize,
    /// Remote calls issued
    pub calls: usize,
    /// Calls that produced a rendered result
    pub succeeded: usize,
    /// Calls that produced an error record
    pub failed: usize,
    /// Items handled by each worker that ran to completion
    pub workers: Vec<usize>,
    /// Read error that cut the input short, if any
    pub input_error: Option<TrailsError>,
}

/// Runs one command against the SecurityTrails API.
///
/// # Example
///
/// ```rust,no_run
/// use haktrails_lib::{CommandRegistry, Engine, TrailsConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = TrailsConfig::default().with_api_key("your-key");
///     let engine = Engine::new(config)?;
///     let handler = CommandRegistry::builtin().get("subdomains").unwrap();
///     let summary = engine.run(handler, tokio::io::stdin()).await?;
///     eprintln!("{} calls, {} failed", summary.calls, summary.failed);
///     Ok(())
/// }
/// ```
pub struct Engine {
    config: Arc<TrailsConfig>,
    transport: Arc<dyn Transport>,
    output: Arc<Output>,
}

impl Engine {
    /// Create an engine talking HTTP and writing to stdout/stderr.
    ///
    /// The configuration is validated here, before anything is spawned.
    pub fn new(config: TrailsConfig) -> Result<Self, TrailsError> {
        config.validate()?;
        let transport = HttpTransport::from_config(&config)?;
        let output = Output::stdio(config.output_mode);
        Ok(Self::with_parts(config, Arc::new(transport), Arc::new(output)))
    }

    /// Create an engine from explicit parts. No validation is done.
    pub fn with_parts(
        config: TrailsConfig,
        transport: Arc<dyn Transport>,
        output: Arc<Output>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            output,
        }
    }

    pub fn config(&self) -> &TrailsConfig {
        &self.config
    }

    /// Stream `input` through `handler` and wait for every worker.
    ///
    /// Per-item failures are rendered as error records and counted; only
    /// configuration errors are returned. Single-shot commands ignore
    /// `input`.
    pub async fn run<R>(&self, handler: Arc<dyn Handler>, input: R) -> Result<RunSummary, TrailsError>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        if handler.mode() == DispatchMode::Single {
            return self.run_single(handler).await;
        }

        let pool = WorkerPool::new(self.config.concurrency)?;
        tracing::info!(
            "running {} with {} workers",
            handler.name(),
            pool.size()
        );

        let context = Arc::new(WorkerContext::new(
            handler.clone(),
            self.transport.clone(),
            self.config.clone(),
            self.output.clone(),
        ));

        let (sender, queue) = work_channel(pool.size());
        let producer = tokio::spawn(stream_lines(input, sender));

        let report = if handler.mode() == DispatchMode::Batched {
            let batch_size = self.config.batch_size;
            pool.run(queue, |_| BatchWorker {
                context: context.clone(),
                buffer: BatchBuffer::new(batch_size),
            })
            .await
        } else {
            pool.run(queue, |_| LookupWorker {
                context: context.clone(),
            })
            .await
        };

        let stats = match producer.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!("input task failed: {}", e);
                StreamStats {
                    error: Some(TrailsError::internal(format!("input task failed: {}", e))),
                    ..StreamStats::default()
                }
            }
        };

        let summary = RunSummary {
            items_read: stats.published,
            calls: context.calls.load(Ordering::SeqCst),
            succeeded: context.succeeded.load(Ordering::SeqCst),
            failed: context.failed.load(Ordering::SeqCst),
            workers: report.per_worker,
            input_error: stats.error,
        };
        tracing::info!(
            "{} finished: {} items, {} calls, {} failed",
            handler.name(),
            summary.items_read,
            summary.calls,
            summary.failed
        );
        Ok(summary)
    }

    /// Issue the one request of a single-shot command.
    pub async fn run_single(&self, handler: Arc<dyn Handler>) -> Result<RunSummary, TrailsError> {
        tracing::info!("running {}", handler.name());
        let mut summary = RunSummary {
            calls: 1,
            ..RunSummary::default()
        };

        match invoke(handler.as_ref(), self.transport.as_ref(), &[], &self.config).await {
            Ok(result) => {
                self.output.render(&result);
                summary.succeeded = 1;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.output.render_error(&e);
                summary.failed = 1;
            }
        }
        Ok(summary)
    }
}

/// State shared by every worker of one run.
struct WorkerContext {
    handler: Arc<dyn Handler>,
    transport: Arc<dyn Transport>,
    config: Arc<TrailsConfig>,
    output: Arc<Output>,
    calls: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl WorkerContext {
    fn new(
        handler: Arc<dyn Handler>,
        transport: Arc<dyn Transport>,
        config: Arc<TrailsConfig>,
        output: Arc<Output>,
    ) -> Self {
        Self {
            handler,
            transport,
            config,
            output,
            calls: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// One remote call for `items`, rendered either way.
    async fn call(&self, items: &[WorkItem]) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match invoke(
            self.handler.as_ref(),
            self.transport.as_ref(),
            items,
            &self.config,
        )
        .await
        {
            Ok(result) => {
                self.succeeded.fetch_add(1, Ordering::SeqCst);
                self.output.render(&result);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                tracing::debug!("{} failed: {}", self.handler.name(), e);
                self.output.render_error(&e);
            }
        }
    }
}

/// One call per item.
struct LookupWorker {
    context: Arc<WorkerContext>,
}

#[async_trait]
impl Worker for LookupWorker {
    async fn handle(&mut self, item: WorkItem) {
        self.context.call(std::slice::from_ref(&item)).await;
    }
}

/// Groups items into batches; flushes the remainder when input ends.
struct BatchWorker {
    context: Arc<WorkerContext>,
    buffer: BatchBuffer,
}

#[async_trait]
impl Worker for BatchWorker {
    async fn handle(&mut self, item: WorkItem) {
        if let Some(batch) = self.buffer.push(item) {
            self.context.call(&batch).await;
        }
    }

    async fn finish(&mut self) {
        if let Some(batch) = self.buffer.finish() {
            self.context.call(&batch).await;
        }
    }
}
