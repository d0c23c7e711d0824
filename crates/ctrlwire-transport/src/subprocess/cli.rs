//! CLI transport implementation
//!
//! Hosts the peer as a child process. Outbound lines go to its stdin;
//! its stdout is decoded into JSON values by a background reader task.

use super::framing::JsonLineDecoder;
use super::process::ProcessConfig;
use crate::error::{Result, TransportError};
use crate::traits::{InboundStream, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

const INBOUND_CAPACITY: usize = 100;

/// Transport over a child process's stdio
pub struct CliTransport {
    config: ProcessConfig,
    stdin: Mutex<Option<BufWriter<ChildStdin>>>,
    inbound: StdMutex<Option<mpsc::Receiver<Result<Value>>>>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
    ready: AtomicBool,
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CliTransport {
    /// Create an unconnected transport
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            config,
            stdin: Mutex::new(None),
            inbound: StdMutex::new(None),
            tasks: StdMutex::new(Vec::new()),
            ready: AtomicBool::new(false),
        }
    }

    /// Get process configuration
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for CliTransport {
    async fn connect(&self) -> Result<()> {
        if self.ready.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut child = self.config.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Connection("failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Connection("failed to get stdout".to_string()))?;
        let stderr = child.stderr.take();

        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let mut tasks = vec![tokio::spawn(read_stdout(
            stdout,
            child,
            tx,
            self.config.max_buffer_size,
        ))];
        if let Some(stderr) = stderr {
            tasks.push(tokio::spawn(read_stderr(stderr)));
        }

        *self.stdin.lock().await = Some(BufWriter::new(stdin));
        *lock(&self.inbound) = Some(rx);
        *lock(&self.tasks) = tasks;
        self.ready.store(true, Ordering::SeqCst);

        tracing::debug!(cli_path = %self.config.cli_path, "peer process started");
        Ok(())
    }

    async fn write(&self, line: &str) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        let writer = stdin.as_mut().ok_or(TransportError::NotConnected)?;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn end_input(&self) -> Result<()> {
        if let Some(mut writer) = self.stdin.lock().await.take() {
            writer.shutdown().await?;
        }
        self.ready.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn read_messages(&self) -> Result<InboundStream> {
        let rx = lock(&self.inbound).take().ok_or_else(|| {
            TransportError::Other("inbound stream already taken or not connected".to_string())
        })?;
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.ready.store(false, Ordering::SeqCst);
        self.stdin.lock().await.take();
        // The reader task owns the child; aborting it drops the child, which kills it.
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
        lock(&self.inbound).take();
        Ok(())
    }
}

async fn read_stdout(
    stdout: ChildStdout,
    mut child: Child,
    tx: mpsc::Sender<Result<Value>>,
    max_buffer_size: usize,
) {
    let mut reader = BufReader::new(stdout);
    let mut decoder = JsonLineDecoder::new(max_buffer_size);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => match decoder.push_line(&line) {
                Ok(Some(value)) => {
                    if tx.send(Ok(value)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    let _ = tx.send(Err(err)).await;
                    return;
                }
            },
            Err(err) => {
                let _ = tx.send(Err(TransportError::Io(err))).await;
                return;
            }
        }
    }

    match child.wait().await {
        Ok(status) if !status.success() => {
            let msg = match status.code() {
                Some(code) => format!("process exited with code {}", code),
                None => "process terminated by signal".to_string(),
            };
            let _ = tx.send(Err(TransportError::Process(msg))).await;
        }
        Ok(_) => {}
        Err(err) => {
            let _ = tx.send(Err(TransportError::Io(err))).await;
        }
    }
}

async fn read_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "ctrlwire::stderr", "{}", line);
    }
}
