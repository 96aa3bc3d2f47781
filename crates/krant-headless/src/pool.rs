//! Bounded browser pool (C5), backed by a pre-filled capacity-bounded
//! channel rather than a semaphore + deque: acquisition is a channel
//! receive, release is a channel send, and nothing polls.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use krant_types::error::{KrantError, Result};
use krant_types::{BrowserHandle, BrowserHealth};
use spider_chrome::{Browser, BrowserConfig};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, warn};

const STEALTH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-sandbox",
];

#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub size: usize,
    pub available: usize,
    pub in_use: usize,
    pub closed: bool,
}

struct PooledBrowser {
    handle: BrowserHandle,
    browser: Browser,
}

async fn launch_stealth_browser() -> Result<Browser> {
    let config = BrowserConfig::builder()
        .args(STEALTH_ARGS.iter().map(|s| s.to_string()))
        .window_size(1366, 768)
        .build()
        .map_err(|e| KrantError::Other(anyhow::anyhow!(e)))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| KrantError::Other(anyhow::anyhow!(e)))?;

    tokio::spawn(async move {
        use futures_util::StreamExt;
        while handler.next().await.is_some() {}
    });

    Ok(browser)
}

/// Bounded pool of `size` browsers, pre-filled at construction.
pub struct BrowserPool {
    sender: mpsc::Sender<PooledBrowser>,
    receiver: Mutex<mpsc::Receiver<PooledBrowser>>,
    size: usize,
    in_use: AtomicUsize,
    closed: AtomicBool,
}

impl BrowserPool {
    pub async fn new(size: usize) -> Result<Arc<Self>> {
        let (sender, receiver) = mpsc::channel(size);
        for _ in 0..size {
            let browser = launch_stealth_browser().await?;
            let pooled = PooledBrowser {
                handle: BrowserHandle::new(chrono::Utc::now()),
                browser,
            };
            sender.send(pooled).await.map_err(|_| KrantError::Other(anyhow::anyhow!("pool channel closed during fill")))?;
        }

        Ok(Arc::new(Self {
            sender,
            receiver: Mutex::new(receiver),
            size,
            in_use: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }))
    }

    /// Acquire a browser, blocking on the channel until one is available.
    /// Cancellation-safe: dropping the returned future before completion
    /// leaves the pool state untouched.
    pub async fn acquire(self: &Arc<Self>) -> Result<BrowserCheckout> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(KrantError::Cancelled);
        }
        let mut receiver = self.receiver.lock().await;
        let pooled = receiver.recv().await.ok_or(KrantError::Cancelled)?;
        drop(receiver);
        self.in_use.fetch_add(1, Ordering::SeqCst);
        Ok(BrowserCheckout { pooled: Some(pooled), pool: self.clone() })
    }

    pub fn stats(&self) -> PoolStats {
        let in_use = self.in_use.load(Ordering::SeqCst);
        PoolStats {
            size: self.size,
            available: self.size.saturating_sub(in_use),
            in_use,
            closed: self.closed.load(Ordering::SeqCst),
        }
    }

    /// Stop accepting new releases; in-flight checkouts still release
    /// normally but their browsers are dropped rather than returned.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn release(&self, pooled: PooledBrowser) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return; // let `pooled` drop, tearing the browser down
        }
        // Non-blocking: a full or closed channel just tears this one down.
        if let Err(mpsc::error::TrySendError::Full(_)) = self.sender.try_send(pooled) {
            warn!("browser pool release found channel full; discarding instance");
        }
    }
}

/// An owned browser, released back to the pool on drop (RAII) — matching
/// the corpus's checkout-handle idiom, not its semaphore-permit mechanics.
pub struct BrowserCheckout {
    pooled: Option<PooledBrowser>,
    pool: Arc<BrowserPool>,
}

impl BrowserCheckout {
    pub fn browser(&self) -> &Browser {
        &self.pooled.as_ref().expect("checkout holds its browser until release").browser
    }

    pub fn handle(&self) -> &BrowserHandle {
        &self.pooled.as_ref().expect("checkout holds its browser until release").handle
    }

    pub fn record_use(&mut self, at: chrono::DateTime<chrono::Utc>) {
        if let Some(pooled) = self.pooled.as_mut() {
            pooled.handle.record_use(at);
        }
    }
}

impl Drop for BrowserCheckout {
    fn drop(&mut self) {
        if let Some(pooled) = self.pooled.take() {
            self.pool.release(pooled);
        }
    }
}
