use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use strata_world::{GenCtx, RegionSource};

/// Lock-free pool for reusing `GenCtx` scratch across worker jobs.
pub struct GenCtxPool {
    available_tx: Sender<GenCtx>,
    available_rx: Receiver<GenCtx>,
    allocated: AtomicUsize,
    max_contexts: usize,
}

impl GenCtxPool {
    pub fn new(max_contexts: usize) -> Self {
        let max_contexts = max_contexts.max(1);
        let (tx, rx) = bounded(max_contexts);
        Self {
            available_tx: tx,
            available_rx: rx,
            allocated: AtomicUsize::new(0),
            max_contexts,
        }
    }

    pub fn with_capacity_from_workers(worker_count: usize) -> Arc<Self> {
        let count = worker_count.max(1) * 2;
        Arc::new(Self::new(count))
    }

    /// Acquire a context from the pool, creating a new one if under capacity.
    /// Blocks when every context is out.
    pub fn acquire<'pool>(&'pool self, source: &dyn RegionSource) -> PooledGenCtx<'pool> {
        if let Ok(ctx) = self.available_rx.try_recv() {
            return self.wrap(ctx);
        }

        loop {
            let current = self.allocated.load(Ordering::Acquire);
            if current < self.max_contexts {
                let prev = self.allocated.fetch_add(1, Ordering::AcqRel);
                if prev < self.max_contexts {
                    return self.wrap(source.make_gen_ctx());
                }
                self.allocated.fetch_sub(1, Ordering::AcqRel);
            }

            // the pool owns a sender, so recv only fails if it was dropped
            if let Ok(ctx) = self.available_rx.recv() {
                return self.wrap(ctx);
            }
        }
    }

    fn wrap(&self, mut ctx: GenCtx) -> PooledGenCtx<'_> {
        ctx.columns.clear();
        PooledGenCtx { ctx, pool: self }
    }

    fn release(&self, ctx: GenCtx) {
        let _ = self.available_tx.send(ctx);
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn idle(&self) -> usize {
        self.available_rx.len()
    }
}

pub struct PooledGenCtx<'pool> {
    ctx: GenCtx,
    pool: &'pool GenCtxPool,
}

impl Deref for PooledGenCtx<'_> {
    type Target = GenCtx;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

impl DerefMut for PooledGenCtx<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ctx
    }
}

impl Drop for PooledGenCtx<'_> {
    fn drop(&mut self) {
        // leave an empty shell behind; it owns no buffers
        let params = Arc::clone(&self.ctx.params);
        let ctx = std::mem::replace(&mut self.ctx, GenCtx::new(params));
        self.pool.release(ctx);
    }
}
