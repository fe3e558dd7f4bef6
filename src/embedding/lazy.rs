//! Process-wide model handle, loaded on first use.
//!
//! The provider is created inside `OnceCell::get_or_try_init`, so concurrent
//! first requests block on a single load instead of each instantiating the
//! model. A failed load leaves the cell empty and the next caller retries.

use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::OnceCell;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;

type Loader = Box<dyn Fn() -> Result<Box<dyn EmbeddingProvider>> + Send + Sync>;

pub struct LazyModel {
    cell: OnceCell<Arc<dyn EmbeddingProvider>>,
    loader: Loader,
}

impl LazyModel {
    /// Handle that builds a provider from `config` on first use.
    pub fn from_config(config: EmbeddingConfig) -> Self {
        Self::with_loader(move || {
            tracing::info!(model = %config.model, "loading embedding model");
            let provider = super::create_provider(&config)?;
            tracing::info!(model = %config.model, "embedding model loaded");
            Ok(provider)
        })
    }

    /// Handle around an arbitrary loader.
    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Box<dyn EmbeddingProvider>> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            loader: Box::new(loader),
        }
    }

    /// Handle that is already loaded.
    pub fn preloaded(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(provider);
        Self {
            cell,
            loader: Box::new(|| -> Result<Box<dyn EmbeddingProvider>> {
                anyhow::bail!("model handle was preloaded")
            }),
        }
    }

    /// Return the provider, loading it if this is the first call.
    ///
    /// Blocks while the model loads; call from a blocking context.
    pub fn get(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        self.cell
            .get_or_try_init(|| (self.loader)().map(Arc::from))
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Constant;

    impl EmbeddingProvider for Constant {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[test]
    fn loads_once_across_calls() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let model = LazyModel::with_loader(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Constant))
        });

        assert!(!model.is_loaded());
        model.get().unwrap();
        model.get().unwrap();
        assert!(model.is_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_use_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let model = Arc::new(LazyModel::with_loader(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(Box::new(Constant))
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let model = Arc::clone(&model);
                std::thread::spawn(move || model.get().map(|_| ()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_load_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let model = LazyModel::with_loader(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("model files missing");
            }
            Ok(Box::new(Constant))
        });

        let err = model.get().err().unwrap();
        assert_eq!(err.to_string(), "model files missing");
        assert!(!model.is_loaded());

        model.get().unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn preloaded_never_calls_loader() {
        let model = LazyModel::preloaded(Arc::new(Constant));
        assert!(model.is_loaded());
        let emb = model.get().unwrap().embed("anything").unwrap();
        assert_eq!(emb, vec![1.0, 0.0]);
    }
}
