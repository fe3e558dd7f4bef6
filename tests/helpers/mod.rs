#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use sbert_service::embedding::{EmbeddingProvider, LazyModel, EMBEDDING_DIM};

/// Deterministic stand-in for the ONNX model: each token bumps one dimension,
/// then the vector is L2-normalized.
#[derive(Default)]
pub struct FakeProvider {
    pub batch_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }
}

pub fn fake_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    for token in text.split_whitespace() {
        let hash = token
            .bytes()
            .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
        v[hash as usize % EMBEDDING_DIM] += 1.0;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

impl EmbeddingProvider for FakeProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| fake_embedding(t)).collect())
    }
}

/// Provider whose inference always fails.
pub struct FailingProvider;

impl EmbeddingProvider for FailingProvider {
    fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        anyhow::bail!("inference exploded")
    }
}

/// Provider that returns vectors shorter than the dimension it declares.
pub struct TruncatingProvider;

impl EmbeddingProvider for TruncatingProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }
}

/// An already-loaded model around a shared [`FakeProvider`], so tests can
/// inspect its call counter.
pub fn preloaded_fake() -> (LazyModel, Arc<FakeProvider>) {
    let provider = Arc::new(FakeProvider::default());
    (LazyModel::preloaded(provider.clone()), provider)
}

/// A lazy model backed by [`FakeProvider`], plus a counter of loads.
pub fn fake_model() -> (Arc<LazyModel>, Arc<AtomicUsize>) {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let model = LazyModel::with_loader(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeProvider::default()))
    });
    (Arc::new(model), loads)
}

pub fn failing_model() -> Arc<LazyModel> {
    Arc::new(LazyModel::preloaded(Arc::new(FailingProvider)))
}

pub fn unloadable_model() -> Arc<LazyModel> {
    Arc::new(LazyModel::with_loader(|| {
        anyhow::bail!("ONNX model not found at /nowhere/model.onnx")
    }))
}
