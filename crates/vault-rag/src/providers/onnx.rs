//! Local all-MiniLM-L6-v2 embeddings through ONNX Runtime

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::{check_dimensions, EmbeddingProvider};

/// ONNX-based text embedder with mean pooling and L2 normalization
pub struct LocalOnnxEmbedder {
    inner: Mutex<OnnxModel>,
    model: String,
    dimensions: usize,
}

struct OnnxModel {
    session: Session,
    tokenizer: Tokenizer,
    max_length: usize,
    batch_size: usize,
}

impl LocalOnnxEmbedder {
    /// Load the model, downloading it into the cache directory on first use
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!("Initializing ONNX embedder with model: {}", config.model);

        std::fs::create_dir_all(&config.cache_dir).map_err(|e| {
            Error::Config(format!("Failed to create cache directory: {}", e))
        })?;

        let model_dir = config.cache_dir.join(config.model.replace('/', "_"));
        std::fs::create_dir_all(&model_dir)?;
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            download(&config.model, "onnx/model.onnx", &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download(&config.model, "tokenizer.json", &tokenizer_path).await?;
        }

        let session = Session::builder()
            .map_err(|e| Error::Config(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::Config(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::Config(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| Error::Config(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Config(format!("Failed to load tokenizer: {}", e)))?;

        tracing::info!("ONNX embedder initialized");

        Ok(Self {
            inner: Mutex::new(OnnxModel {
                session,
                tokenizer,
                max_length: config.max_length,
                batch_size: config.batch_size.max(1),
            }),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

impl OnnxModel {
    fn embed_all(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all.extend(self.embed_batch(batch)?);
        }
        Ok(all)
    }

    fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::service(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for j in 0..ids.len().min(max_len) {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                token_type_ids[i * max_len + j] = types[j] as i64;
            }
        }

        let shape = vec![batch_size, max_len];
        let tensor = |data: Vec<i64>| {
            Tensor::from_array((shape.clone(), data.into_boxed_slice()))
                .map_err(|e| Error::service(format!("Tensor creation failed: {}", e)))
        };

        let inputs = vec![
            ("input_ids", tensor(input_ids)?.into_dyn()),
            ("attention_mask", tensor(attention_mask.clone())?.into_dyn()),
            ("token_type_ids", tensor(token_type_ids)?.into_dyn()),
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::service(format!("Inference failed: {}", e)))?;

        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::service("No output tensor"))?;

        let (tensor_shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::service(format!("Failed to extract tensor: {}", e)))?;
        let hidden = tensor_shape.get(2).map(|&d| d as usize).unwrap_or(0);

        let mut embeddings = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let mut pooled = vec![0.0f32; hidden];
            let mut count = 0.0f32;

            for j in 0..max_len {
                if attention_mask[i * max_len + j] == 0 {
                    continue;
                }
                let row = (i * max_len + j) * hidden;
                for (k, value) in pooled.iter_mut().enumerate() {
                    if let Some(x) = data.get(row + k) {
                        *value += x;
                    }
                }
                count += 1.0;
            }

            if count > 0.0 {
                pooled.iter_mut().for_each(|v| *v /= count);
            }
            let norm = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                pooled.iter_mut().for_each(|v| *v /= norm);
            }
            embeddings.push(pooled);
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalOnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::service("Empty embedding result"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self.inner.lock().embed_all(&refs)?;
        for vector in &vectors {
            check_dimensions(self, vector)?;
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Fetch a file from the sentence-transformers repository on Hugging Face
async fn download(model: &str, file: &str, path: &Path) -> Result<()> {
    let repo = match model {
        // Ollama's tag for the same model
        "all-minilm" => "sentence-transformers/all-MiniLM-L6-v2".to_string(),
        m if m.contains('/') => m.to_string(),
        m => format!("sentence-transformers/{}", m),
    };
    let url = format!("https://huggingface.co/{}/resolve/main/{}", repo, file);

    tracing::info!("Downloading {}", url);

    let response = reqwest::get(&url).await?;
    if !response.status().is_success() {
        return Err(Error::Config(format!(
            "Download of {} failed: HTTP {}",
            url,
            response.status()
        )));
    }
    let bytes = response.bytes().await?;
    std::fs::write(path, &bytes)?;

    tracing::info!("Downloaded {} ({} bytes)", file, bytes.len());
    Ok(())
}
