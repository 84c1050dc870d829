//! Read-only views the inference engine hands to the trackers.
//!
//! The trackers never touch tensor contents. Everything they record comes
//! through [`TensorInfo`] (name, shape, dtype, sizes) and [`Vocabulary`]
//! (token count, token text), so any engine can be instrumented by
//! implementing these two traits over its own handles.

use serde::{Deserialize, Serialize};

pub type TokenId = i32;

/// Element storage type of a tensor, named after the GGML type tags.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    F32,
    F16,
    Bf16,
    Q8_0,
    Q5_0,
    Q5_1,
    Q4_0,
    Q4_1,
    Q2K,
    Q3K,
    Q4K,
    Q5K,
    Q6K,
    Q8K,
    I32,
    #[serde(other)]
    Unknown,
}

impl DType {
    /// Parse an engine dtype tag such as `"f16"`, `"q4_0"` or `"Q4_K"`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "f32" => DType::F32,
            "f16" => DType::F16,
            "bf16" => DType::Bf16,
            "q8_0" => DType::Q8_0,
            "q5_0" => DType::Q5_0,
            "q5_1" => DType::Q5_1,
            "q4_0" => DType::Q4_0,
            "q4_1" => DType::Q4_1,
            "q2_k" => DType::Q2K,
            "q3_k" => DType::Q3K,
            "q4_k" => DType::Q4K,
            "q5_k" => DType::Q5K,
            "q6_k" => DType::Q6K,
            "q8_k" => DType::Q8K,
            "i32" => DType::I32,
            _ => DType::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F16 => "f16",
            DType::Bf16 => "bf16",
            DType::Q8_0 => "q8_0",
            DType::Q5_0 => "q5_0",
            DType::Q5_1 => "q5_1",
            DType::Q4_0 => "q4_0",
            DType::Q4_1 => "q4_1",
            DType::Q2K => "q2_k",
            DType::Q3K => "q3_k",
            DType::Q4K => "q4_k",
            DType::Q5K => "q5_k",
            DType::Q6K => "q6_k",
            DType::Q8K => "q8_k",
            DType::I32 => "i32",
            DType::Unknown => "unknown",
        }
    }

    #[must_use]
    pub const fn is_quantized(self) -> bool {
        !matches!(self, DType::F32 | DType::F16 | DType::Bf16 | DType::I32)
    }

    /// Coarse precision class used by the compression and bandwidth estimates.
    #[must_use]
    pub const fn precision(self) -> Precision {
        match self {
            // I32 index and position tensors are full width, not quantized.
            DType::F32 | DType::I32 => Precision::Full,
            DType::F16 | DType::Bf16 => Precision::Half,
            DType::Q8_0 | DType::Q8K => Precision::Int8,
            DType::Q4_0 | DType::Q4_1 | DType::Q4K => Precision::Int4,
            DType::Q2K => Precision::Int2,
            DType::Q5_0 | DType::Q5_1 | DType::Q3K | DType::Q5K | DType::Q6K | DType::Unknown => Precision::OtherQuantized,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Precision class of a tensor's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Full,
    Half,
    Int8,
    Int4,
    Int2,
    OtherQuantized,
}

/// Metadata view over an engine tensor.
pub trait TensorInfo {
    fn name(&self) -> &str;

    /// Dimension sizes, innermost first (GGML `ne` order).
    fn shape(&self) -> &[usize];

    fn dtype(&self) -> DType;

    /// Size of the backing allocation in bytes.
    fn byte_size(&self) -> usize;

    fn element_count(&self) -> usize {
        self.shape().iter().product()
    }

    /// Raw data address, for diagnostics only. Zero when the engine does not expose one.
    fn address(&self) -> usize {
        0
    }

    /// Ratio of the equivalent f32 footprint to the actual byte size, 1.0 when empty.
    fn measured_compression_ratio(&self) -> f64 {
        let actual = self.byte_size();
        if actual == 0 {
            return 1.0;
        }
        (self.element_count() * std::mem::size_of::<f32>()) as f64 / actual as f64
    }
}

/// Owned tensor description for engines (and tests) without a handle type of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorMeta {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub byte_size: usize,
    pub address: usize,
}

impl TensorMeta {
    /// Describe a densely packed tensor, deriving its byte size from `dtype`.
    #[must_use]
    pub fn new(name: impl Into<String>, shape: &[usize], dtype: DType) -> Self {
        let elements: usize = shape.iter().product();
        Self {
            name: name.into(),
            shape: shape.to_vec(),
            dtype,
            byte_size: packed_bytes(dtype, elements),
            address: 0,
        }
    }

    #[must_use]
    pub fn with_byte_size(mut self, byte_size: usize) -> Self {
        self.byte_size = byte_size;
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: usize) -> Self {
        self.address = address;
        self
    }
}

impl TensorInfo for TensorMeta {
    fn name(&self) -> &str {
        &self.name
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn dtype(&self) -> DType {
        self.dtype
    }

    fn byte_size(&self) -> usize {
        self.byte_size
    }

    fn address(&self) -> usize {
        self.address
    }
}

/// Approximate packed size in bytes of `elements` values stored as `dtype`.
///
/// Quantized sizes follow the GGML block layouts (32 or 256 values per block).
#[must_use]
pub fn packed_bytes(dtype: DType, elements: usize) -> usize {
    let (block_elems, block_bytes) = match dtype {
        DType::F32 | DType::I32 => (1, 4),
        DType::F16 | DType::Bf16 => (1, 2),
        DType::Q8_0 => (32, 34),
        DType::Q5_0 => (32, 22),
        DType::Q5_1 => (32, 24),
        DType::Q4_0 => (32, 18),
        DType::Q4_1 => (32, 20),
        DType::Q2K => (256, 84),
        DType::Q3K => (256, 110),
        DType::Q4K => (256, 144),
        DType::Q5K => (256, 176),
        DType::Q6K => (256, 210),
        DType::Q8K => (256, 292),
        DType::Unknown => (1, 4),
    };
    elements.div_ceil(block_elems) * block_bytes
}

/// Render a shape as `[4096x32]`.
#[must_use]
pub fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
    format!("[{}]", dims.join("x"))
}

/// Token lookup view over an engine vocabulary.
pub trait Vocabulary {
    fn n_tokens(&self) -> usize;

    /// Best-effort decoded text; `None` for ids the vocabulary cannot render.
    fn token_text(&self, token: TokenId) -> Option<String>;
}

/// Static model facts recorded in the session header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub n_vocab: u32,
    pub n_ctx_train: u32,
    pub n_embd: u32,
    pub n_layer: u32,
    pub n_head: u32,
}

#[path = "tensor.test.rs"]
mod tests;
