//! Architecture configuration structures
//!
//! This module describes a network as JSON: the input batch shape followed by
//! an ordered list of convolution and fully-connected layers. Validation
//! walks the layers, computing each output shape, so geometry errors are
//! reported here instead of panicking inside a layer constructor.

use crate::config::TrainingConfig;
use crate::error::CnnError;
use crate::layers::{ConvLayer, FcLayer};
use crate::network::Network;
use crate::tensor::Shape;
use crate::utils::rng::SimpleRng;
use serde::Deserialize;
use std::error::Error;
use std::fs;

/// Shape of the batches fed to the first layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InputConfig {
    pub examples: usize,
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl InputConfig {
    pub fn shape(&self) -> Shape {
        Shape::new(self.examples, self.width, self.height, self.depth)
    }
}

/// Configuration for a single layer.
///
/// - **conv**: Requires `extent` and `filters`, optional `stride` (default 1)
/// - **fc**: Requires `output_size`
///
/// # Examples
///
/// ```json
/// { "layer_type": "conv", "stride": 2, "extent": 2, "filters": 4 }
/// ```
///
/// ```json
/// { "layer_type": "fc", "output_size": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayerConfig {
    /// Type of layer: "conv" or "fc"
    pub layer_type: String,

    /// Window step for conv layers (default: 1)
    pub stride: Option<usize>,
    /// Filter width and height for conv layers
    pub extent: Option<usize>,
    /// Number of filters for conv layers
    pub filters: Option<usize>,

    /// Number of output units for fc layers
    pub output_size: Option<usize>,
}

/// Configuration for the entire network.
///
/// # Example
///
/// ```json
/// {
///   "input": { "examples": 8, "width": 8, "height": 8, "depth": 1 },
///   "layers": [
///     { "layer_type": "conv", "stride": 2, "extent": 2, "filters": 4 },
///     { "layer_type": "fc", "output_size": 2 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArchitectureConfig {
    pub input: InputConfig,
    /// Layers in application order
    pub layers: Vec<LayerConfig>,
}

/// Loads and validates an architecture configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use binary_cnn::architecture::load_architecture;
///
/// let arch = load_architecture("architecture.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: &str) -> Result<ArchitectureConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

fn missing(index: usize, kind: &str, field: &str) -> CnnError {
    CnnError::InvalidConfig(format!("layer {}: {} layer missing {}", index, kind, field))
}

fn non_zero(index: usize, field: &str, value: usize) -> Result<usize, CnnError> {
    if value == 0 {
        return Err(CnnError::InvalidConfig(format!(
            "layer {}: {} must be positive",
            index, field
        )));
    }
    Ok(value)
}

/// Output shape of one layer given its input shape.
fn layer_output_shape(layer: &LayerConfig, index: usize, input: Shape) -> Result<Shape, CnnError> {
    match layer.layer_type.to_lowercase().as_str() {
        "conv" => {
            let stride = non_zero(index, "stride", layer.stride.unwrap_or(1))?;
            let extent = non_zero(
                index,
                "extent",
                layer.extent.ok_or_else(|| missing(index, "conv", "extent"))?,
            )?;
            let filters = non_zero(
                index,
                "filters",
                layer.filters.ok_or_else(|| missing(index, "conv", "filters"))?,
            )?;

            let out_x = ConvLayer::output_size(input.x, extent, stride).ok_or(
                CnnError::InvalidGeometry {
                    axis: "width",
                    input: input.x,
                    extent,
                    stride,
                },
            )?;
            let out_y = ConvLayer::output_size(input.y, extent, stride).ok_or(
                CnnError::InvalidGeometry {
                    axis: "height",
                    input: input.y,
                    extent,
                    stride,
                },
            )?;
            Ok(Shape::new(input.m, out_x, out_y, filters))
        }
        "fc" => {
            let units = non_zero(
                index,
                "output_size",
                layer
                    .output_size
                    .ok_or_else(|| missing(index, "fc", "output_size"))?,
            )?;
            Ok(Shape::new(input.m, units, 1, 1))
        }
        _ => Err(CnnError::InvalidConfig(format!(
            "layer {}: invalid layer type '{}'. Must be one of: conv, fc",
            index, layer.layer_type
        ))),
    }
}

/// Validate every layer and return the network's output shape.
pub fn validate_architecture(config: &ArchitectureConfig) -> Result<Shape, CnnError> {
    if config.layers.is_empty() {
        return Err(CnnError::InvalidConfig(
            "architecture must contain at least one layer".to_string(),
        ));
    }
    let input = config.input.shape();
    if input.is_empty() {
        return Err(CnnError::InvalidConfig(
            "input dimensions must be positive".to_string(),
        ));
    }

    let mut shape = input;
    for (i, layer) in config.layers.iter().enumerate() {
        shape = layer_output_shape(layer, i, shape)?;
    }
    Ok(shape)
}

/// Build a network from a validated architecture.
///
/// Layers draw their initial weights from `rng` in order, so the same seed
/// and architecture always produce the same network.
pub fn build_network(
    config: &ArchitectureConfig,
    training: &TrainingConfig,
    rng: &mut SimpleRng,
) -> Result<Network, CnnError> {
    validate_architecture(config)?;

    let options = training.layer_options();
    let mut network = Network::new();
    let mut shape = config.input.shape();

    for (i, layer) in config.layers.iter().enumerate() {
        let out = layer_output_shape(layer, i, shape)?;
        match layer.layer_type.to_lowercase().as_str() {
            "conv" => {
                let stride = layer.stride.unwrap_or(1);
                let extent = layer.extent.ok_or_else(|| missing(i, "conv", "extent"))?;
                network.push(ConvLayer::new(stride, extent, out.z, shape, options, rng))?;
            }
            "fc" => {
                network.push(FcLayer::new(shape, out.x, options, rng))?;
            }
            other => {
                return Err(CnnError::InvalidConfig(format!(
                    "layer {}: invalid layer type '{}'",
                    i, other
                )))
            }
        }
        shape = out;
    }

    Ok(network)
}
