//! File/code adapted from https://github.com/jamjamjon/usls
//!
//! ONNX Runtime session wrapper.

use anyhow::{Context, Result};
use half::f16;
use ndarray::{Array, Array4, IxDyn};
use ort::{
    execution_providers::{
        CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider, TensorRTExecutionProvider,
    },
    session::builder::{GraphOptimizationLevel, SessionBuilder},
    session::Session,
    tensor::TensorElementType,
    value::{DynValue, Tensor},
};
use crate::common::InferenceDevice;
use crate::data::{DetectorConfig, CROSS_MARK};

/// ONNXRuntime Backend
#[derive(Debug)]
pub struct OrtEngine {
    session: Session,
    input_name: String,
    output_name: String,
    half_input: bool,
    model_width: u32,
    model_height: u32,
}

impl OrtEngine {
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        if let Some(lib_path) = &config.ort_lib_path {
            let ort_init = ort::init_from(lib_path.to_string_lossy().to_string());
            match ort_init.commit() {
                Ok(_) => {}
                Err(e) => {
                    return Err(anyhow::anyhow!("Failed to commit ORT from {}: {:?}", lib_path.display(), e));
                }
            };
        }

        let mut builder = Session::builder()?;

        let mut device = config.inference_device;
        let registered = match device {
            InferenceDevice::TensorRT => Self::build_trt(&mut builder, config.device_id),
            InferenceDevice::CUDA => Self::build_cuda(&mut builder, config.device_id),
            InferenceDevice::CPU => Ok(()),
        };
        if let Err(err) = registered {
            log::warn!("{err}, Using cpu");
            device = InferenceDevice::CPU;
        }
        if device == InferenceDevice::CPU {
            Self::build_cpu(&mut builder)?;
        }

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&config.model_path)
            .with_context(|| format!("Cannot load model {}", config.model_path.display()))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| anyhow::anyhow!("{CROSS_MARK} Model has no inputs"))?;
        let output = session
            .outputs
            .first()
            .ok_or_else(|| anyhow::anyhow!("{CROSS_MARK} Model has no outputs"))?;
        let half_input = matches!(input.input_type.tensor_type(), Some(TensorElementType::Float16));
        let (input_name, output_name) = (input.name.to_string(), output.name.to_string());

        log::info!(
            "Backend: ONNXRuntime | Device: {} | Input: {} ({}x{}{}) | Output: {}",
            device,
            input_name,
            config.model_width,
            config.model_height,
            if half_input { ", f16" } else { "" },
            output_name,
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            half_input,
            model_width: config.model_width,
            model_height: config.model_height,
        })
    }

    fn build_trt(builder: &mut SessionBuilder, device_id: i32) -> Result<()> {
        let trt = TensorRTExecutionProvider::default()
            .with_device_id(device_id)
            .with_fp16(false)
            .with_engine_cache(true)
            .with_engine_cache_path("trt-cache")
            .with_timing_cache(false);
        if trt.is_available()? {
            match trt.register(builder) {
                Ok(_) => {}
                Err(err) => { anyhow::bail!("{CROSS_MARK} TensorRT initialization failed: {:?}", err) }
            }
            log::info!("Initial model serialization with TensorRT may take some time...");
            Ok(())
        } else {
            anyhow::bail!("{CROSS_MARK} TensorRT execution provider not available")
        }
    }

    fn build_cuda(builder: &mut SessionBuilder, device_id: i32) -> Result<()> {
        let ep = CUDAExecutionProvider::default().with_device_id(device_id);
        if ep.is_available()? {
            match ep.register(builder) {
                Ok(_) => {}
                Err(err) => { anyhow::bail!("{CROSS_MARK} CUDA initialization failed: {:?}", err) }
            }
            Ok(())
        } else {
            anyhow::bail!("{CROSS_MARK} CUDA execution provider not available")
        }
    }

    fn build_cpu(builder: &mut SessionBuilder) -> Result<()> {
        let ep = CPUExecutionProvider::default();
        if ep.is_available()? {
            match ep.register(builder) {
                Ok(_) => {}
                Err(err) => { anyhow::bail!("{CROSS_MARK} CPU initialization failed: {:?}", err) }
            }
            Ok(())
        } else {
            anyhow::bail!("{CROSS_MARK} CPU execution provider not available")
        }
    }

    fn tensor_preprocess(xs: Array4<f32>, half: bool) -> Result<DynValue> {
        let x = if half {
            Tensor::from_array(xs.mapv(f16::from_f32))?.into_dyn()
        } else {
            Tensor::from_array(xs)?.into_dyn()
        };
        Ok(x)
    }

    fn tensor_postprocess(y: &DynValue) -> Result<Array<f32, IxDyn>> {
        if let Ok(x) = y.try_extract_array::<f32>() {
            return Ok(x.into_owned());
        }
        if let Ok(x) = y.try_extract_array::<f16>() {
            return Ok(x.mapv(f16::to_f32));
        }
        anyhow::bail!("{CROSS_MARK} Unsupported ort output tensor type: {:?}", y.dtype())
    }

    /// Runs the session on one NCHW input and returns the first output as f32.
    pub fn run(&mut self, xs: Array4<f32>) -> Result<Array<f32, IxDyn>> {
        let input = Self::tensor_preprocess(xs, self.half_input)?;
        let outputs = self.session.run(ort::inputs![self.input_name.as_str() => input])?;
        Self::tensor_postprocess(&outputs[self.output_name.as_str()])
    }

    /// Custom metadata entry of the model, e.g. `names`.
    pub fn try_fetch(&self, key: &str) -> Option<String> {
        match self.session.metadata() {
            Err(_) => None,
            Ok(metadata) => metadata.custom(key).unwrap_or_default(),
        }
    }

    pub fn model_width(&self) -> u32 { self.model_width }

    pub fn model_height(&self) -> u32 { self.model_height }
}
