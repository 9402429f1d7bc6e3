use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    #[default] CPU,
    CUDA,
    TensorRT,
}

// Hardcoded device names. Storing the "proper" spelling and the lowercase version.
const CPU: [&str; 2] = ["CPU", "cpu"];
const CUDA: [&str; 2] = ["CUDA", "cuda"];
const TENSOR_RT: [&str; 2] = ["TensorRT", "tensorrt"];

impl InferenceDevice {
    pub fn from_str(device: &str) -> Option<Self> {
        match device.to_lowercase().as_str() {
            "cpu" => Some(InferenceDevice::CPU),
            "cuda" => Some(InferenceDevice::CUDA),
            "tensorrt" => Some(InferenceDevice::TensorRT),
            _ => None,
        }
    }

    pub fn str(&self) -> &'static str {
        match self {
            InferenceDevice::CPU => CPU[0],
            InferenceDevice::CUDA => CUDA[0],
            InferenceDevice::TensorRT => TENSOR_RT[0],
        }
    }

    pub fn all_inference_devices() -> Vec<&'static str> {
        vec![CPU[1], CUDA[1], TENSOR_RT[1]]
    }
}

impl std::fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_case() {
        assert_eq!(InferenceDevice::from_str("TensorRT"), Some(InferenceDevice::TensorRT));
        assert_eq!(InferenceDevice::from_str("CUDA"), Some(InferenceDevice::CUDA));
        assert_eq!(InferenceDevice::from_str("rocm"), None);
    }

    #[test]
    fn serde_uses_lowercase() {
        let d: InferenceDevice = serde_json::from_str("\"tensorrt\"").unwrap();
        assert_eq!(d, InferenceDevice::TensorRT);
        assert_eq!(serde_json::to_string(&InferenceDevice::CPU).unwrap(), "\"cpu\"");
    }
}
