pub mod model_resolver;
pub mod onnx_attribute_analyzer;
