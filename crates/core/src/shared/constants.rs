pub const DETECT_MODEL_NAME: &str = "yolov8n_widerface.onnx";
pub const DETECT_MODEL_URL: &str =
    "https://github.com/agelens/agelens/releases/download/v0.1.0/yolov8n_widerface.onnx";

pub const GENDERAGE_MODEL_NAME: &str = "genderage.onnx";
pub const GENDERAGE_MODEL_URL: &str =
    "https://github.com/agelens/agelens/releases/download/v0.1.0/genderage.onnx";

/// Run attribute analysis once every this many frames by default.
pub const DEFAULT_CADENCE: u64 = 10;

/// Key that stops the live loop.
pub const EXIT_KEY: char = 'q';

pub const WINDOW_TITLE: &str = "Analisis Facial en Tiempo Real";
